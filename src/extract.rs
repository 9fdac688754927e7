use crate::schedule::RawRow;
use serde::Serialize;
use std::path::Path;

pub const ALLOWED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "pdf"];
const FIELD_SEPARATOR: char = '-';
const EXPECTED_FIELDS: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("invalid file type {0:?}; allowed: PNG, JPG, JPEG, PDF")]
    UnsupportedFileType(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedLine {
    pub line_no: usize,
    pub text: String,
    pub field_count: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ExtractedRows {
    pub rows: Vec<RawRow>,
    pub rejected: Vec<RejectedLine>,
}

/// Split the model's `slot - venue - course` text into rows. Lines that do not
/// carry exactly three fields are reported back instead of failing the batch.
pub fn parse_extracted_text(text: &str) -> ExtractedRows {
    let mut out = ExtractedRows::default();
    for (i, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
        if fields.len() != EXPECTED_FIELDS {
            out.rejected.push(RejectedLine {
                line_no: i + 1,
                text: line.to_string(),
                field_count: fields.len(),
            });
            continue;
        }
        out.rows.push(RawRow {
            slots: fields[0].trim().to_string(),
            venue: fields[1].trim().to_string(),
            subject: fields[2].trim().to_string(),
        });
    }
    out
}

pub fn check_upload_name(file_name: &str) -> Result<(), ExtractError> {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    if ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        Ok(())
    } else {
        Err(ExtractError::UnsupportedFileType(file_name.to_string()))
    }
}
