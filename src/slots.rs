use crate::schedule::Weekday;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum SlotDictionaryError {
    #[error("failed to read slot dictionary {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("slot dictionary is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("slot {code}: unknown weekday {day:?}")]
    UnknownWeekday { code: String, day: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotTime {
    pub day: Weekday,
    pub range: String,
}

/// Read-only mapping from slot code to the recurring (weekday, time range)
/// blocks it occupies. Time ranges are kept verbatim and parsed at compile time.
#[derive(Debug, Clone)]
pub struct SlotDictionary {
    slots: HashMap<String, Vec<SlotTime>>,
    fingerprint: String,
}

impl SlotDictionary {
    pub fn load(path: &Path) -> Result<Self, SlotDictionaryError> {
        let text = std::fs::read_to_string(path).map_err(|source| SlotDictionaryError::Read {
            path: path.to_string_lossy().to_string(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self, SlotDictionaryError> {
        let raw: BTreeMap<String, Vec<(String, String)>> = serde_json::from_str(text)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: BTreeMap<String, Vec<(String, String)>>) -> Result<Self, SlotDictionaryError> {
        // BTreeMap iteration keeps the fingerprint independent of file key order.
        let mut hasher = Sha256::new();
        let mut slots = HashMap::with_capacity(raw.len());
        for (code, times) in raw {
            hasher.update(code.as_bytes());
            hasher.update([0u8]);
            let mut parsed = Vec::with_capacity(times.len());
            for (day_name, range) in times {
                let Some(day) = Weekday::parse(&day_name) else {
                    return Err(SlotDictionaryError::UnknownWeekday {
                        code,
                        day: day_name,
                    });
                };
                hasher.update(day.as_str().as_bytes());
                hasher.update([0u8]);
                hasher.update(range.as_bytes());
                hasher.update([0u8]);
                parsed.push(SlotTime { day, range });
            }
            hasher.update([1u8]);
            slots.insert(code, parsed);
        }
        Ok(Self {
            slots,
            fingerprint: format!("{:x}", hasher.finalize()),
        })
    }

    /// Exact, case-sensitive lookup.
    pub fn get(&self, code: &str) -> Option<&[SlotTime]> {
        self.slots.get(code).map(|v| v.as_slice())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn codes(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self.slots.keys().map(|k| k.as_str()).collect();
        out.sort_unstable();
        out
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}
