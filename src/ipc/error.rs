use serde_json::json;

use crate::compile::CompileError;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

/// Compile failures carry the offending slot code or time range in `details`.
pub fn compile_err(id: &str, e: &CompileError) -> serde_json::Value {
    let details = match e {
        CompileError::SlotNotFound { code } => json!({ "slotCode": code }),
        CompileError::MalformedTimeRange { range } => json!({ "timeRange": range }),
    };
    err(id, e.code(), e.to_string(), Some(details))
}
