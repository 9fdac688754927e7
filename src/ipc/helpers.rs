use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};
use crate::slots::SlotDictionary;
use rusqlite::Connection;
use std::sync::Arc;

pub fn db_conn<'a>(state: &'a AppState, req: &Request) -> Result<&'a Connection, serde_json::Value> {
    state
        .db
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

pub fn slot_dictionary(state: &AppState, req: &Request) -> Result<Arc<SlotDictionary>, serde_json::Value> {
    state.slots.clone().ok_or_else(|| {
        err(
            &req.id,
            "no_slot_dictionary",
            "load a slot dictionary first (slots.load or TIMETABLED_SLOTS)",
            None,
        )
    })
}

pub fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

pub fn now_ts() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}
