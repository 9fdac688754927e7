use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{required_str, slot_dictionary};
use crate::ipc::types::{AppState, Request};
use crate::slots::{SlotDictionary, SlotDictionaryError};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Load a dictionary and swap it in. In-flight holders of the previous `Arc`
/// keep their copy.
pub fn load_into(state: &mut AppState, path: &Path) -> Result<(), SlotDictionaryError> {
    let dict = SlotDictionary::load(path)?;
    log::info!(
        "slot dictionary loaded from {}: {} codes, fingerprint {}",
        path.to_string_lossy(),
        dict.len(),
        dict.fingerprint()
    );
    state.slots = Some(Arc::new(dict));
    state.slots_path = Some(path.to_path_buf());
    Ok(())
}

fn info_json(state: &AppState) -> serde_json::Value {
    match state.slots.as_ref() {
        Some(d) => json!({
            "loaded": true,
            "codeCount": d.len(),
            "fingerprint": d.fingerprint(),
            "codes": d.codes(),
            "path": state.slots_path.as_ref().map(|p| p.to_string_lossy().to_string()),
        }),
        None => json!({ "loaded": false }),
    }
}

fn handle_slots_load(state: &mut AppState, req: &Request) -> serde_json::Value {
    let path = match required_str(req, "path") {
        Ok(v) => PathBuf::from(v),
        Err(e) => return e,
    };
    if let Err(e) = load_into(state, &path) {
        return err(
            &req.id,
            "slots_load_failed",
            e.to_string(),
            Some(json!({ "path": path.to_string_lossy() })),
        );
    }
    ok(&req.id, info_json(state))
}

fn handle_slots_info(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, info_json(state))
}

fn handle_slots_lookup(state: &mut AppState, req: &Request) -> serde_json::Value {
    let dict = match slot_dictionary(state, req) {
        Ok(d) => d,
        Err(e) => return e,
    };
    let code = match required_str(req, "code") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let Some(times) = dict.get(&code) else {
        return err(
            &req.id,
            "slot_not_found",
            format!("slot code not found in dictionary: {}", code),
            Some(json!({ "slotCode": code })),
        );
    };
    let times: Vec<serde_json::Value> = times
        .iter()
        .map(|t| json!({ "day": t.day.as_str(), "time": t.range }))
        .collect();
    ok(&req.id, json!({ "code": code, "times": times }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "slots.load" => Some(handle_slots_load(state, req)),
        "slots.info" => Some(handle_slots_info(state, req)),
        "slots.lookup" => Some(handle_slots_lookup(state, req)),
        _ => None,
    }
}
