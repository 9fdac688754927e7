use crate::compile::MergeTolerance;
use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::db_conn;
use crate::ipc::types::{AppState, Request};
use rusqlite::Connection;
use serde_json::{json, Map, Value};

const TIMETABLE_KEY: &str = "setup.timetable";
pub const MAX_TOLERANCE_MINUTES: i64 = 30;

fn default_timetable_section() -> Value {
    json!({
        "mergeToleranceMinutes": MergeTolerance::DEFAULT_MINUTES,
    })
}

pub fn parse_i64_range(v: &Value, key: &str, min: i64, max: i64) -> Result<i64, String> {
    let n = v
        .as_i64()
        .ok_or_else(|| format!("{} must be integer", key))?;
    if !(min..=max).contains(&n) {
        return Err(format!("{} must be in {}..={}", key, min, max));
    }
    Ok(n)
}

fn merge_section_patch(current: &mut Value, patch: &Map<String, Value>) -> Result<(), String> {
    let obj = current
        .as_object_mut()
        .ok_or_else(|| "internal setup object must be a JSON object".to_string())?;
    for (k, v) in patch {
        match k.as_str() {
            "mergeToleranceMinutes" => {
                obj.insert(
                    k.clone(),
                    Value::from(parse_i64_range(v, k, 0, MAX_TOLERANCE_MINUTES)?),
                );
            }
            _ => return Err(format!("unknown timetable field: {}", k)),
        }
    }
    Ok(())
}

fn load_section(conn: &Connection) -> anyhow::Result<Value> {
    let mut current = default_timetable_section();
    if let Some(saved) = db::settings_get_json(conn, TIMETABLE_KEY)? {
        if let Some(saved_obj) = saved.as_object() {
            // Best-effort apply: a bad stored value falls back to the default.
            let _ = merge_section_patch(&mut current, saved_obj);
        }
    }
    Ok(current)
}

pub fn workspace_tolerance(conn: &Connection) -> anyhow::Result<MergeTolerance> {
    let section = load_section(conn)?;
    Ok(section
        .get("mergeToleranceMinutes")
        .and_then(|v| v.as_i64())
        .map(MergeTolerance::minutes)
        .unwrap_or_default())
}

fn handle_setup_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    match load_section(conn) {
        Ok(timetable) => ok(&req.id, json!({ "timetable": timetable })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_setup_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let Some(section) = req.params.get("section").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing section", None);
    };
    if section != "timetable" {
        return err(&req.id, "bad_params", "unknown section", None);
    }
    let Some(patch_obj) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "patch must be an object", None);
    };

    let mut current = match load_section(conn) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if let Err(msg) = merge_section_patch(&mut current, patch_obj) {
        return err(&req.id, "bad_params", msg, None);
    }
    if let Err(e) = db::settings_set_json(conn, TIMETABLE_KEY, &current) {
        return err(&req.id, "db_update_failed", e.to_string(), None);
    }
    ok(&req.id, json!({ "timetable": current }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "setup.get" => Some(handle_setup_get(state, req)),
        "setup.update" => Some(handle_setup_update(state, req)),
        _ => None,
    }
}
