use crate::compile::{self, MergeTolerance};
use crate::db::{self, StoredTimetable};
use crate::extract;
use crate::ipc::error::{compile_err, err, ok};
use crate::ipc::handlers::setup::{parse_i64_range, workspace_tolerance, MAX_TOLERANCE_MINUTES};
use crate::ipc::helpers::{db_conn, now_ts, required_str, slot_dictionary};
use crate::ipc::types::{AppState, Request};
use crate::schedule::{ClockRange, RawRow, Weekday, WeeklySchedule};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

/// Rows arrive either as `["A1+A2", "venue", "Course"]` or as objects.
#[derive(Deserialize)]
#[serde(untagged)]
enum RowInput {
    Fields(String, String, String),
    Object(RawRow),
}

impl From<RowInput> for RawRow {
    fn from(r: RowInput) -> Self {
        match r {
            RowInput::Fields(slots, venue, subject) => RawRow {
                slots,
                venue,
                subject,
            },
            RowInput::Object(row) => row,
        }
    }
}

fn parse_rows(req: &Request) -> Result<Vec<RawRow>, serde_json::Value> {
    let Some(raw) = req.params.get("rows") else {
        return Err(err(&req.id, "bad_params", "missing rows", None));
    };
    let rows: Vec<RowInput> = serde_json::from_value(raw.clone()).map_err(|e| {
        err(
            &req.id,
            "bad_params",
            format!("rows must be an array of [slots, venue, subject] or objects: {}", e),
            None,
        )
    })?;
    Ok(rows.into_iter().map(RawRow::from).collect())
}

/// Explicit `toleranceMinutes` wins, then the workspace setting. `None` means
/// neither is present and the built-in default applies.
fn resolve_tolerance(
    state: &AppState,
    req: &Request,
) -> Result<Option<MergeTolerance>, serde_json::Value> {
    match (req.params.get("toleranceMinutes"), state.db.as_ref()) {
        (Some(v), _) if !v.is_null() => {
            parse_i64_range(v, "toleranceMinutes", 0, MAX_TOLERANCE_MINUTES)
                .map(|m| Some(MergeTolerance::minutes(m)))
                .map_err(|msg| err(&req.id, "bad_params", msg, None))
        }
        (_, Some(conn)) => workspace_tolerance(conn)
            .map(Some)
            .map_err(|e| err(&req.id, "db_query_failed", e.to_string(), None)),
        _ => Ok(None),
    }
}

fn compile_rows(
    state: &AppState,
    req: &Request,
    rows: &[RawRow],
) -> Result<(WeeklySchedule, String), serde_json::Value> {
    let dict = slot_dictionary(state, req)?;
    let tolerance = resolve_tolerance(state, req)?;
    let compiled = match tolerance {
        Some(t) => compile::compile_schedule_with(rows, &dict, t),
        None => compile::compile_schedule(rows, &dict),
    };
    let schedule = compiled.map_err(|e| {
        log::warn!("request {}: compile failed: {}", req.id, e);
        compile_err(&req.id, &e)
    })?;
    log::debug!(
        "request {}: compiled {} rows into {} entries (tolerance {} min)",
        req.id,
        rows.len(),
        schedule.entry_count(),
        tolerance.unwrap_or_default().as_minutes()
    );
    Ok((schedule, dict.fingerprint().to_string()))
}

fn handle_compile(state: &mut AppState, req: &Request) -> serde_json::Value {
    let rows = match parse_rows(req) {
        Ok(r) => r,
        Err(e) => return e,
    };
    match compile_rows(state, req, &rows) {
        Ok((schedule, fingerprint)) => ok(
            &req.id,
            json!({
                "schedule": schedule,
                "entryCount": schedule.entry_count(),
                "dictionaryFingerprint": fingerprint,
            }),
        ),
        Err(e) => e,
    }
}

fn handle_from_text(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Some(name) = req.params.get("fileName").and_then(|v| v.as_str()) {
        if let Err(e) = extract::check_upload_name(name) {
            return err(&req.id, "unsupported_file_type", e.to_string(), None);
        }
    }
    let Some(text) = req.params.get("text").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing text", None);
    };

    let extracted = extract::parse_extracted_text(text);
    if !extracted.rejected.is_empty() {
        log::warn!(
            "request {}: {} extracted lines did not have 3 fields",
            req.id,
            extracted.rejected.len()
        );
    }
    match compile_rows(state, req, &extracted.rows) {
        Ok((schedule, fingerprint)) => ok(
            &req.id,
            json!({
                "schedule": schedule,
                "rowCount": extracted.rows.len(),
                "rejectedLines": extracted.rejected,
                "dictionaryFingerprint": fingerprint,
            }),
        ),
        Err(e) => e,
    }
}

fn handle_save(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let user_id = match required_str(req, "userId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let Some(raw) = req.params.get("schedule") else {
        return err(&req.id, "bad_params", "missing schedule", None);
    };
    let schedule: WeeklySchedule = match serde_json::from_value(raw.clone()) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "bad_params", format!("invalid schedule: {}", e), None),
    };
    for (_, entries) in schedule.iter() {
        for entry in entries {
            if let Err(e) = ClockRange::parse(&entry.time) {
                return compile_err(&req.id, &e);
            }
        }
    }

    let schedule_json = match serde_json::to_string(&schedule) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
    };
    let stored = StoredTimetable {
        id: Uuid::new_v4().to_string(),
        user_id,
        schedule_json,
        dictionary_fingerprint: state.slots.as_ref().map(|d| d.fingerprint().to_string()),
        entry_count: schedule.entry_count() as i64,
        updated_at: now_ts(),
    };
    if let Err(e) = db::timetable_upsert(conn, &stored) {
        return err(
            &req.id,
            "db_update_failed",
            e.to_string(),
            Some(json!({ "table": "timetables" })),
        );
    }
    log::info!("timetable saved for user {}", stored.user_id);
    ok(
        &req.id,
        json!({
            "timetableId": stored.id,
            "userId": stored.user_id,
            "entryCount": stored.entry_count,
            "updatedAt": stored.updated_at,
        }),
    )
}

fn load_stored(
    state: &AppState,
    req: &Request,
) -> Result<(StoredTimetable, WeeklySchedule), serde_json::Value> {
    let conn = db_conn(state, req)?;
    let user_id = required_str(req, "userId")?;
    let stored = db::timetable_get(conn, &user_id)
        .map_err(|e| err(&req.id, "db_query_failed", e.to_string(), None))?
        .ok_or_else(|| {
            err(
                &req.id,
                "not_found",
                format!("no timetable saved for user {}", user_id),
                None,
            )
        })?;
    let schedule: WeeklySchedule = serde_json::from_str(&stored.schedule_json).map_err(|e| {
        err(
            &req.id,
            "db_query_failed",
            format!("stored timetable is corrupt: {}", e),
            None,
        )
    })?;
    Ok((stored, schedule))
}

fn handle_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (stored, schedule) = match load_stored(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    // Stale only when both sides are known and disagree.
    let stale = match (&stored.dictionary_fingerprint, state.slots.as_ref()) {
        (Some(saved), Some(current)) => Some(saved != current.fingerprint()),
        _ => None,
    };
    ok(
        &req.id,
        json!({
            "timetableId": stored.id,
            "userId": stored.user_id,
            "schedule": schedule,
            "entryCount": stored.entry_count,
            "dictionaryFingerprint": stored.dictionary_fingerprint,
            "stale": stale,
            "updatedAt": stored.updated_at,
        }),
    )
}

fn handle_day(state: &mut AppState, req: &Request) -> serde_json::Value {
    let day = match required_str(req, "day") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let Some(day) = Weekday::parse(&day) else {
        return err(
            &req.id,
            "bad_params",
            format!("unknown weekday: {}", day),
            None,
        );
    };
    let (_, schedule) = match load_stored(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    ok(
        &req.id,
        json!({ "day": day.as_str(), "entries": schedule.day(day) }),
    )
}

fn handle_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let user_id = match required_str(req, "userId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match db::timetable_delete(conn, &user_id) {
        Ok(deleted) => ok(&req.id, json!({ "deleted": deleted })),
        Err(e) => err(&req.id, "db_update_failed", e.to_string(), None),
    }
}

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "timetables": [] }));
    };
    match db::timetable_list(conn) {
        Ok(rows) => {
            let timetables: Vec<serde_json::Value> = rows
                .into_iter()
                .map(|t| {
                    json!({
                        "timetableId": t.id,
                        "userId": t.user_id,
                        "entryCount": t.entry_count,
                        "updatedAt": t.updated_at,
                    })
                })
                .collect();
            ok(&req.id, json!({ "timetables": timetables }))
        }
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "timetable.compile" => Some(handle_compile(state, req)),
        "timetable.fromText" => Some(handle_from_text(state, req)),
        "timetable.save" => Some(handle_save(state, req)),
        "timetable.get" => Some(handle_get(state, req)),
        "timetable.day" => Some(handle_day(state, req)),
        "timetable.delete" => Some(handle_delete(state, req)),
        "timetable.list" => Some(handle_list(state, req)),
        _ => None,
    }
}
