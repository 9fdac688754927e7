mod test_support;

use serde_json::json;
use test_support::{fixture_path, spawn_sidecar, temp_dir};

#[test]
fn router_dispatch_smoke_covers_handler_families() {
    let workspace = temp_dir("timetabled-router-smoke");
    let mut sc = spawn_sidecar();

    let health = sc.request_ok("1", "health", json!({}));
    assert_eq!(
        health.get("version").and_then(|v| v.as_str()),
        Some(env!("CARGO_PKG_VERSION"))
    );
    assert!(health.get("slotDictionary").map(|v| v.is_null()).unwrap_or(false));

    let calls = [
        ("2", "workspace.select", json!({ "path": workspace.to_string_lossy() })),
        ("3", "slots.info", json!({})),
        (
            "4",
            "slots.load",
            json!({ "path": fixture_path("fixtures/slots.json").to_string_lossy() }),
        ),
        ("5", "slots.lookup", json!({ "code": "A1" })),
        ("6", "timetable.compile", json!({ "rows": [] })),
        ("7", "timetable.fromText", json!({ "text": "" })),
        ("8", "timetable.list", json!({})),
        ("9", "timetable.get", json!({ "userId": "nobody" })),
        ("10", "timetable.day", json!({ "userId": "nobody", "day": "Monday" })),
        ("11", "timetable.delete", json!({ "userId": "nobody" })),
        ("12", "setup.get", json!({})),
    ];
    for (id, method, params) in calls {
        let resp = sc.request(id, method, params);
        if resp.get("ok").and_then(|v| v.as_bool()) == Some(false) {
            let code = resp
                .get("error")
                .and_then(|e| e.get("code"))
                .and_then(|v| v.as_str())
                .unwrap_or("unknown");
            assert_ne!(code, "not_implemented", "unexpected unknown method for {}", method);
        }
    }

    let unknown = sc.request_err("13", "tasks.list", json!({}));
    assert_eq!(
        unknown.get("code").and_then(|v| v.as_str()),
        Some("not_implemented")
    );

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn malformed_request_line_gets_bad_json_and_loop_continues() {
    let mut sc = spawn_sidecar();
    let resp = sc.send_line("{not json");
    assert_eq!(resp.get("ok").and_then(|v| v.as_bool()), Some(false));
    assert_eq!(
        resp.get("error")
            .and_then(|e| e.get("code"))
            .and_then(|v| v.as_str()),
        Some("bad_json")
    );

    let _ = sc.request_ok("after", "health", json!({}));
}

#[test]
fn compile_without_dictionary_reports_missing_dictionary() {
    let mut sc = spawn_sidecar();
    let e = sc.request_err(
        "1",
        "timetable.compile",
        json!({ "rows": [["A1", "room", "Calculus"]] }),
    );
    assert_eq!(
        e.get("code").and_then(|v| v.as_str()),
        Some("no_slot_dictionary")
    );
}
