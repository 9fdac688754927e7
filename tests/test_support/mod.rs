#![allow(dead_code)]

use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

pub fn fixture_path(rel: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(rel)
}

pub fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

pub struct Sidecar {
    pub child: Child,
    pub stdin: ChildStdin,
    pub reader: BufReader<ChildStdout>,
}

impl Drop for Sidecar {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn spawn_with(envs: &[(&str, String)]) -> Sidecar {
    let exe = env!("CARGO_BIN_EXE_timetabled");
    let mut cmd = Command::new(exe);
    cmd.stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .env_remove("TIMETABLED_SLOTS")
        .env_remove("TIMETABLED_WORKSPACE");
    for (k, v) in envs {
        cmd.env(k, v);
    }
    let mut child = cmd.spawn().expect("spawn timetabled");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    Sidecar {
        child,
        stdin,
        reader: BufReader::new(stdout),
    }
}

/// Sidecar with no dictionary and no workspace.
pub fn spawn_sidecar() -> Sidecar {
    spawn_with(&[])
}

/// Sidecar started with the fixture dictionary from the environment.
pub fn spawn_with_fixture_slots() -> Sidecar {
    spawn_with(&[(
        "TIMETABLED_SLOTS",
        fixture_path("fixtures/slots.json").to_string_lossy().to_string(),
    )])
}

pub fn spawn_with_env(envs: &[(&str, String)]) -> Sidecar {
    spawn_with(envs)
}

impl Sidecar {
    pub fn send_line(&mut self, line: &str) -> serde_json::Value {
        writeln!(self.stdin, "{}", line).expect("write request");
        self.stdin.flush().expect("flush request");
        let mut out = String::new();
        self.reader.read_line(&mut out).expect("read response line");
        assert!(!out.trim().is_empty(), "empty response for {}", line);
        serde_json::from_str(out.trim()).expect("parse response json")
    }

    pub fn request(&mut self, id: &str, method: &str, params: serde_json::Value) -> serde_json::Value {
        let payload = json!({
            "id": id,
            "method": method,
            "params": params,
        });
        let value = self.send_line(&payload.to_string());
        assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
        value
    }

    pub fn request_ok(&mut self, id: &str, method: &str, params: serde_json::Value) -> serde_json::Value {
        let value = self.request(id, method, params);
        assert_eq!(
            value.get("ok").and_then(|v| v.as_bool()),
            Some(true),
            "{} failed: {}",
            method,
            value
        );
        value.get("result").cloned().unwrap_or_default()
    }

    /// Returns the error code of a failed request.
    pub fn request_err(&mut self, id: &str, method: &str, params: serde_json::Value) -> serde_json::Value {
        let value = self.request(id, method, params);
        assert_eq!(
            value.get("ok").and_then(|v| v.as_bool()),
            Some(false),
            "{} unexpectedly succeeded: {}",
            method,
            value
        );
        value.get("error").cloned().unwrap_or_default()
    }

    pub fn select_workspace(&mut self, path: &std::path::Path) {
        let _ = self.request_ok(
            "ws",
            "workspace.select",
            json!({ "path": path.to_string_lossy() }),
        );
    }
}

pub fn write_dictionary(dir: &std::path::Path, name: &str, body: &serde_json::Value) -> PathBuf {
    let p = dir.join(name);
    std::fs::write(&p, body.to_string()).expect("write dictionary");
    p
}

pub fn day_entries(schedule: &serde_json::Value, day: &str) -> Vec<(String, String)> {
    schedule
        .get(day)
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default()
        .into_iter()
        .map(|e| {
            (
                e.get("time").and_then(|v| v.as_str()).unwrap_or("").to_string(),
                e.get("subject").and_then(|v| v.as_str()).unwrap_or("").to_string(),
            )
        })
        .collect()
}

pub fn pair(time: &str, subject: &str) -> (String, String) {
    (time.to_string(), subject.to_string())
}
