use anyhow::Context;
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

pub const DB_FILE: &str = "timetabled.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)
        .with_context(|| format!("failed to create workspace {}", workspace.to_string_lossy()))?;
    let db_path = workspace.join(DB_FILE);
    let conn = Connection::open(&db_path)
        .with_context(|| format!("failed to open database {}", db_path.to_string_lossy()))?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings(
            key TEXT PRIMARY KEY,
            value_json TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS timetables(
            user_id TEXT PRIMARY KEY,
            id TEXT NOT NULL,
            schedule_json TEXT NOT NULL,
            entry_count INTEGER NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    // Workspaces created before fingerprints were recorded lack the column.
    if !table_has_column(conn, "timetables", "dictionary_fingerprint")? {
        conn.execute(
            "ALTER TABLE timetables ADD COLUMN dictionary_fingerprint TEXT",
            [],
        )?;
    }
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_timetables_updated ON timetables(updated_at)",
        [],
    )?;
    Ok(())
}

pub fn settings_get_json(conn: &Connection, key: &str) -> anyhow::Result<Option<serde_json::Value>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value_json FROM settings WHERE key = ?",
            [key],
            |row| row.get(0),
        )
        .optional()?;
    match raw {
        None => Ok(None),
        Some(s) => Ok(Some(
            serde_json::from_str(&s).with_context(|| format!("setting {} is invalid JSON", key))?,
        )),
    }
}

pub fn settings_set_json(
    conn: &Connection,
    key: &str,
    value: &serde_json::Value,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value_json) VALUES(?, ?)
         ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json",
        (key, serde_json::to_string(value)?),
    )?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredTimetable {
    pub id: String,
    pub user_id: String,
    pub schedule_json: String,
    pub dictionary_fingerprint: Option<String>,
    pub entry_count: i64,
    pub updated_at: String,
}

pub fn timetable_upsert(conn: &Connection, t: &StoredTimetable) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO timetables(user_id, id, schedule_json, dictionary_fingerprint, entry_count, updated_at)
         VALUES(?, ?, ?, ?, ?, ?)
         ON CONFLICT(user_id) DO UPDATE SET
            id = excluded.id,
            schedule_json = excluded.schedule_json,
            dictionary_fingerprint = excluded.dictionary_fingerprint,
            entry_count = excluded.entry_count,
            updated_at = excluded.updated_at",
        (
            &t.user_id,
            &t.id,
            &t.schedule_json,
            &t.dictionary_fingerprint,
            t.entry_count,
            &t.updated_at,
        ),
    )?;
    Ok(())
}

fn row_to_timetable(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredTimetable> {
    Ok(StoredTimetable {
        user_id: row.get(0)?,
        id: row.get(1)?,
        schedule_json: row.get(2)?,
        dictionary_fingerprint: row.get(3)?,
        entry_count: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

pub fn timetable_get(conn: &Connection, user_id: &str) -> anyhow::Result<Option<StoredTimetable>> {
    let t = conn
        .query_row(
            "SELECT user_id, id, schedule_json, dictionary_fingerprint, entry_count, updated_at
             FROM timetables WHERE user_id = ?",
            [user_id],
            row_to_timetable,
        )
        .optional()?;
    Ok(t)
}

pub fn timetable_list(conn: &Connection) -> anyhow::Result<Vec<StoredTimetable>> {
    let mut stmt = conn.prepare(
        "SELECT user_id, id, schedule_json, dictionary_fingerprint, entry_count, updated_at
         FROM timetables ORDER BY user_id",
    )?;
    let rows = stmt
        .query_map([], row_to_timetable)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Returns whether a row was removed.
pub fn timetable_delete(conn: &Connection, user_id: &str) -> anyhow::Result<bool> {
    let n = conn.execute("DELETE FROM timetables WHERE user_id = ?", [user_id])?;
    Ok(n > 0)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}
