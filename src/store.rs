use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use thiserror::Error;

pub const CLASSES_KEY: &str = "classes";
pub const STUDENTS_KEY: &str = "students";
pub const DAILY_RECORDS_KEY: &str = "daily-records";
pub const STUDENT_NOTES_KEY: &str = "student-notes";
pub const WEEKLY_SCHEDULE_KEY: &str = "weekly-schedule";
pub const NOTIFICATIONS_KEY: &str = "notifications";
pub const PROFILE_KEY: &str = "profile";

#[derive(Debug, Error)]
#[error("{op} of '{key}' failed: {message}")]
pub struct StoreError {
    pub op: &'static str,
    pub key: String,
    pub message: String,
}

/// Durable key-value blob provider. Domain stores hold the authoritative
/// in-memory collections and go through this to load and persist whole
/// collections at a time, so tests can swap in a fake without a database.
pub trait BlobStore {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn write(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }
}

impl BlobStore for SqliteStore {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.conn
            .query_row("SELECT value FROM kv WHERE key = ?", [key], |r| r.get(0))
            .optional()
            .map_err(|e| StoreError {
                op: "read",
                key: key.to_string(),
                message: e.to_string(),
            })
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn
            .execute(
                "INSERT INTO kv(key, value) VALUES(?, ?)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                (key, value),
            )
            .map(|_| ())
            .map_err(|e| StoreError {
                op: "write",
                key: key.to_string(),
                message: e.to_string(),
            })
    }
}

/// Outcome of a mutation that is already applied in memory. A failed blob
/// write does not roll the mutation back; it only surfaces here so the
/// caller can warn that changes may be lost on reload.
#[derive(Debug)]
pub struct Applied<T> {
    pub value: T,
    pub persist_warning: Option<String>,
}

/// Serialize a whole collection and write it under its key. Failures come
/// back as a warning string, not an error: by the time persistence runs the
/// in-memory update has already happened and is not rolled back.
pub fn persist_json<T: Serialize + ?Sized>(
    blob: &dyn BlobStore,
    key: &str,
    value: &T,
    what: &str,
) -> Option<String> {
    let text = match serde_json::to_string(value) {
        Ok(t) => t,
        Err(e) => return Some(format!("{} not saved: {}", what, e)),
    };
    match blob.write(key, &text) {
        Ok(()) => None,
        Err(e) => Some(format!(
            "{} not saved, changes may be lost on reload: {}",
            what, e
        )),
    }
}
