use std::path::PathBuf;

use rusqlite::Connection;
use serde::Deserialize;

use crate::notes::NoteStore;
use crate::notifications::NotificationStore;
use crate::records::RecordStore;
use crate::roster::RosterStore;
use crate::schedule::ScheduleStore;
use crate::store::SqliteStore;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Everything loaded for an open workspace. The domain stores hold the
/// in-memory collections; `blob` is the durable side they persist through.
pub struct App {
    pub blob: SqliteStore,
    pub records: RecordStore,
    pub roster: RosterStore,
    pub notes: NoteStore,
    pub schedule: ScheduleStore,
    pub notifications: NotificationStore,
}

pub struct LoadReport {
    pub seeded: bool,
    pub migrated: bool,
    pub warnings: Vec<String>,
}

impl App {
    /// Load every collection. Corrupt or unreadable blobs degrade to empty
    /// collections with warnings; they never block opening the workspace.
    pub fn load(conn: Connection) -> (Self, LoadReport) {
        let blob = SqliteStore::new(conn);
        let mut warnings = Vec::new();

        let records = RecordStore::load(&blob);
        warnings.extend(records.warnings);
        let roster = RosterStore::load(&blob);
        warnings.extend(roster.warnings);
        let notes = NoteStore::load(&blob);
        warnings.extend(notes.warnings);
        let schedule = ScheduleStore::load(&blob);
        warnings.extend(schedule.warnings);
        let notifications = NotificationStore::load(&blob);
        warnings.extend(notifications.warnings);

        let report = LoadReport {
            seeded: records.seeded || roster.seeded,
            migrated: records.migrated,
            warnings,
        };
        let app = App {
            blob,
            records: records.store,
            roster: roster.store,
            notes: notes.store,
            schedule: schedule.store,
            notifications: notifications.store,
        };
        (app, report)
    }
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub app: Option<App>,
}
