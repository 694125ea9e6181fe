use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::seed;
use crate::store::{persist_json, Applied, BlobStore, DAILY_RECORDS_KEY};

/// Closed set of marks a teacher can stamp on a student for one day.
/// The wire symbols match what the tracking grid renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttendanceStatus {
    #[serde(rename = "+")]
    Plus,
    #[serde(rename = "½")]
    Half,
    #[serde(rename = "-")]
    Minus,
    #[serde(rename = "Y")]
    Absent,
    #[serde(rename = "G")]
    Late,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum EventKind {
    Status(AttendanceStatus),
    Note(String),
}

/// One entry in a day's event log. Immutable once created; removed by id,
/// never edited in place. Ids only need to be unique within their record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordEvent {
    pub id: String,
    #[serde(flatten)]
    pub kind: EventKind,
}

/// Per-student per-day event log. The id is the natural key
/// `classId-date-studentId`; at most one record exists per triple. A record
/// is never deleted just because its event list empties out.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyRecord {
    pub id: String,
    pub class_id: String,
    pub student_id: String,
    pub date: String,
    pub events: Vec<RecordEvent>,
}

/// Flat pre-event-log row. A stored collection is recognized as this shape
/// when its first element still carries a top-level `status` key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyRecord {
    pub class_id: String,
    pub date: String,
    pub student_id: String,
    pub status: Option<AttendanceStatus>,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("date must be YYYY-MM-DD, got '{0}'")]
    BadDate(String),
}

pub fn record_id(class_id: &str, date: &str, student_id: &str) -> String {
    format!("{}-{}-{}", class_id, date, student_id)
}

fn check_date(date: &str) -> Result<(), RecordError> {
    chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| RecordError::BadDate(date.to_string()))
}

/// The last status event wins; notes never affect the derived status.
pub fn current_status(events: &[RecordEvent]) -> Option<AttendanceStatus> {
    events.iter().rev().find_map(|e| match e.kind {
        EventKind::Status(s) => Some(s),
        EventKind::Note(_) => None,
    })
}

/// Translate flat rows into event logs. Pure: rows grouped by natural key in
/// encounter order, status before note within each row, deterministic event
/// ids within each record.
pub fn migrate_legacy(rows: Vec<LegacyRecord>) -> Vec<DailyRecord> {
    let mut grouped: IndexMap<String, DailyRecord> = IndexMap::new();
    for row in rows {
        let id = record_id(&row.class_id, &row.date, &row.student_id);
        let record = grouped.entry(id.clone()).or_insert_with(|| DailyRecord {
            id,
            class_id: row.class_id.clone(),
            student_id: row.student_id.clone(),
            date: row.date.clone(),
            events: Vec::new(),
        });
        if let Some(status) = row.status {
            record.events.push(RecordEvent {
                id: format!("m{}", record.events.len()),
                kind: EventKind::Status(status),
            });
        }
        if !row.description.trim().is_empty() {
            record.events.push(RecordEvent {
                id: format!("m{}", record.events.len()),
                kind: EventKind::Note(row.description),
            });
        }
    }
    grouped.into_values().collect()
}

pub struct LoadOutcome {
    pub store: RecordStore,
    pub migrated: bool,
    pub seeded: bool,
    pub warnings: Vec<String>,
}

/// Authoritative in-memory collection of daily records, synchronized to one
/// persisted blob. Every mutation applies in memory first and persists the
/// whole collection afterwards.
pub struct RecordStore {
    records: Vec<DailyRecord>,
}

impl RecordStore {
    pub fn load(blob: &dyn BlobStore) -> LoadOutcome {
        let mut warnings = Vec::new();

        let raw = match blob.read(DAILY_RECORDS_KEY) {
            Ok(v) => v,
            Err(e) => {
                warnings.push(format!("daily records unreadable, starting empty: {}", e));
                return LoadOutcome {
                    store: Self { records: Vec::new() },
                    migrated: false,
                    seeded: false,
                    warnings,
                };
            }
        };

        let Some(text) = raw else {
            // First run: the seed ships in the flat shape so a seeded
            // workspace takes the exact same migration path as a legacy one.
            let store = Self {
                records: migrate_legacy(seed::legacy_records()),
            };
            if let Some(w) = store.persist(blob) {
                warnings.push(w);
            }
            return LoadOutcome {
                store,
                migrated: true,
                seeded: true,
                warnings,
            };
        };

        let values: Vec<serde_json::Value> = match serde_json::from_str(&text) {
            Ok(v) => v,
            Err(e) => {
                warnings.push(format!("daily records corrupt, starting empty: {}", e));
                return LoadOutcome {
                    store: Self { records: Vec::new() },
                    migrated: false,
                    seeded: false,
                    warnings,
                };
            }
        };

        let is_legacy = values
            .first()
            .map(|v| v.get("status").is_some())
            .unwrap_or(false);

        let (records, migrated) = if is_legacy {
            match serde_json::from_value::<Vec<LegacyRecord>>(serde_json::Value::Array(values)) {
                Ok(rows) => (migrate_legacy(rows), true),
                Err(e) => {
                    warnings.push(format!("legacy daily records corrupt, starting empty: {}", e));
                    (Vec::new(), false)
                }
            }
        } else {
            match serde_json::from_value::<Vec<DailyRecord>>(serde_json::Value::Array(values)) {
                Ok(records) => (records, false),
                Err(e) => {
                    warnings.push(format!("daily records corrupt, starting empty: {}", e));
                    (Vec::new(), false)
                }
            }
        };

        let store = Self { records };
        if migrated {
            // Replace the old blob in one write; a half-migrated collection
            // must never be observable on disk.
            if let Some(w) = store.persist(blob) {
                warnings.push(w);
            }
        }
        LoadOutcome {
            store,
            migrated,
            seeded: false,
            warnings,
        }
    }

    fn persist(&self, blob: &dyn BlobStore) -> Option<String> {
        persist_json(blob, DAILY_RECORDS_KEY, &self.records, "daily records")
    }

    pub fn records_for_date(&self, class_id: &str, date: &str) -> Vec<&DailyRecord> {
        self.records
            .iter()
            .filter(|r| r.class_id == class_id && r.date == date)
            .collect()
    }

    pub fn get(&self, class_id: &str, student_id: &str, date: &str) -> Option<&DailyRecord> {
        let id = record_id(class_id, date, student_id);
        self.records.iter().find(|r| r.id == id)
    }

    fn append(&mut self, class_id: &str, student_id: &str, date: &str, event: RecordEvent) {
        let id = record_id(class_id, date, student_id);
        match self.records.iter_mut().find(|r| r.id == id) {
            Some(record) => record.events.push(event),
            None => self.records.push(DailyRecord {
                id,
                class_id: class_id.to_string(),
                student_id: student_id.to_string(),
                date: date.to_string(),
                events: vec![event],
            }),
        }
    }

    /// Append one event, creating the day's record on first use. Not
    /// idempotent on purpose: two identical calls are two events.
    pub fn add_event(
        &mut self,
        blob: &dyn BlobStore,
        class_id: &str,
        student_id: &str,
        date: &str,
        kind: EventKind,
    ) -> Result<Applied<String>, RecordError> {
        check_date(date)?;
        let event = RecordEvent {
            id: Uuid::new_v4().to_string(),
            kind,
        };
        let event_id = event.id.clone();
        self.append(class_id, student_id, date, event);
        let persist_warning = self.persist(blob);
        Ok(Applied {
            value: event_id,
            persist_warning,
        })
    }

    /// Per-student append for every id in the batch, then exactly one
    /// persist. Each student gets its own event id.
    pub fn add_bulk_events(
        &mut self,
        blob: &dyn BlobStore,
        class_id: &str,
        student_ids: &[String],
        date: &str,
        kind: &EventKind,
    ) -> Result<Applied<Vec<String>>, RecordError> {
        check_date(date)?;
        let mut event_ids = Vec::with_capacity(student_ids.len());
        for student_id in student_ids {
            let event = RecordEvent {
                id: Uuid::new_v4().to_string(),
                kind: kind.clone(),
            };
            event_ids.push(event.id.clone());
            self.append(class_id, student_id, date, event);
        }
        let persist_warning = self.persist(blob);
        Ok(Applied {
            value: event_ids,
            persist_warning,
        })
    }

    /// Remove at most one event by id. A missing record or missing event is
    /// treated as already satisfied, not an error. The record itself stays
    /// even when its event list empties.
    pub fn remove_event(
        &mut self,
        blob: &dyn BlobStore,
        class_id: &str,
        student_id: &str,
        date: &str,
        event_id: &str,
    ) -> Applied<bool> {
        let id = record_id(class_id, date, student_id);
        let Some(record) = self.records.iter_mut().find(|r| r.id == id) else {
            return Applied {
                value: false,
                persist_warning: None,
            };
        };
        let Some(pos) = record.events.iter().position(|e| e.id == event_id) else {
            return Applied {
                value: false,
                persist_warning: None,
            };
        };
        record.events.remove(pos);
        let persist_warning = self.persist(blob);
        Applied {
            value: true,
            persist_warning,
        }
    }

    /// Cascade execution for an upstream class deletion. One persist.
    pub fn delete_for_class(&mut self, blob: &dyn BlobStore, class_id: &str) -> Applied<usize> {
        let before = self.records.len();
        self.records.retain(|r| r.class_id != class_id);
        let removed = before - self.records.len();
        if removed == 0 {
            return Applied {
                value: 0,
                persist_warning: None,
            };
        }
        let persist_warning = self.persist(blob);
        Applied {
            value: removed,
            persist_warning,
        }
    }

    /// Cascade execution for an upstream student deletion. One persist.
    pub fn delete_for_student(
        &mut self,
        blob: &dyn BlobStore,
        class_id: &str,
        student_id: &str,
    ) -> Applied<usize> {
        let before = self.records.len();
        self.records
            .retain(|r| !(r.class_id == class_id && r.student_id == student_id));
        let removed = before - self.records.len();
        if removed == 0 {
            return Applied {
                value: 0,
                persist_warning: None,
            };
        }
        let persist_warning = self.persist(blob);
        Applied {
            value: removed,
            persist_warning,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::MemStore;

    fn legacy(
        class_id: &str,
        date: &str,
        student_id: &str,
        status: Option<AttendanceStatus>,
        description: &str,
    ) -> LegacyRecord {
        LegacyRecord {
            class_id: class_id.to_string(),
            date: date.to_string(),
            student_id: student_id.to_string(),
            status,
            description: description.to_string(),
        }
    }

    fn note(text: &str) -> EventKind {
        EventKind::Note(text.to_string())
    }

    #[test]
    fn migration_keeps_status_before_note() {
        let rows = vec![legacy(
            "6A",
            "2024-05-01",
            "s1",
            Some(AttendanceStatus::Plus),
            "parmak kaldırdı",
        )];
        let migrated = migrate_legacy(rows);
        assert_eq!(migrated.len(), 1);
        let record = &migrated[0];
        assert_eq!(record.id, "6A-2024-05-01-s1");
        assert_eq!(record.events.len(), 2);
        assert_eq!(
            record.events[0].kind,
            EventKind::Status(AttendanceStatus::Plus)
        );
        assert_eq!(record.events[1].kind, note("parmak kaldırdı"));
        // Event ids are deterministic so migration stays a pure function.
        assert_eq!(record.events[0].id, "m0");
        assert_eq!(record.events[1].id, "m1");
    }

    #[test]
    fn migration_skips_null_status_and_blank_description() {
        let rows = vec![
            legacy("6A", "2024-05-01", "s1", None, "geldi ama sessizdi"),
            legacy("6A", "2024-05-01", "s2", Some(AttendanceStatus::Absent), "  "),
        ];
        let migrated = migrate_legacy(rows);
        assert_eq!(migrated.len(), 2);
        assert_eq!(migrated[0].events.len(), 1);
        assert_eq!(migrated[0].events[0].kind, note("geldi ama sessizdi"));
        assert_eq!(migrated[1].events.len(), 1);
        assert_eq!(
            migrated[1].events[0].kind,
            EventKind::Status(AttendanceStatus::Absent)
        );
    }

    #[test]
    fn migration_groups_duplicate_keys_in_encounter_order() {
        let rows = vec![
            legacy("6A", "2024-05-01", "s1", Some(AttendanceStatus::Plus), ""),
            legacy("6A", "2024-05-01", "s2", Some(AttendanceStatus::Minus), ""),
            legacy("6A", "2024-05-01", "s1", None, "ikinci kayıt"),
        ];
        let migrated = migrate_legacy(rows);
        assert_eq!(migrated.len(), 2);
        assert_eq!(migrated[0].student_id, "s1");
        assert_eq!(migrated[0].events.len(), 2);
        assert_eq!(migrated[0].events[1].kind, note("ikinci kayıt"));
        assert_eq!(migrated[1].student_id, "s2");
    }

    #[test]
    fn load_migrates_v1_blob_once() {
        let v1 = serde_json::json!([
            { "classId": "6A", "date": "2024-05-01", "studentId": "s1", "status": "+", "description": "söz aldı" },
            { "classId": "6A", "date": "2024-05-02", "studentId": "s1", "status": null, "description": "ödev eksik" }
        ]);
        let blob = MemStore::with(DAILY_RECORDS_KEY, &v1.to_string());

        let first = RecordStore::load(&blob);
        assert!(first.migrated);
        assert!(!first.seeded);
        assert!(first.warnings.is_empty());
        let day_one = first.store.records_for_date("6A", "2024-05-01");
        assert_eq!(day_one.len(), 1);
        assert_eq!(day_one[0].events.len(), 2);

        // The persisted blob is now v2: a second load must not migrate again.
        let second = RecordStore::load(&blob);
        assert!(!second.migrated);
        let day_one = second.store.records_for_date("6A", "2024-05-01");
        assert_eq!(day_one[0].events.len(), 2);
    }

    #[test]
    fn load_seeds_empty_store_through_migration() {
        let blob = MemStore::new();
        let outcome = RecordStore::load(&blob);
        assert!(outcome.seeded);
        assert!(outcome.migrated);
        // The seed was persisted in current shape.
        let text = blob.get(DAILY_RECORDS_KEY).expect("seed persisted");
        let persisted: Vec<DailyRecord> = serde_json::from_str(&text).expect("v2 shape");
        assert!(!persisted.is_empty());
        assert!(persisted.iter().all(|r| !r.events.is_empty()));
    }

    #[test]
    fn load_falls_back_to_empty_on_corrupt_blob() {
        let blob = MemStore::with(DAILY_RECORDS_KEY, "{not json");
        let outcome = RecordStore::load(&blob);
        assert!(!outcome.migrated);
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.store.records_for_date("6A", "2024-05-01").is_empty());
    }

    #[test]
    fn add_event_reuses_the_natural_key_record() {
        let blob = MemStore::new();
        let mut store = RecordStore { records: Vec::new() };
        for _ in 0..3 {
            store
                .add_event(
                    &blob,
                    "6A",
                    "s1",
                    "2024-05-01",
                    EventKind::Status(AttendanceStatus::Plus),
                )
                .expect("valid date");
        }
        let records = store.records_for_date("6A", "2024-05-01");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].events.len(), 3);
    }

    #[test]
    fn add_event_rejects_malformed_dates() {
        let blob = MemStore::new();
        let mut store = RecordStore { records: Vec::new() };
        let result = store.add_event(&blob, "6A", "s1", "01.05.2024", note("x"));
        assert!(matches!(result, Err(RecordError::BadDate(_))));
        assert!(store.records_for_date("6A", "01.05.2024").is_empty());
    }

    #[test]
    fn bulk_matches_sequential_adds_with_one_write() {
        let kind = EventKind::Status(AttendanceStatus::Half);
        let ids = vec!["s1".to_string(), "s2".to_string()];

        let blob_bulk = MemStore::new();
        let mut bulk = RecordStore { records: Vec::new() };
        let outcome = bulk
            .add_bulk_events(&blob_bulk, "6A", &ids, "2024-05-01", &kind)
            .expect("valid date");
        assert_eq!(outcome.value.len(), 2);
        assert_ne!(outcome.value[0], outcome.value[1]);
        assert_eq!(blob_bulk.write_count.get(), 1, "one write for the batch");

        let blob_seq = MemStore::new();
        let mut seq = RecordStore { records: Vec::new() };
        for sid in &ids {
            seq.add_event(&blob_seq, "6A", sid, "2024-05-01", kind.clone())
                .expect("valid date");
        }
        assert_eq!(blob_seq.write_count.get(), 2);

        for sid in &ids {
            let a = bulk.get("6A", sid, "2024-05-01").expect("bulk record");
            let b = seq.get("6A", sid, "2024-05-01").expect("seq record");
            assert_eq!(a.id, b.id);
            assert_eq!(a.events.len(), b.events.len());
            assert_eq!(a.events[0].kind, b.events[0].kind);
        }
    }

    #[test]
    fn remove_event_keeps_the_emptied_record() {
        let blob = MemStore::new();
        let mut store = RecordStore { records: Vec::new() };
        let added = store
            .add_event(
                &blob,
                "6A",
                "s1",
                "2024-05-01",
                EventKind::Status(AttendanceStatus::Plus),
            )
            .expect("valid date");

        let record = store.get("6A", "s1", "2024-05-01").expect("record");
        assert_eq!(record.id, "6A-2024-05-01-s1");
        assert_eq!(record.events.len(), 1);

        let removed = store.remove_event(&blob, "6A", "s1", "2024-05-01", &added.value);
        assert!(removed.value);

        let record = store.get("6A", "s1", "2024-05-01").expect("record kept");
        assert!(record.events.is_empty());
    }

    #[test]
    fn remove_event_is_a_silent_noop_when_missing() {
        let blob = MemStore::new();
        let mut store = RecordStore { records: Vec::new() };
        let outcome = store.remove_event(&blob, "6A", "s1", "2024-05-01", "nope");
        assert!(!outcome.value);
        assert!(outcome.persist_warning.is_none());
        // Nothing was persisted for a no-op.
        assert!(blob.get(DAILY_RECORDS_KEY).is_none());
    }

    #[test]
    fn class_cascade_leaves_other_classes_untouched() {
        let blob = MemStore::new();
        let mut store = RecordStore { records: Vec::new() };
        store
            .add_event(&blob, "6A", "s1", "2024-05-01", note("a"))
            .expect("valid date");
        store
            .add_event(&blob, "6A", "s2", "2024-05-02", note("b"))
            .expect("valid date");
        store
            .add_event(&blob, "7B", "s9", "2024-05-01", note("c"))
            .expect("valid date");

        let outcome = store.delete_for_class(&blob, "6A");
        assert_eq!(outcome.value, 2);
        assert!(store.records_for_date("6A", "2024-05-01").is_empty());
        assert!(store.records_for_date("6A", "2024-05-02").is_empty());
        assert_eq!(store.records_for_date("7B", "2024-05-01").len(), 1);
    }

    #[test]
    fn student_cascade_matches_both_fields() {
        let blob = MemStore::new();
        let mut store = RecordStore { records: Vec::new() };
        store
            .add_event(&blob, "6A", "s1", "2024-05-01", note("a"))
            .expect("valid date");
        store
            .add_event(&blob, "7B", "s1", "2024-05-01", note("b"))
            .expect("valid date");

        let outcome = store.delete_for_student(&blob, "6A", "s1");
        assert_eq!(outcome.value, 1);
        assert!(store.get("6A", "s1", "2024-05-01").is_none());
        assert!(store.get("7B", "s1", "2024-05-01").is_some());
    }

    #[test]
    fn failed_persist_keeps_the_in_memory_update() {
        let blob = MemStore::new();
        let mut store = RecordStore { records: Vec::new() };
        blob.fail_writes.set(true);

        let outcome = store
            .add_event(&blob, "6A", "s1", "2024-05-01", note("kaydedilemedi"))
            .expect("valid date");
        assert!(outcome.persist_warning.is_some());

        // The mutation survived in memory even though the write failed.
        let record = store.get("6A", "s1", "2024-05-01").expect("record");
        assert_eq!(record.events.len(), 1);
        assert!(blob.get(DAILY_RECORDS_KEY).is_none());
    }

    #[test]
    fn current_status_takes_the_last_status_event() {
        let events = vec![
            RecordEvent {
                id: "a".into(),
                kind: EventKind::Status(AttendanceStatus::Plus),
            },
            RecordEvent {
                id: "b".into(),
                kind: note("sonra geldi"),
            },
            RecordEvent {
                id: "c".into(),
                kind: EventKind::Status(AttendanceStatus::Late),
            },
        ];
        assert_eq!(current_status(&events), Some(AttendanceStatus::Late));
        assert_eq!(current_status(&events[..2]), Some(AttendanceStatus::Plus));
        assert_eq!(current_status(&[]), None);
    }

    #[test]
    fn event_wire_shape_is_flat() {
        let event = RecordEvent {
            id: "e1".into(),
            kind: EventKind::Status(AttendanceStatus::Half),
        };
        let value = serde_json::to_value(&event).expect("serialize");
        assert_eq!(
            value,
            serde_json::json!({ "id": "e1", "type": "status", "value": "½" })
        );
        let back: RecordEvent = serde_json::from_value(value).expect("deserialize");
        assert_eq!(back.kind, EventKind::Status(AttendanceStatus::Half));
    }
}
