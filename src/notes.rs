use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::{persist_json, Applied, BlobStore, STUDENT_NOTES_KEY};

/// Free-form teacher note, at most one per (class, student) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentNote {
    pub id: String,
    pub class_id: String,
    pub student_id: String,
    pub note: String,
}

pub struct NoteLoadOutcome {
    pub store: NoteStore,
    pub warnings: Vec<String>,
}

pub struct NoteStore {
    notes: Vec<StudentNote>,
}

impl NoteStore {
    pub fn load(blob: &dyn BlobStore) -> NoteLoadOutcome {
        let mut warnings = Vec::new();
        let notes = match blob.read(STUDENT_NOTES_KEY) {
            Ok(Some(text)) => match serde_json::from_str(&text) {
                Ok(v) => v,
                Err(e) => {
                    warnings.push(format!("student notes corrupt, starting empty: {}", e));
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warnings.push(format!("student notes unreadable, starting empty: {}", e));
                Vec::new()
            }
        };
        NoteLoadOutcome {
            store: Self { notes },
            warnings,
        }
    }

    fn persist(&self, blob: &dyn BlobStore) -> Option<String> {
        persist_json(blob, STUDENT_NOTES_KEY, &self.notes, "student notes")
    }

    pub fn notes_for_class(&self, class_id: &str) -> Vec<&StudentNote> {
        self.notes
            .iter()
            .filter(|n| n.class_id == class_id)
            .collect()
    }

    /// Upsert the student's note. An empty (after trim) note deletes the row
    /// instead of storing blank text.
    pub fn upsert(
        &mut self,
        blob: &dyn BlobStore,
        class_id: &str,
        student_id: &str,
        note: &str,
    ) -> Applied<Option<StudentNote>> {
        let note = note.trim();
        let existing = self
            .notes
            .iter()
            .position(|n| n.class_id == class_id && n.student_id == student_id);

        if note.is_empty() {
            let Some(pos) = existing else {
                return Applied {
                    value: None,
                    persist_warning: None,
                };
            };
            self.notes.remove(pos);
            return Applied {
                value: None,
                persist_warning: self.persist(blob),
            };
        }

        let row = match existing {
            Some(pos) => {
                self.notes[pos].note = note.to_string();
                self.notes[pos].clone()
            }
            None => {
                let row = StudentNote {
                    id: Uuid::new_v4().to_string(),
                    class_id: class_id.to_string(),
                    student_id: student_id.to_string(),
                    note: note.to_string(),
                };
                self.notes.push(row.clone());
                row
            }
        };
        Applied {
            value: Some(row),
            persist_warning: self.persist(blob),
        }
    }

    pub fn delete_for_class(&mut self, blob: &dyn BlobStore, class_id: &str) -> Applied<usize> {
        let before = self.notes.len();
        self.notes.retain(|n| n.class_id != class_id);
        let removed = before - self.notes.len();
        if removed == 0 {
            return Applied {
                value: 0,
                persist_warning: None,
            };
        }
        Applied {
            value: removed,
            persist_warning: self.persist(blob),
        }
    }

    pub fn delete_for_student(
        &mut self,
        blob: &dyn BlobStore,
        class_id: &str,
        student_id: &str,
    ) -> Applied<usize> {
        let before = self.notes.len();
        self.notes
            .retain(|n| !(n.class_id == class_id && n.student_id == student_id));
        let removed = before - self.notes.len();
        if removed == 0 {
            return Applied {
                value: 0,
                persist_warning: None,
            };
        }
        Applied {
            value: removed,
            persist_warning: self.persist(blob),
        }
    }
}
