use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::seed;
use crate::store::{persist_json, Applied, BlobStore, CLASSES_KEY, STUDENTS_KEY};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassInfo {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub student_number: i64,
    pub first_name: String,
    pub last_name: String,
    pub class_id: String,
}

#[derive(Debug, Error)]
pub enum RosterError {
    #[error("class name must not be empty")]
    EmptyClassName,
    #[error("a class named '{0}' already exists")]
    DuplicateClassName(String),
    #[error("class not found")]
    ClassNotFound,
    #[error("student not found")]
    StudentNotFound,
    #[error("student number {0} is already taken in this class")]
    DuplicateStudentNumber(i64),
    #[error("student name must not be empty")]
    EmptyStudentName,
}

/// One line of a pasted student list that could not be used, with the reason.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedLine {
    pub line: usize,
    pub text: String,
    pub reason: String,
}

pub struct ImportOutcome {
    pub added: Vec<Student>,
    pub skipped: Vec<SkippedLine>,
}

struct ParsedLine {
    line: usize,
    text: String,
    student_number: i64,
    first_name: String,
    last_name: String,
}

/// Parse pasted roster text. Accepted line shape:
/// `<number> <given names…> <surname>`. Unusable lines are skipped and
/// reported, never fatal.
fn parse_student_list(text: &str) -> (Vec<ParsedLine>, Vec<SkippedLine>) {
    let mut parsed = Vec::new();
    let mut skipped = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        let number = parts[0].parse::<i64>();
        let Ok(student_number) = number else {
            skipped.push(SkippedLine {
                line: idx + 1,
                text: line.to_string(),
                reason: "line must start with a student number".to_string(),
            });
            continue;
        };
        if parts.len() < 3 {
            skipped.push(SkippedLine {
                line: idx + 1,
                text: line.to_string(),
                reason: "expected a number, given name(s) and a surname".to_string(),
            });
            continue;
        }
        parsed.push(ParsedLine {
            line: idx + 1,
            text: line.to_string(),
            student_number,
            first_name: parts[1..parts.len() - 1].join(" "),
            last_name: parts[parts.len() - 1].to_string(),
        });
    }
    (parsed, skipped)
}

pub struct RosterLoadOutcome {
    pub store: RosterStore,
    pub seeded: bool,
    pub warnings: Vec<String>,
}

/// Classes and their students, each synchronized to its own blob. Logical
/// conflicts (duplicate names, duplicate numbers) are rejected before any
/// state changes; persistence failures surface after the fact.
pub struct RosterStore {
    classes: Vec<ClassInfo>,
    students: Vec<Student>,
}

impl RosterStore {
    pub fn load(blob: &dyn BlobStore) -> RosterLoadOutcome {
        let mut warnings = Vec::new();

        let classes_raw = match blob.read(CLASSES_KEY) {
            Ok(v) => v,
            Err(e) => {
                warnings.push(format!("classes unreadable, starting empty: {}", e));
                return RosterLoadOutcome {
                    store: Self {
                        classes: Vec::new(),
                        students: Vec::new(),
                    },
                    seeded: false,
                    warnings,
                };
            }
        };

        let Some(classes_text) = classes_raw else {
            let store = Self {
                classes: seed::classes(),
                students: seed::students(),
            };
            if let Some(w) = store.persist_classes(blob) {
                warnings.push(w);
            }
            if let Some(w) = store.persist_students(blob) {
                warnings.push(w);
            }
            return RosterLoadOutcome {
                store,
                seeded: true,
                warnings,
            };
        };

        let classes = match serde_json::from_str(&classes_text) {
            Ok(v) => v,
            Err(e) => {
                warnings.push(format!("classes corrupt, starting empty: {}", e));
                Vec::new()
            }
        };

        let students = match blob.read(STUDENTS_KEY) {
            Ok(Some(text)) => match serde_json::from_str(&text) {
                Ok(v) => v,
                Err(e) => {
                    warnings.push(format!("students corrupt, starting empty: {}", e));
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warnings.push(format!("students unreadable, starting empty: {}", e));
                Vec::new()
            }
        };

        RosterLoadOutcome {
            store: Self { classes, students },
            seeded: false,
            warnings,
        }
    }

    fn persist_classes(&self, blob: &dyn BlobStore) -> Option<String> {
        persist_json(blob, CLASSES_KEY, &self.classes, "classes")
    }

    fn persist_students(&self, blob: &dyn BlobStore) -> Option<String> {
        persist_json(blob, STUDENTS_KEY, &self.students, "students")
    }

    pub fn classes(&self) -> &[ClassInfo] {
        &self.classes
    }

    pub fn class(&self, class_id: &str) -> Option<&ClassInfo> {
        self.classes.iter().find(|c| c.id == class_id)
    }

    pub fn student(&self, class_id: &str, student_id: &str) -> Option<&Student> {
        self.students
            .iter()
            .find(|s| s.class_id == class_id && s.id == student_id)
    }

    /// Students of a class ordered by student number.
    pub fn students_for_class(&self, class_id: &str) -> Vec<&Student> {
        let mut rows: Vec<&Student> = self
            .students
            .iter()
            .filter(|s| s.class_id == class_id)
            .collect();
        rows.sort_by_key(|s| s.student_number);
        rows
    }

    pub fn student_count(&self, class_id: &str) -> usize {
        self.students.iter().filter(|s| s.class_id == class_id).count()
    }

    fn name_taken(&self, name: &str, exclude: Option<&str>) -> bool {
        let wanted = name.to_lowercase();
        self.classes
            .iter()
            .filter(|c| exclude != Some(c.id.as_str()))
            .any(|c| c.name.to_lowercase() == wanted)
    }

    fn number_taken(&self, class_id: &str, number: i64, exclude: Option<&str>) -> bool {
        self.students
            .iter()
            .filter(|s| s.class_id == class_id)
            .filter(|s| exclude != Some(s.id.as_str()))
            .any(|s| s.student_number == number)
    }

    pub fn create_class(
        &mut self,
        blob: &dyn BlobStore,
        name: &str,
    ) -> Result<Applied<ClassInfo>, RosterError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RosterError::EmptyClassName);
        }
        if self.name_taken(name, None) {
            return Err(RosterError::DuplicateClassName(name.to_string()));
        }
        let class = ClassInfo {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
        };
        self.classes.push(class.clone());
        Ok(Applied {
            value: class,
            persist_warning: self.persist_classes(blob),
        })
    }

    pub fn rename_class(
        &mut self,
        blob: &dyn BlobStore,
        class_id: &str,
        name: &str,
    ) -> Result<Applied<ClassInfo>, RosterError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RosterError::EmptyClassName);
        }
        if self.name_taken(name, Some(class_id)) {
            return Err(RosterError::DuplicateClassName(name.to_string()));
        }
        let class = self
            .classes
            .iter_mut()
            .find(|c| c.id == class_id)
            .ok_or(RosterError::ClassNotFound)?;
        class.name = name.to_string();
        let class = class.clone();
        Ok(Applied {
            value: class,
            persist_warning: self.persist_classes(blob),
        })
    }

    /// Remove a class and its students. Daily records and notes cascade in
    /// their own stores; the caller drives those.
    pub fn delete_class(
        &mut self,
        blob: &dyn BlobStore,
        class_id: &str,
    ) -> Result<Applied<usize>, RosterError> {
        let pos = self
            .classes
            .iter()
            .position(|c| c.id == class_id)
            .ok_or(RosterError::ClassNotFound)?;
        self.classes.remove(pos);
        let before = self.students.len();
        self.students.retain(|s| s.class_id != class_id);
        let removed_students = before - self.students.len();

        let mut warning = self.persist_classes(blob);
        if let Some(w) = self.persist_students(blob) {
            warning = Some(match warning {
                Some(prev) => format!("{}; {}", prev, w),
                None => w,
            });
        }
        Ok(Applied {
            value: removed_students,
            persist_warning: warning,
        })
    }

    pub fn create_student(
        &mut self,
        blob: &dyn BlobStore,
        class_id: &str,
        student_number: i64,
        first_name: &str,
        last_name: &str,
    ) -> Result<Applied<Student>, RosterError> {
        if self.class(class_id).is_none() {
            return Err(RosterError::ClassNotFound);
        }
        let first_name = first_name.trim();
        let last_name = last_name.trim();
        if first_name.is_empty() && last_name.is_empty() {
            return Err(RosterError::EmptyStudentName);
        }
        if self.number_taken(class_id, student_number, None) {
            return Err(RosterError::DuplicateStudentNumber(student_number));
        }
        let student = Student {
            id: Uuid::new_v4().to_string(),
            student_number,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            class_id: class_id.to_string(),
        };
        self.students.push(student.clone());
        Ok(Applied {
            value: student,
            persist_warning: self.persist_students(blob),
        })
    }

    pub fn update_student(
        &mut self,
        blob: &dyn BlobStore,
        class_id: &str,
        student_id: &str,
        student_number: Option<i64>,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Result<Applied<Student>, RosterError> {
        let pos = self
            .students
            .iter()
            .position(|s| s.class_id == class_id && s.id == student_id)
            .ok_or(RosterError::StudentNotFound)?;
        if let Some(number) = student_number {
            if self.number_taken(class_id, number, Some(student_id)) {
                return Err(RosterError::DuplicateStudentNumber(number));
            }
        }
        let student = &mut self.students[pos];
        if let Some(number) = student_number {
            student.student_number = number;
        }
        if let Some(first) = first_name {
            student.first_name = first.trim().to_string();
        }
        if let Some(last) = last_name {
            student.last_name = last.trim().to_string();
        }
        let student = student.clone();
        Ok(Applied {
            value: student,
            persist_warning: self.persist_students(blob),
        })
    }

    pub fn delete_student(
        &mut self,
        blob: &dyn BlobStore,
        class_id: &str,
        student_id: &str,
    ) -> Result<Applied<Student>, RosterError> {
        let pos = self
            .students
            .iter()
            .position(|s| s.class_id == class_id && s.id == student_id)
            .ok_or(RosterError::StudentNotFound)?;
        let student = self.students.remove(pos);
        Ok(Applied {
            value: student,
            persist_warning: self.persist_students(blob),
        })
    }

    /// Add every usable line of a pasted list in one batch with one persist.
    /// Lines that collide with an existing or in-batch student number are
    /// skipped and reported alongside the parse rejects.
    pub fn import_students(
        &mut self,
        blob: &dyn BlobStore,
        class_id: &str,
        text: &str,
    ) -> Result<Applied<ImportOutcome>, RosterError> {
        if self.class(class_id).is_none() {
            return Err(RosterError::ClassNotFound);
        }
        let (parsed, mut skipped) = parse_student_list(text);

        let mut added = Vec::new();
        for line in parsed {
            if self.number_taken(class_id, line.student_number, None) {
                skipped.push(SkippedLine {
                    line: line.line,
                    text: line.text,
                    reason: format!("student number {} is already taken", line.student_number),
                });
                continue;
            }
            let student = Student {
                id: Uuid::new_v4().to_string(),
                student_number: line.student_number,
                first_name: line.first_name,
                last_name: line.last_name,
                class_id: class_id.to_string(),
            };
            self.students.push(student.clone());
            added.push(student);
        }

        let persist_warning = if added.is_empty() {
            None
        } else {
            self.persist_students(blob)
        };
        Ok(Applied {
            value: ImportOutcome { added, skipped },
            persist_warning,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::MemStore;

    fn empty_store() -> RosterStore {
        RosterStore {
            classes: Vec::new(),
            students: Vec::new(),
        }
    }

    #[test]
    fn class_names_are_unique_case_insensitively() {
        let blob = MemStore::new();
        let mut roster = empty_store();
        roster.create_class(&blob, "6-A").expect("first create");
        let err = roster.create_class(&blob, "6-a").unwrap_err();
        assert!(matches!(err, RosterError::DuplicateClassName(_)));
        assert_eq!(roster.classes().len(), 1);
    }

    #[test]
    fn duplicate_student_number_is_rejected_before_commit() {
        let blob = MemStore::new();
        let mut roster = empty_store();
        let class = roster.create_class(&blob, "6-A").expect("create class").value;
        roster
            .create_student(&blob, &class.id, 7, "Ali", "Yılmaz")
            .expect("first student");
        let persisted_before = blob.get(STUDENTS_KEY).expect("students persisted");

        let err = roster
            .create_student(&blob, &class.id, 7, "Veli", "Demir")
            .unwrap_err();
        assert!(matches!(err, RosterError::DuplicateStudentNumber(7)));
        // Neither memory nor the blob changed.
        assert_eq!(roster.students_for_class(&class.id).len(), 1);
        assert_eq!(blob.get(STUDENTS_KEY).expect("unchanged"), persisted_before);
    }

    #[test]
    fn same_number_is_fine_across_classes() {
        let blob = MemStore::new();
        let mut roster = empty_store();
        let a = roster.create_class(&blob, "6-A").expect("class a").value;
        let b = roster.create_class(&blob, "6-B").expect("class b").value;
        roster
            .create_student(&blob, &a.id, 1, "Ali", "Yılmaz")
            .expect("student in a");
        roster
            .create_student(&blob, &b.id, 1, "Ayşe", "Demir")
            .expect("student in b");
    }

    #[test]
    fn update_may_keep_its_own_number() {
        let blob = MemStore::new();
        let mut roster = empty_store();
        let class = roster.create_class(&blob, "6-A").expect("class").value;
        let student = roster
            .create_student(&blob, &class.id, 3, "Ali", "Yılmaz")
            .expect("student")
            .value;
        let updated = roster
            .update_student(&blob, &class.id, &student.id, Some(3), Some("Alican"), None)
            .expect("update keeps own number")
            .value;
        assert_eq!(updated.first_name, "Alican");
        assert_eq!(updated.last_name, "Yılmaz");
    }

    #[test]
    fn delete_class_removes_its_students_only() {
        let blob = MemStore::new();
        let mut roster = empty_store();
        let a = roster.create_class(&blob, "6-A").expect("class a").value;
        let b = roster.create_class(&blob, "6-B").expect("class b").value;
        roster
            .create_student(&blob, &a.id, 1, "Ali", "Yılmaz")
            .expect("student");
        roster
            .create_student(&blob, &b.id, 1, "Ayşe", "Demir")
            .expect("student");

        let outcome = roster.delete_class(&blob, &a.id).expect("delete");
        assert_eq!(outcome.value, 1);
        assert!(roster.class(&a.id).is_none());
        assert_eq!(roster.students_for_class(&b.id).len(), 1);
    }

    #[test]
    fn pasted_list_parses_multi_word_given_names() {
        let (parsed, skipped) = parse_student_list(
            "1 Ali Yılmaz\n\n12 Ayşe Naz Demir\nkayıt dışı satır\n13 Tek\n",
        );
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1].student_number, 12);
        assert_eq!(parsed[1].first_name, "Ayşe Naz");
        assert_eq!(parsed[1].last_name, "Demir");
        assert_eq!(skipped.len(), 2);
        assert_eq!(skipped[0].line, 4);
        assert_eq!(skipped[1].line, 5);
    }

    #[test]
    fn import_skips_number_collisions_and_keeps_the_rest() {
        let blob = MemStore::new();
        let mut roster = empty_store();
        let class = roster.create_class(&blob, "6-A").expect("class").value;
        roster
            .create_student(&blob, &class.id, 1, "Ali", "Yılmaz")
            .expect("existing");

        let outcome = roster
            .import_students(&blob, &class.id, "1 Veli Kaya\n2 Ayşe Demir\n2 Can Demir\n")
            .expect("import")
            .value;
        assert_eq!(outcome.added.len(), 1);
        assert_eq!(outcome.added[0].student_number, 2);
        // Line 1 collides with the roster, line 3 with the batch itself.
        assert_eq!(outcome.skipped.len(), 2);
        assert_eq!(roster.students_for_class(&class.id).len(), 2);
    }

    #[test]
    fn seeds_fresh_workspace_and_reloads_it() {
        let blob = MemStore::new();
        let first = RosterStore::load(&blob);
        assert!(first.seeded);
        assert_eq!(first.store.classes().len(), 1);
        assert_eq!(first.store.students_for_class("ornek-6a").len(), 3);

        let second = RosterStore::load(&blob);
        assert!(!second.seeded);
        assert_eq!(second.store.classes().len(), 1);
    }

    #[test]
    fn corrupt_blob_loads_empty_with_warning() {
        let blob = MemStore::with(CLASSES_KEY, "[[[");
        let outcome = RosterStore::load(&blob);
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.store.classes().is_empty());
    }
}
