use crate::records::{AttendanceStatus, LegacyRecord};
use crate::roster::{ClassInfo, Student};

// Example data shown on a freshly created workspace. Record rows are kept in
// the flat pre-event-log shape so first load runs them through the real
// migration.

pub fn classes() -> Vec<ClassInfo> {
    vec![ClassInfo {
        id: "ornek-6a".to_string(),
        name: "6-A".to_string(),
    }]
}

pub fn students() -> Vec<Student> {
    let rows = [
        (1, "Ali", "Yılmaz", "ornek-ali"),
        (2, "Ayşe", "Demir", "ornek-ayse"),
        (3, "Mehmet", "Kaya", "ornek-mehmet"),
    ];
    rows.iter()
        .map(|(number, first, last, id)| Student {
            id: id.to_string(),
            student_number: *number,
            first_name: first.to_string(),
            last_name: last.to_string(),
            class_id: "ornek-6a".to_string(),
        })
        .collect()
}

pub fn legacy_records() -> Vec<LegacyRecord> {
    let rows: [(&str, Option<AttendanceStatus>, &str); 3] = [
        ("ornek-ali", Some(AttendanceStatus::Plus), "Derse aktif katıldı"),
        ("ornek-ayse", None, "Ödevini evde unutmuş"),
        ("ornek-mehmet", Some(AttendanceStatus::Absent), ""),
    ];
    rows.iter()
        .map(|(student_id, status, description)| LegacyRecord {
            class_id: "ornek-6a".to_string(),
            date: "2024-09-16".to_string(),
            student_id: student_id.to_string(),
            status: *status,
            description: description.to_string(),
        })
        .collect()
}
