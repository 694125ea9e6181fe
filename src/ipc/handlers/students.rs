use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{
    attach_persistence, get_optional_str, get_required_i64, get_required_str, merge_warnings,
    HandlerErr,
};
use crate::ipc::types::{App, AppState, Request};
use crate::roster::Student;
use serde_json::json;

use super::classes::roster_err;

fn student_json(student: &Student) -> serde_json::Value {
    json!({
        "id": student.id,
        "studentNumber": student.student_number,
        "firstName": student.first_name,
        "lastName": student.last_name,
        "classId": student.class_id,
        "displayName": format!("{}, {}", student.last_name, student.first_name),
    })
}

fn list(app: &App, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    let students: Vec<serde_json::Value> = app
        .roster
        .students_for_class(&class_id)
        .into_iter()
        .map(student_json)
        .collect();
    Ok(json!({ "students": students }))
}

fn create(app: &mut App, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    let student_number = get_required_i64(params, "studentNumber")?;
    let first_name = get_required_str(params, "firstName")?;
    let last_name = get_required_str(params, "lastName")?;

    let outcome = app
        .roster
        .create_student(&app.blob, &class_id, student_number, &first_name, &last_name)
        .map_err(roster_err)?;
    let mut result = json!({
        "studentId": outcome.value.id,
        "student": student_json(&outcome.value),
    });
    attach_persistence(&mut result, outcome.persist_warning);
    Ok(result)
}

fn update(app: &mut App, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    let student_id = get_required_str(params, "studentId")?;
    let patch = params.get("patch").cloned().unwrap_or_else(|| json!({}));

    let student_number = patch.get("studentNumber").and_then(|v| v.as_i64());
    let first_name = get_optional_str(&patch, "firstName");
    let last_name = get_optional_str(&patch, "lastName");

    let outcome = app
        .roster
        .update_student(
            &app.blob,
            &class_id,
            &student_id,
            student_number,
            first_name.as_deref(),
            last_name.as_deref(),
        )
        .map_err(roster_err)?;
    let mut result = json!({ "student": student_json(&outcome.value) });
    attach_persistence(&mut result, outcome.persist_warning);
    Ok(result)
}

/// Removing a student also drops their daily records and note.
fn delete(app: &mut App, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    let student_id = get_required_str(params, "studentId")?;

    let roster_outcome = app
        .roster
        .delete_student(&app.blob, &class_id, &student_id)
        .map_err(roster_err)?;
    let records_outcome = app
        .records
        .delete_for_student(&app.blob, &class_id, &student_id);
    let notes_outcome = app
        .notes
        .delete_for_student(&app.blob, &class_id, &student_id);

    let warning = merge_warnings(vec![
        roster_outcome.persist_warning,
        records_outcome.persist_warning,
        notes_outcome.persist_warning,
    ]);
    let mut result = json!({
        "student": student_json(&roster_outcome.value),
        "removedRecords": records_outcome.value,
        "removedNotes": notes_outcome.value,
    });
    attach_persistence(&mut result, warning);
    Ok(result)
}

fn import_list(
    app: &mut App,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    let text = get_required_str(params, "text")?;

    let outcome = app
        .roster
        .import_students(&app.blob, &class_id, &text)
        .map_err(roster_err)?;
    let added: Vec<serde_json::Value> = outcome.value.added.iter().map(student_json).collect();
    let skipped = serde_json::to_value(&outcome.value.skipped).unwrap_or_else(|_| json!([]));
    let mut result = json!({
        "added": added,
        "skipped": skipped,
    });
    attach_persistence(&mut result, outcome.persist_warning);
    Ok(result)
}

fn handle_students_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(app) = state.app.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match list(app, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_students_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(app) = state.app.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match create(app, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_students_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(app) = state.app.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match update(app, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_students_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(app) = state.app.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match delete(app, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_students_import_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(app) = state.app.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match import_list(app, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(handle_students_list(state, req)),
        "students.create" => Some(handle_students_create(state, req)),
        "students.update" => Some(handle_students_update(state, req)),
        "students.delete" => Some(handle_students_delete(state, req)),
        "students.importList" => Some(handle_students_import_list(state, req)),
        _ => None,
    }
}
