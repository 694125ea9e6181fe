use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{attach_persistence, get_required_str, merge_warnings, HandlerErr};
use crate::ipc::types::{App, AppState, Request};
use crate::roster::RosterError;
use serde_json::json;

pub fn roster_err(e: RosterError) -> HandlerErr {
    let code = match &e {
        RosterError::EmptyClassName | RosterError::EmptyStudentName => "bad_params",
        RosterError::DuplicateClassName(_) => "duplicate_name",
        RosterError::DuplicateStudentNumber(_) => "duplicate_student_number",
        RosterError::ClassNotFound | RosterError::StudentNotFound => "not_found",
    };
    HandlerErr::new(code, e.to_string())
}

fn list(app: &App) -> serde_json::Value {
    let classes: Vec<serde_json::Value> = app
        .roster
        .classes()
        .iter()
        .map(|c| {
            json!({
                "id": c.id,
                "name": c.name,
                "studentCount": app.roster.student_count(&c.id),
            })
        })
        .collect();
    json!({ "classes": classes })
}

fn create(app: &mut App, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let name = get_required_str(params, "name")?;
    let outcome = app
        .roster
        .create_class(&app.blob, &name)
        .map_err(roster_err)?;
    let mut result = json!({
        "classId": outcome.value.id,
        "name": outcome.value.name,
    });
    attach_persistence(&mut result, outcome.persist_warning);
    Ok(result)
}

fn rename(app: &mut App, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    let name = get_required_str(params, "name")?;
    let outcome = app
        .roster
        .rename_class(&app.blob, &class_id, &name)
        .map_err(roster_err)?;
    let mut result = json!({
        "classId": outcome.value.id,
        "name": outcome.value.name,
    });
    attach_persistence(&mut result, outcome.persist_warning);
    Ok(result)
}

/// Deleting a class cascades through every store that references it. The
/// roster owns the trigger; records and notes only execute their part.
fn delete(app: &mut App, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;

    let roster_outcome = app
        .roster
        .delete_class(&app.blob, &class_id)
        .map_err(roster_err)?;
    let records_outcome = app.records.delete_for_class(&app.blob, &class_id);
    let notes_outcome = app.notes.delete_for_class(&app.blob, &class_id);

    let warning = merge_warnings(vec![
        roster_outcome.persist_warning,
        records_outcome.persist_warning,
        notes_outcome.persist_warning,
    ]);
    let mut result = json!({
        "classId": class_id,
        "removedStudents": roster_outcome.value,
        "removedRecords": records_outcome.value,
        "removedNotes": notes_outcome.value,
    });
    attach_persistence(&mut result, warning);
    Ok(result)
}

fn handle_classes_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(app) = state.app.as_ref() else {
        return ok(&req.id, json!({ "classes": [] }));
    };
    ok(&req.id, list(app))
}

fn handle_classes_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(app) = state.app.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match create(app, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_classes_rename(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(app) = state.app.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match rename(app, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_classes_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(app) = state.app.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match delete(app, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "classes.list" => Some(handle_classes_list(state, req)),
        "classes.create" => Some(handle_classes_create(state, req)),
        "classes.rename" => Some(handle_classes_rename(state, req)),
        "classes.delete" => Some(handle_classes_delete(state, req)),
        _ => None,
    }
}
