use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{attach_persistence, get_required_str, HandlerErr};
use crate::ipc::types::{App, AppState, Request};
use serde_json::json;

fn get(app: &App, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    if app.roster.class(&class_id).is_none() {
        return Err(HandlerErr::new("not_found", "class not found"));
    }
    let notes: Vec<serde_json::Value> = app
        .notes
        .notes_for_class(&class_id)
        .into_iter()
        .map(|n| json!({ "studentId": n.student_id, "note": n.note }))
        .collect();
    Ok(json!({ "notes": notes }))
}

fn update(app: &mut App, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    let student_id = get_required_str(params, "studentId")?;
    let note = get_required_str(params, "note")?;
    if app.roster.student(&class_id, &student_id).is_none() {
        return Err(HandlerErr::new("not_found", "student not found"));
    }

    let outcome = app.notes.upsert(&app.blob, &class_id, &student_id, &note);
    let mut result = match outcome.value {
        Some(row) => json!({ "studentId": row.student_id, "note": row.note }),
        None => json!({ "studentId": student_id, "note": serde_json::Value::Null }),
    };
    attach_persistence(&mut result, outcome.persist_warning);
    Ok(result)
}

fn handle_notes_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(app) = state.app.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match get(app, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_notes_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(app) = state.app.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match update(app, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "notes.get" => Some(handle_notes_get(state, req)),
        "notes.update" => Some(handle_notes_update(state, req)),
        _ => None,
    }
}
