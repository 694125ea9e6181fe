use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{
    attach_persistence, bad_params, get_required_str, get_required_str_array, HandlerErr,
};
use crate::ipc::types::{App, AppState, Request};
use crate::records::{current_status, DailyRecord, EventKind, RecordError};
use serde_json::json;

fn record_err(e: RecordError) -> HandlerErr {
    match e {
        RecordError::BadDate(_) => bad_params(e.to_string()),
    }
}

fn parse_event(params: &serde_json::Value) -> Result<EventKind, HandlerErr> {
    let Some(raw) = params.get("event") else {
        return Err(bad_params("missing event"));
    };
    serde_json::from_value(raw.clone())
        .map_err(|_| bad_params("event must be { type: \"status\"|\"note\", value }"))
}

fn record_json(record: &DailyRecord) -> serde_json::Value {
    let mut value = serde_json::to_value(record).unwrap_or_else(|_| json!({}));
    value["currentStatus"] = serde_json::to_value(current_status(&record.events))
        .unwrap_or(serde_json::Value::Null);
    value
}

fn for_date(app: &App, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    let date = get_required_str(params, "date")?;
    let records: Vec<serde_json::Value> = app
        .records
        .records_for_date(&class_id, &date)
        .into_iter()
        .map(record_json)
        .collect();
    Ok(json!({ "records": records }))
}

fn add_event(app: &mut App, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    let student_id = get_required_str(params, "studentId")?;
    let date = get_required_str(params, "date")?;
    let kind = parse_event(params)?;

    let outcome = app
        .records
        .add_event(&app.blob, &class_id, &student_id, &date, kind)
        .map_err(record_err)?;

    let record = app
        .records
        .get(&class_id, &student_id, &date)
        .map(record_json)
        .unwrap_or(serde_json::Value::Null);
    let mut result = json!({
        "eventId": outcome.value,
        "record": record,
    });
    attach_persistence(&mut result, outcome.persist_warning);
    Ok(result)
}

fn add_bulk_events(
    app: &mut App,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    let student_ids = get_required_str_array(params, "studentIds")?;
    let date = get_required_str(params, "date")?;
    let kind = parse_event(params)?;

    let outcome = app
        .records
        .add_bulk_events(&app.blob, &class_id, &student_ids, &date, &kind)
        .map_err(record_err)?;

    let mut result = json!({
        "eventIds": outcome.value,
        "studentCount": student_ids.len(),
    });
    attach_persistence(&mut result, outcome.persist_warning);
    Ok(result)
}

fn remove_event(
    app: &mut App,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    let student_id = get_required_str(params, "studentId")?;
    let date = get_required_str(params, "date")?;
    let event_id = get_required_str(params, "eventId")?;

    // A missing record or event id is already satisfied, not an error.
    let outcome = app
        .records
        .remove_event(&app.blob, &class_id, &student_id, &date, &event_id);

    let record = app
        .records
        .get(&class_id, &student_id, &date)
        .map(record_json)
        .unwrap_or(serde_json::Value::Null);
    let mut result = json!({
        "removed": outcome.value,
        "record": record,
    });
    attach_persistence(&mut result, outcome.persist_warning);
    Ok(result)
}

fn handle_for_date(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(app) = state.app.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match for_date(app, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_add_event(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(app) = state.app.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match add_event(app, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_add_bulk_events(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(app) = state.app.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match add_bulk_events(app, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_remove_event(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(app) = state.app.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match remove_event(app, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "records.forDate" => Some(handle_for_date(state, req)),
        "records.addEvent" => Some(handle_add_event(state, req)),
        "records.addBulkEvents" => Some(handle_add_bulk_events(state, req)),
        "records.removeEvent" => Some(handle_remove_event(state, req)),
        _ => None,
    }
}
