use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{
    attach_persistence, bad_params, get_required_str, get_required_u8, HandlerErr,
};
use crate::ipc::types::{App, AppState, Request};
use crate::schedule::ScheduleError;
use serde_json::json;

fn schedule_err(e: ScheduleError) -> HandlerErr {
    match e {
        ScheduleError::DayOutOfRange
        | ScheduleError::PeriodOutOfRange
        | ScheduleError::EmptyLabel => bad_params(e.to_string()),
    }
}

fn get(app: &App) -> serde_json::Value {
    let slots: Vec<serde_json::Value> = app
        .schedule
        .slots()
        .iter()
        .map(|s| json!({ "day": s.day, "period": s.period, "label": s.label }))
        .collect();
    json!({ "slots": slots })
}

fn set_slot(app: &mut App, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let day = get_required_u8(params, "day")?;
    let period = get_required_u8(params, "period")?;
    let label = get_required_str(params, "label")?;

    let outcome = app
        .schedule
        .set_slot(&app.blob, day, period, &label)
        .map_err(schedule_err)?;
    let mut result = json!({
        "slot": {
            "day": outcome.value.day,
            "period": outcome.value.period,
            "label": outcome.value.label,
        }
    });
    attach_persistence(&mut result, outcome.persist_warning);
    Ok(result)
}

fn clear_slot(app: &mut App, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let day = get_required_u8(params, "day")?;
    let period = get_required_u8(params, "period")?;

    let outcome = app
        .schedule
        .clear_slot(&app.blob, day, period)
        .map_err(schedule_err)?;
    let mut result = json!({ "cleared": outcome.value });
    attach_persistence(&mut result, outcome.persist_warning);
    Ok(result)
}

fn handle_schedule_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(app) = state.app.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    ok(&req.id, get(app))
}

fn handle_schedule_set_slot(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(app) = state.app.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match set_slot(app, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_schedule_clear_slot(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(app) = state.app.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match clear_slot(app, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "schedule.get" => Some(handle_schedule_get(state, req)),
        "schedule.setSlot" => Some(handle_schedule_set_slot(state, req)),
        "schedule.clearSlot" => Some(handle_schedule_clear_slot(state, req)),
        _ => None,
    }
}
