use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{
    attach_persistence, bad_params, get_optional_str, get_required_str, get_required_str_array,
    HandlerErr,
};
use crate::ipc::types::{App, AppState, Request};
use crate::notifications::{Notification, NotificationError};
use serde_json::json;

fn notification_err(e: NotificationError) -> HandlerErr {
    match e {
        NotificationError::EmptyTitle => bad_params(e.to_string()),
        NotificationError::NotFound => HandlerErr::new("not_found", e.to_string()),
    }
}

fn notification_json(notification: &Notification, is_read: bool) -> serde_json::Value {
    let mut value = serde_json::to_value(notification).unwrap_or_else(|_| json!({}));
    value["isRead"] = json!(is_read);
    value
}

fn list(app: &App) -> serde_json::Value {
    let notifications: Vec<serde_json::Value> = app
        .notifications
        .list()
        .into_iter()
        .map(|(n, is_read)| notification_json(n, is_read))
        .collect();
    json!({
        "notifications": notifications,
        "unreadCount": app.notifications.unread_count(),
    })
}

fn create(app: &mut App, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let title = get_required_str(params, "title")?;
    let body = get_optional_str(params, "body").unwrap_or_default();

    let outcome = app
        .notifications
        .create(&app.blob, &title, &body)
        .map_err(notification_err)?;
    let mut result = json!({
        "notification": notification_json(&outcome.value, false),
    });
    attach_persistence(&mut result, outcome.persist_warning);
    Ok(result)
}

fn delete(app: &mut App, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let id = get_required_str(params, "id")?;
    let outcome = app
        .notifications
        .delete(&app.blob, &id)
        .map_err(notification_err)?;
    let mut result = json!({ "id": outcome.value.id });
    attach_persistence(&mut result, outcome.persist_warning);
    Ok(result)
}

fn mark_read(app: &mut App, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let ids = get_required_str_array(params, "ids")?;
    let outcome = app.notifications.mark_read(&app.blob, &ids);
    let mut result = json!({
        "newlyRead": outcome.value,
        "unreadCount": app.notifications.unread_count(),
    });
    attach_persistence(&mut result, outcome.persist_warning);
    Ok(result)
}

fn profile_json(app: &App) -> serde_json::Value {
    serde_json::to_value(app.notifications.profile()).unwrap_or_else(|_| json!({}))
}

fn profile_update(
    app: &mut App,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let display_name = get_optional_str(params, "displayName");
    let branch = get_optional_str(params, "branch");
    let outcome = app.notifications.update_profile(
        &app.blob,
        display_name.as_deref(),
        branch.as_deref(),
    );
    let mut result = json!({
        "profile": serde_json::to_value(&outcome.value).unwrap_or_else(|_| json!({})),
    });
    attach_persistence(&mut result, outcome.persist_warning);
    Ok(result)
}

fn handle_notifications_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(app) = state.app.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    ok(&req.id, list(app))
}

fn handle_notifications_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(app) = state.app.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match create(app, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_notifications_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(app) = state.app.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match delete(app, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_notifications_mark_read(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(app) = state.app.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match mark_read(app, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_profile_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(app) = state.app.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    ok(&req.id, json!({ "profile": profile_json(app) }))
}

fn handle_profile_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(app) = state.app.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match profile_update(app, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "notifications.list" => Some(handle_notifications_list(state, req)),
        "notifications.create" => Some(handle_notifications_create(state, req)),
        "notifications.delete" => Some(handle_notifications_delete(state, req)),
        "notifications.markRead" => Some(handle_notifications_mark_read(state, req)),
        "profile.get" => Some(handle_profile_get(state, req)),
        "profile.update" => Some(handle_profile_update(state, req)),
        _ => None,
    }
}
