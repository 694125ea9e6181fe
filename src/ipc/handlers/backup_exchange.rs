use crate::backup;
use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{App, AppState, Request};
use serde_json::json;
use std::path::PathBuf;

fn required_path(params: &serde_json::Value, key: &str) -> Option<PathBuf> {
    params.get(key).and_then(|v| v.as_str()).map(PathBuf::from)
}

fn handle_export_bundle(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(workspace_path) = required_path(&req.params, "workspacePath")
        .or_else(|| state.workspace.clone())
    else {
        return err(&req.id, "bad_params", "missing workspacePath", None);
    };
    let Some(out_path) = required_path(&req.params, "outPath") else {
        return err(&req.id, "bad_params", "missing outPath", None);
    };

    match backup::export_workspace_bundle(&workspace_path, &out_path) {
        Ok(summary) => ok(
            &req.id,
            json!({
                "bundleFormat": summary.bundle_format,
                "entryCount": summary.entry_count,
                "dbSha256": summary.db_sha256,
                "outPath": out_path.to_string_lossy(),
            }),
        ),
        Err(e) => err(&req.id, "backup_export_failed", format!("{e:#}"), None),
    }
}

fn handle_import_bundle(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(workspace_path) = required_path(&req.params, "workspacePath")
        .or_else(|| state.workspace.clone())
    else {
        return err(&req.id, "bad_params", "missing workspacePath", None);
    };
    let Some(in_path) = required_path(&req.params, "inPath") else {
        return err(&req.id, "bad_params", "missing inPath", None);
    };

    let summary = match backup::import_workspace_bundle(&in_path, &workspace_path) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "backup_import_failed", format!("{e:#}"), None),
    };

    // If the imported bundle targets the open workspace, reload so the new
    // data is what subsequent requests see.
    let mut reloaded = false;
    let mut warnings: Vec<String> = Vec::new();
    if state.workspace.as_deref() == Some(workspace_path.as_path()) {
        match db::open_db(&workspace_path) {
            Ok(conn) => {
                let (app, report) = App::load(conn);
                warnings = report.warnings;
                state.app = Some(app);
                reloaded = true;
            }
            Err(e) => {
                return err(
                    &req.id,
                    "db_open_failed",
                    format!("bundle imported but workspace reload failed: {e:?}"),
                    None,
                )
            }
        }
    }

    ok(
        &req.id,
        json!({
            "bundleFormatDetected": summary.bundle_format_detected,
            "reloaded": reloaded,
            "warnings": warnings,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "backup.exportWorkspaceBundle" => Some(handle_export_bundle(state, req)),
        "backup.importWorkspaceBundle" => Some(handle_import_bundle(state, req)),
        _ => None,
    }
}
