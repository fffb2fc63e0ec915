use crate::db::SqliteSlots;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::store::RecordStore;
use crate::student_id::StudentIdGenerator;
use serde_json::json;
use std::path::{Path, PathBuf};

/// Opens (or creates) the workspace database, loads the stored records and
/// reseeds the id counters from their student IDs.
pub fn open_workspace(state: &mut AppState, path: &Path) -> anyhow::Result<()> {
    let slots = SqliteSlots::open(path)?;
    let store = RecordStore::open(slots);
    state.ids = StudentIdGenerator::seeded(store.student_ids());
    tracing::info!(
        workspace = %path.display(),
        records = store.len(),
        status = ?store.load_status(),
        "workspace opened"
    );
    state.workspace = Some(path.to_path_buf());
    state.store = Some(store);
    Ok(())
}

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string())
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    match open_workspace(state, &path) {
        Ok(()) => {
            let (record_count, load_status) = state
                .store
                .as_ref()
                .map(|s| (s.len(), json!(s.load_status())))
                .unwrap_or((0, json!(null)));
            ok(
                &req.id,
                json!({
                    "workspacePath": path.to_string_lossy(),
                    "recordCount": record_count,
                    "loadStatus": load_status,
                }),
            )
        }
        Err(e) => err(&req.id, "db_open_failed", format!("{e:?}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        _ => None,
    }
}
