use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

use crate::commands::file_commands::ingest_root;
use crate::error::AppError;
use crate::models::search::SyncResult;
use crate::services::watch_service::{self, WatchEvent};
use crate::state::AppState;

/// Push the current snapshot to the search index and remember the outcome.
pub async fn sync_index(state: &AppState) -> SyncResult {
    let tree = state.navigator().tree().cloned();
    let result = match tree {
        Some(tree) => state.synchronizer.sync(&tree).await,
        None => SyncResult::Failed {
            task_id: None,
            reason: "nothing has been ingested yet".to_string(),
        },
    };
    state.record_sync(&result);
    result
}

pub fn start_watching(state: &AppState, sender: UnboundedSender<WatchEvent>) -> Result<(), AppError> {
    let mut handle = state.watcher();
    if handle.is_some() {
        return Ok(());
    }
    *handle = Some(watch_service::start_watching(
        &state.root,
        state.watch_debounce,
        state.filter.clone(),
        sender,
    )?);
    Ok(())
}

/// Returns whether a watcher was running.
pub fn stop_watching(state: &AppState) -> bool {
    match state.watcher().take() {
        Some(handle) => {
            watch_service::stop_watching(handle);
            true
        }
        None => false,
    }
}

/// Re-ingest and re-sync for every settled change until the channel closes.
pub async fn watch_loop(state: &AppState, mut events: UnboundedReceiver<WatchEvent>) {
    while let Some(WatchEvent::RootChanged { paths }) = events.recv().await {
        tracing::debug!(changed = paths.len(), "re-ingesting after change");
        if let Err(e) = ingest_root(state, true).await {
            tracing::warn!(error = %e, "re-ingest failed");
            continue;
        }
        let result = sync_index(state).await;
        if !result.is_success() {
            tracing::warn!(task = ?result.task_id(), "re-sync failed; will retry on next change");
        }
    }
}
