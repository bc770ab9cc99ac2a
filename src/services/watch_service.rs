use std::path::Path;
use std::time::Duration;

use notify_debouncer_mini::notify;
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, DebouncedEvent};
use tokio::sync::mpsc::UnboundedSender;

use crate::error::AppError;
use crate::services::filter_service::TreeFilter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// Something below the root settled after a change; `paths` are the
    /// changed entries that survived the tree filter.
    RootChanged { paths: Vec<String> },
}

pub struct WatchHandle {
    root: String,
    _debouncer: notify_debouncer_mini::Debouncer<notify::RecommendedWatcher>,
}

impl WatchHandle {
    pub fn root(&self) -> &str {
        &self.root
    }
}

/// Paths from one debounced batch that are not housekeeping noise.
pub fn relevant_paths(events: &[DebouncedEvent], filter: &TreeFilter) -> Vec<String> {
    let mut paths: Vec<String> = events
        .iter()
        .filter(|event| {
            !event
                .path
                .iter()
                .any(|segment| filter.is_excluded(&segment.to_string_lossy()))
        })
        .map(|event| event.path.to_string_lossy().to_string())
        .collect();
    paths.sort();
    paths.dedup();
    paths
}

pub fn start_watching(
    root: &str,
    debounce: Duration,
    filter: TreeFilter,
    sender: UnboundedSender<WatchEvent>,
) -> Result<WatchHandle, AppError> {
    let root_path = Path::new(root);
    if !root_path.is_dir() {
        return Err(AppError::Watcher(format!("not a directory: {root}")));
    }

    let mut debouncer = new_debouncer(debounce, move |result: DebounceEventResult| match result {
        Ok(events) => {
            let paths = relevant_paths(&events, &filter);
            if paths.is_empty() {
                return;
            }
            tracing::debug!(changed = paths.len(), "export root changed");
            if sender.send(WatchEvent::RootChanged { paths }).is_err() {
                tracing::debug!("watch receiver dropped");
            }
        }
        Err(e) => {
            tracing::warn!(error = ?e, "watcher error");
        }
    })
    .map_err(|e| AppError::Watcher(e.to_string()))?;

    debouncer
        .watcher()
        .watch(root_path, notify::RecursiveMode::Recursive)
        .map_err(|e| AppError::Watcher(e.to_string()))?;

    tracing::info!(root, debounce_ms = debounce.as_millis() as u64, "watching export root");
    Ok(WatchHandle {
        root: root.to_string(),
        _debouncer: debouncer,
    })
}

pub fn stop_watching(handle: WatchHandle) {
    tracing::info!(root = %handle.root, "stopped watching export root");
    drop(handle);
}
