pub mod commands;
pub mod config;
pub mod data;
pub mod error;
pub mod logging;
pub mod models;
pub(crate) mod scope_path;
pub mod services;
pub mod shell;
pub mod state;

#[cfg(test)]
mod test_support;

use commands::{file_commands, indexing_commands};
use config::AppConfig;
use error::AppError;
use models::search::SyncResult;
use state::{AppState, Collaborators};

async fn run_session(config: AppConfig) -> anyhow::Result<()> {
    let index = data::index::open_index(&config.index)?;
    let state = AppState::new(&config, Collaborators::local(index))?;

    file_commands::ingest_root(&state, true)
        .await
        .map_err(AppError::capture)?;
    let visible = file_commands::columns(&state)
        .first()
        .map(Vec::len)
        .unwrap_or(0);
    tracing::info!(root = %state.root, entries = visible, "root column ready");

    match indexing_commands::sync_index(&state).await {
        SyncResult::Synced { documents, task_id } => {
            tracing::info!(documents, task = ?task_id, "search index up to date");
        }
        failed @ SyncResult::Failed { .. } => {
            // Browsing still works without search; the next change retries.
            if let Err(e) = failed.into_result() {
                tracing::warn!(error = %e, "initial index sync failed");
                e.capture();
            }
        }
    }

    if !config.watch.enabled {
        return Ok(());
    }

    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    indexing_commands::start_watching(&state, tx)?;
    tokio::select! {
        _ = indexing_commands::watch_loop(&state, rx) => {}
        signal = tokio::signal::ctrl_c() => {
            signal?;
            tracing::info!("interrupt received, shutting down");
        }
    }
    indexing_commands::stop_watching(&state);
    Ok(())
}

pub fn run() -> anyhow::Result<()> {
    let _guard = std::env::var("SENTRY_DSN")
        .ok()
        .filter(|dsn| !dsn.trim().is_empty())
        .map(|dsn| {
            sentry::init((
                dsn,
                sentry::ClientOptions {
                    release: sentry::release_name!(),
                    send_default_pii: false,
                    ..Default::default()
                },
            ))
        });

    let config = AppConfig::load()?;
    logging::init_logging(&config.logging)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run_session(config))
}
