use crate::error::AppError;
use crate::models::file_node::FileNode;
use crate::services::navigation_service::{Opened, PreviewState, Ticket};
use crate::state::AppState;

/// List, filter and enrich the export root, then hand the snapshot to the
/// navigator. Without `force`, an already loaded navigator is left alone.
///
/// Returns whether the navigator now shows a new snapshot.
pub async fn ingest_root(state: &AppState, force: bool) -> Result<bool, AppError> {
    let ticket = {
        let mut nav = state.navigator();
        if !force && nav.tree().is_some() {
            return Ok(false);
        }
        nav.begin_ingest(&state.root)
    };

    let raw = state.lister.list(&state.root, true).await?;
    let filtered = state.filter.filter(&raw);
    let enriched = state.enricher.enrich(&filtered).await;
    let nodes = enriched.node_count();

    let changed = state.navigator().complete_ingest(&ticket, enriched);
    if changed {
        tracing::info!(root = %state.root, nodes, "export root ingested");
    }
    Ok(changed)
}

/// Click on `path` in column `depth`: drills into directories, selects and
/// previews leaves.
pub async fn open_node(state: &AppState, depth: usize, path: &str) -> Result<Opened, AppError> {
    let opened = state.navigator().open(depth, path)?;
    if let Opened::Selected(ticket) = &opened {
        load_preview(state, ticket).await;
    }
    Ok(opened)
}

pub fn drill_into(state: &AppState, depth: usize, path: &str) -> Result<(), AppError> {
    let mut nav = state.navigator();
    let children = nav
        .columns()
        .get(depth)
        .and_then(|column| column.iter().find(|n| n.path == path))
        .ok_or_else(|| AppError::NotFound(format!("{path} at depth {depth}")))?
        .children
        .clone()
        .ok_or_else(|| AppError::Navigation(format!("{path} is not a directory")))?;
    nav.drill_into(depth, children)
}

/// Select the node at `path` in the current snapshot and load its preview.
pub async fn select_node(state: &AppState, path: &str) -> Result<PreviewState, AppError> {
    let ticket = {
        let mut nav = state.navigator();
        let node = nav
            .find(path)
            .cloned()
            .ok_or_else(|| AppError::NotFound(path.to_string()))?;
        nav.select(&node)
    };
    load_preview(state, &ticket).await;
    Ok(state.navigator().preview().clone())
}

/// Select a node that may not be part of the snapshot (a search hit).
pub(crate) async fn select_detached(state: &AppState, node: &FileNode) -> PreviewState {
    let ticket = state.navigator().select(node);
    load_preview(state, &ticket).await;
    state.navigator().preview().clone()
}

/// Load text for the ticket's target unless it is already present or
/// another load for the same path is running. A finished load settles
/// whichever selection of the path is waiting when it completes, so a caller
/// that skipped because of the running load still gets its preview.
pub(crate) async fn load_preview(state: &AppState, ticket: &Ticket) {
    let node = {
        let nav = state.navigator();
        match nav.preview() {
            PreviewState::Loading(path) if path == ticket.target() => {}
            _ => return,
        }
        match nav.find(ticket.target()) {
            Some(node) => node.clone(),
            None => FileNode::leaf(
                crate::scope_path::file_name(ticket.target()),
                ticket.target(),
            ),
        }
    };

    if !state.begin_preview(&node.path) {
        tracing::debug!(path = %node.path, "preview already loading");
        return;
    }
    let result = state.previews.load(&node).await;
    state.end_preview(&node.path);

    if let Err(e) = &result {
        tracing::warn!(path = %node.path, error = %e, "preview failed");
    }
    let mut nav = state.navigator();
    let ticket = nav
        .waiting_ticket(&node.path)
        .unwrap_or_else(|| ticket.clone());
    nav.apply_preview(&ticket, result);
}

/// Show `path` in the platform file manager. Failures are logged only.
pub async fn reveal_node(state: &AppState, path: &str) {
    if let Err(e) = state.revealer.reveal(path).await {
        tracing::warn!(path, error = %e, "reveal failed");
    }
}

/// Source media for a transcript, if a translation rule covers it.
pub fn media_for(state: &AppState, path: &str) -> Option<String> {
    state.translations.resolve(path)
}

pub fn selected_media(state: &AppState) -> Option<String> {
    let selection = state.navigator().selection().map(str::to_string)?;
    media_for(state, &selection)
}

/// Display-ordered columns.
pub fn columns(state: &AppState) -> Vec<Vec<FileNode>> {
    state.navigator().display_columns()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::services::file_service::TextReader;
    use crate::services::navigation_service::NavPhase;
    use crate::state::Collaborators;
    use crate::test_support::{FakeFileSystem, ScriptedIndex};
    use std::path::PathBuf;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    fn seeded_fs() -> Arc<FakeFileSystem> {
        let fs = FakeFileSystem::new();
        fs.add_dir("/out", 0);
        fs.add_dir("/out/AppleVoiceMemos", 1);
        fs.add_file("/out/AppleVoiceMemos/2023-01-01.txt", "first memo", 2);
        fs.add_file("/out/AppleVoiceMemos/2023-01-02.txt", "second memo", 3);
        fs.add_file("/out/AppleVoiceMemos/.DS_Store", "", 4);
        fs.add_dir("/out/ApplePhotos", 5);
        fs.add_file("/out/ApplePhotos/IMG_0001.txt", "beach", 6);
        Arc::new(fs)
    }

    fn state_with(fs: &Arc<FakeFileSystem>) -> AppState {
        let config = AppConfig {
            root_dir: PathBuf::from("/out"),
            ..AppConfig::default()
        };
        let collaborators = Collaborators {
            lister: fs.clone(),
            stats: fs.clone(),
            texts: fs.clone(),
            revealer: Arc::new(crate::shell::reveal::SystemRevealer),
            index: Arc::new(ScriptedIndex::new(Vec::new())),
        };
        AppState::new(&config, collaborators).unwrap()
    }

    #[tokio::test]
    async fn ingest_filters_enriches_and_loads_root_column() {
        let fs = seeded_fs();
        let state = state_with(&fs);

        assert!(ingest_root(&state, false).await.unwrap());

        let cols = columns(&state);
        assert_eq!(cols.len(), 1);
        let names: Vec<&str> = cols[0].iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["ApplePhotos", "AppleVoiceMemos"]);

        let nav = state.navigator();
        assert!(nav.find("/out/AppleVoiceMemos/.DS_Store").is_none());
        assert!(nav
            .find("/out/AppleVoiceMemos/2023-01-01.txt")
            .unwrap()
            .created_at
            .is_some());
    }

    #[tokio::test]
    async fn unforced_ingest_keeps_loaded_state() {
        let fs = seeded_fs();
        let state = state_with(&fs);
        ingest_root(&state, false).await.unwrap();
        drill_into(&state, 0, "/out/AppleVoiceMemos").unwrap();

        assert!(!ingest_root(&state, false).await.unwrap());
        assert_eq!(fs.list_calls.load(Ordering::SeqCst), 1);
        assert_eq!(state.navigator().phase(), NavPhase::Drilled(1));

        assert!(!ingest_root(&state, true).await.unwrap());
        assert_eq!(state.navigator().phase(), NavPhase::Drilled(1));

        fs.add_file("/out/AppleVoiceMemos/2023-01-03.txt", "third", 7);
        assert!(ingest_root(&state, true).await.unwrap());
        assert_eq!(state.navigator().phase(), NavPhase::Loaded);
    }

    #[tokio::test]
    async fn opening_a_leaf_previews_it_once() {
        let fs = seeded_fs();
        let state = state_with(&fs);
        ingest_root(&state, false).await.unwrap();

        open_node(&state, 0, "/out/AppleVoiceMemos").await.unwrap();
        let opened = open_node(&state, 1, "/out/AppleVoiceMemos/2023-01-01.txt")
            .await
            .unwrap();
        assert!(matches!(opened, Opened::Selected(_)));

        match state.navigator().preview() {
            PreviewState::Ready(node) => assert_eq!(node.text.as_deref(), Some("first memo")),
            other => panic!("unexpected preview: {other:?}"),
        }
        assert_eq!(fs.text_reads.load(Ordering::SeqCst), 1);

        let again = select_node(&state, "/out/AppleVoiceMemos/2023-01-01.txt")
            .await
            .unwrap();
        assert!(matches!(again, PreviewState::Ready(_)));
        assert_eq!(fs.text_reads.load(Ordering::SeqCst), 1);
    }

    /// Reads block until the test opens the gate.
    struct GatedTexts {
        inner: Arc<FakeFileSystem>,
        gate: Arc<tokio::sync::Notify>,
    }

    #[async_trait::async_trait]
    impl TextReader for GatedTexts {
        async fn read_text(&self, path: &str) -> Result<String, AppError> {
            self.gate.notified().await;
            self.inner.read_text(path).await
        }
    }

    #[tokio::test]
    async fn preview_started_before_a_drill_settles_the_reselection() {
        let fs = seeded_fs();
        let gate = Arc::new(tokio::sync::Notify::new());
        let config = AppConfig {
            root_dir: PathBuf::from("/out"),
            ..AppConfig::default()
        };
        let collaborators = Collaborators {
            lister: fs.clone(),
            stats: fs.clone(),
            texts: Arc::new(GatedTexts {
                inner: fs.clone(),
                gate: gate.clone(),
            }),
            revealer: Arc::new(crate::shell::reveal::SystemRevealer),
            index: Arc::new(ScriptedIndex::new(Vec::new())),
        };
        let state = AppState::new(&config, collaborators).unwrap();
        ingest_root(&state, false).await.unwrap();
        let memo = "/out/AppleVoiceMemos/2023-01-01.txt";

        let first = select_node(&state, memo);
        let interleaved = async {
            while !state.previews_in_flight.lock().unwrap().contains(memo) {
                tokio::task::yield_now().await;
            }
            drill_into(&state, 0, "/out/AppleVoiceMemos").unwrap();
            let second = select_node(&state, memo).await.unwrap();
            assert_eq!(second, PreviewState::Loading(memo.to_string()));
            gate.notify_one();
        };
        let (first, ()) = tokio::join!(first, interleaved);
        first.unwrap();

        match state.navigator().preview() {
            PreviewState::Ready(node) => assert_eq!(node.text.as_deref(), Some("first memo")),
            other => panic!("unexpected preview: {other:?}"),
        }
        assert!(state.previews_in_flight.lock().unwrap().is_empty());
        assert_eq!(fs.text_reads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_preview_is_reported_in_state() {
        let fs = seeded_fs();
        fs.fail_read("/out/ApplePhotos/IMG_0001.txt");
        let state = state_with(&fs);
        ingest_root(&state, false).await.unwrap();

        let preview = select_node(&state, "/out/ApplePhotos/IMG_0001.txt")
            .await
            .unwrap();
        assert!(matches!(preview, PreviewState::Failed { .. }));
        assert!(state.previews_in_flight.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn drilling_into_a_leaf_is_rejected() {
        let fs = seeded_fs();
        let state = state_with(&fs);
        ingest_root(&state, false).await.unwrap();
        drill_into(&state, 0, "/out/AppleVoiceMemos").unwrap();

        assert!(matches!(
            drill_into(&state, 1, "/out/AppleVoiceMemos/2023-01-01.txt"),
            Err(AppError::Navigation(_))
        ));
        assert!(matches!(
            select_node(&state, "/out/missing.txt").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn selection_resolves_to_media() {
        let fs = seeded_fs();
        let state = state_with(&fs);
        ingest_root(&state, false).await.unwrap();
        assert_eq!(selected_media(&state), None);

        select_node(&state, "/out/AppleVoiceMemos/2023-01-02.txt")
            .await
            .unwrap();
        let media = selected_media(&state).unwrap();
        assert!(media.ends_with("/Recordings/2023-01-02.m4a"));

        let photo = media_for(&state, "/out/ApplePhotos/IMG_0001.txt").unwrap();
        assert!(photo.ends_with("/originals/i/IMG_0001.mov"));
        assert_eq!(media_for(&state, "/out/elsewhere/a.txt"), None);
    }
}
