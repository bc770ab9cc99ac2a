use crate::commands::file_commands::select_detached;
use crate::error::AppError;
use crate::models::search::SearchHit;
use crate::scope_path::is_within_root;
use crate::services::navigation_service::PreviewState;
use crate::services::search_service::node_for_hit;
use crate::state::AppState;

pub async fn search(state: &AppState, query: &str, limit: usize) -> Result<Vec<SearchHit>, AppError> {
    state.search.search(query, limit).await
}

/// Route a chosen hit through the same select and preview path as a node
/// picked in the columns. Hits outside the export root are not opened.
pub async fn open_search_hit(state: &AppState, hit: &SearchHit) -> Result<PreviewState, AppError> {
    if !is_within_root(&hit.path, &state.root) {
        return Err(AppError::NotFound(format!(
            "{} is outside {}",
            hit.path, state.root
        )));
    }
    let node = {
        let nav = state.navigator();
        node_for_hit(nav.tree(), hit)
    };
    Ok(select_detached(state, &node).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::file_commands::{ingest_root, media_for};
    use crate::commands::indexing_commands::sync_index;
    use crate::config::{AppConfig, IndexBackend};
    use crate::data::sqlite::SqliteIndex;
    use crate::state::Collaborators;
    use crate::test_support::FakeFileSystem;
    use std::path::PathBuf;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    async fn indexed_state(fs: &Arc<FakeFileSystem>) -> AppState {
        let mut config = AppConfig {
            root_dir: PathBuf::from("/out"),
            text_loading: crate::services::metadata_service::TextLoading::Eager,
            ..AppConfig::default()
        };
        config.index.backend = IndexBackend::Sqlite;
        config.index.poll_interval_ms = 0;

        let collaborators = Collaborators {
            lister: fs.clone(),
            stats: fs.clone(),
            texts: fs.clone(),
            revealer: Arc::new(crate::shell::reveal::SystemRevealer),
            index: Arc::new(SqliteIndex::open_in_memory().unwrap()),
        };
        let state = AppState::new(&config, collaborators).unwrap();
        ingest_root(&state, false).await.unwrap();
        assert!(sync_index(&state).await.is_success());
        state
    }

    fn seeded_fs() -> Arc<FakeFileSystem> {
        let fs = FakeFileSystem::new();
        fs.add_dir("/out", 0);
        fs.add_dir("/out/AppleVoiceMemos", 1);
        fs.add_file("/out/AppleVoiceMemos/2023-01-01.txt", "pick up the dry cleaning", 2);
        fs.add_file("/out/AppleVoiceMemos/2023-01-02.txt", "dentist on friday", 3);
        Arc::new(fs)
    }

    #[tokio::test]
    async fn hit_opens_the_snapshot_node_without_rereading() {
        let fs = seeded_fs();
        let state = indexed_state(&fs).await;
        let reads_after_ingest = fs.text_reads.load(Ordering::SeqCst);

        let hits = search(&state, "dentist", 10).await.unwrap();
        assert_eq!(hits.len(), 1);

        let preview = open_search_hit(&state, &hits[0]).await.unwrap();
        match preview {
            PreviewState::Ready(node) => {
                assert_eq!(node.text.as_deref(), Some("dentist on friday"))
            }
            other => panic!("unexpected preview: {other:?}"),
        }
        assert_eq!(fs.text_reads.load(Ordering::SeqCst), reads_after_ingest);
        assert_eq!(
            state.navigator().selection(),
            Some("/out/AppleVoiceMemos/2023-01-02.txt")
        );
        assert!(media_for(&state, &hits[0].path).unwrap().ends_with(".m4a"));
    }

    #[tokio::test]
    async fn hit_outside_the_snapshot_is_loaded_by_path() {
        let fs = seeded_fs();
        let state = indexed_state(&fs).await;
        fs.add_file("/out/late.txt", "arrived after ingest", 9);

        let hit = SearchHit {
            index_id: crate::models::file_node::index_id_for("/out/late.txt"),
            name: "late.txt".to_string(),
            path: "/out/late.txt".to_string(),
            snippet: None,
            created_at: None,
        };
        match open_search_hit(&state, &hit).await.unwrap() {
            PreviewState::Ready(node) => {
                assert_eq!(node.text.as_deref(), Some("arrived after ingest"))
            }
            other => panic!("unexpected preview: {other:?}"),
        }
    }

    #[tokio::test]
    async fn hit_from_another_root_is_refused() {
        let fs = seeded_fs();
        let state = indexed_state(&fs).await;
        let hit = SearchHit {
            index_id: crate::models::file_node::index_id_for("/elsewhere/a.txt"),
            name: "a.txt".to_string(),
            path: "/elsewhere/a.txt".to_string(),
            snippet: None,
            created_at: None,
        };
        assert!(matches!(
            open_search_hit(&state, &hit).await,
            Err(AppError::NotFound(_))
        ));
        assert_eq!(state.navigator().selection(), None);
    }

    #[tokio::test]
    async fn blank_query_skips_the_index() {
        let fs = seeded_fs();
        let state = indexed_state(&fs).await;
        assert!(search(&state, "  ", 10).await.unwrap().is_empty());
    }
}
