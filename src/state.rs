use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::config::AppConfig;
use crate::data::index::SearchIndex;
use crate::error::AppError;
use crate::models::search::SyncResult;
use crate::services::file_service::{DirectoryLister, LocalFileSystem, MetadataReader, TextReader};
use crate::services::filter_service::TreeFilter;
use crate::services::indexing_service::IndexSynchronizer;
use crate::services::metadata_service::Enricher;
use crate::services::navigation_service::Navigator;
use crate::services::path_resolver::TranslationTable;
use crate::services::preview_service::PreviewLoader;
use crate::services::search_service::SearchService;
use crate::services::watch_service::WatchHandle;
use crate::shell::reveal::{Revealer, SystemRevealer};

/// External collaborators the session talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub lister: Arc<dyn DirectoryLister>,
    pub stats: Arc<dyn MetadataReader>,
    pub texts: Arc<dyn TextReader>,
    pub revealer: Arc<dyn Revealer>,
    pub index: Arc<dyn SearchIndex>,
}

impl Collaborators {
    /// Local disk and the platform file manager, with the given index.
    pub fn local(index: Arc<dyn SearchIndex>) -> Self {
        let fs = Arc::new(LocalFileSystem);
        Self {
            lister: fs.clone(),
            stats: fs.clone(),
            texts: fs,
            revealer: Arc::new(SystemRevealer),
            index,
        }
    }
}

pub struct AppState {
    pub root: String,
    pub filter: TreeFilter,
    pub enricher: Enricher,
    pub previews: PreviewLoader,
    pub translations: Arc<TranslationTable>,
    pub synchronizer: IndexSynchronizer,
    pub search: SearchService,
    pub lister: Arc<dyn DirectoryLister>,
    pub revealer: Arc<dyn Revealer>,
    pub navigator: Mutex<Navigator>,
    pub previews_in_flight: Mutex<HashSet<String>>,
    pub watcher_handle: Mutex<Option<WatchHandle>>,
    pub watch_debounce: Duration,
    pub last_sync: Mutex<Option<SyncResult>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl AppState {
    pub fn new(config: &AppConfig, collaborators: Collaborators) -> Result<Self, AppError> {
        let translations = Arc::new(config.translation_table()?);
        Ok(Self {
            root: config.root(),
            filter: TreeFilter::new(config.excluded_names.iter().cloned()),
            enricher: Enricher::new(
                collaborators.stats,
                collaborators.texts.clone(),
                config.text_loading,
            ),
            previews: PreviewLoader::new(collaborators.texts.clone()),
            translations,
            synchronizer: IndexSynchronizer::new(
                collaborators.index.clone(),
                collaborators.texts,
                &config.index,
            ),
            search: SearchService::new(collaborators.index, config.index.name.clone()),
            lister: collaborators.lister,
            revealer: collaborators.revealer,
            navigator: Mutex::new(Navigator::new()),
            previews_in_flight: Mutex::new(HashSet::new()),
            watcher_handle: Mutex::new(None),
            watch_debounce: Duration::from_millis(config.watch.debounce_ms),
            last_sync: Mutex::new(None),
        })
    }

    /// Navigator access. Never hold the guard across an `.await`.
    pub fn navigator(&self) -> MutexGuard<'_, Navigator> {
        lock(&self.navigator)
    }

    /// Claim `path` for a preview load. Returns `false` if a load for the
    /// same path is already running.
    pub fn begin_preview(&self, path: &str) -> bool {
        lock(&self.previews_in_flight).insert(path.to_string())
    }

    pub fn end_preview(&self, path: &str) {
        lock(&self.previews_in_flight).remove(path);
    }

    pub fn record_sync(&self, result: &SyncResult) {
        *lock(&self.last_sync) = Some(result.clone());
    }

    pub fn last_sync(&self) -> Option<SyncResult> {
        lock(&self.last_sync).clone()
    }

    pub fn watcher(&self) -> MutexGuard<'_, Option<WatchHandle>> {
        lock(&self.watcher_handle)
    }
}
