//! The search index seam.
//!
//! Writes are asynchronous on the index side: `create_index`, `upsert` and
//! `delete` return a task id whose outcome is observed through `task_status`.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{IndexBackend, IndexConfig};
use crate::data::meili::MeiliIndex;
use crate::data::sqlite::SqliteIndex;
use crate::error::AppError;
use crate::models::search::{IndexDocument, SearchHit, TaskId, TaskStatus};

#[async_trait]
pub trait SearchIndex: Send + Sync {
    async fn index_exists(&self, index: &str) -> Result<bool, AppError>;

    async fn create_index(&self, index: &str, primary_key: &str) -> Result<TaskId, AppError>;

    /// Add-or-replace by primary key.
    async fn upsert(&self, index: &str, documents: &[IndexDocument]) -> Result<TaskId, AppError>;

    /// Remove documents by primary key. Unknown ids are ignored.
    async fn delete(&self, index: &str, ids: &[String]) -> Result<TaskId, AppError>;

    /// Primary keys of every stored document.
    async fn document_ids(&self, index: &str) -> Result<Vec<String>, AppError>;

    async fn task_status(&self, task: TaskId) -> Result<TaskStatus, AppError>;

    async fn search(
        &self,
        index: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchHit>, AppError>;

    async fn document_count(&self, index: &str) -> Result<u64, AppError>;
}

/// Build the single index handle shared by the whole session.
pub fn open_index(config: &IndexConfig) -> Result<Arc<dyn SearchIndex>, AppError> {
    match config.backend {
        IndexBackend::Meilisearch => {
            tracing::info!(url = %config.url, index = %config.name, "using meilisearch index");
            Ok(Arc::new(MeiliIndex::new(&config.url, config.api_key.clone())?))
        }
        IndexBackend::Sqlite => {
            let path = config.sqlite_path()?;
            tracing::info!(path = %path.display(), index = %config.name, "using embedded index");
            Ok(Arc::new(SqliteIndex::open(&path)?))
        }
    }
}
