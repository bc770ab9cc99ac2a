//! Search index synchronization.
//!
//! A pass flattens the enriched tree to leaf documents, fills in transcript
//! text the snapshot has not loaded yet, upserts them keyed by `indexId` and
//! waits for the index to report the write task as finished. Documents whose
//! leaf is gone from the tree are then deleted. Re-running a pass over an
//! unchanged tree leaves the index unchanged.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tokio::sync::OnceCell;

use crate::config::IndexConfig;
use crate::data::index::SearchIndex;
use crate::error::AppError;
use crate::models::file_node::FileNode;
use crate::models::search::{IndexDocument, SyncResult, TaskId, TaskStatus, PRIMARY_KEY};
use crate::services::file_service::TextReader;

const TEXT_READ_CONCURRENCY: usize = 16;

/// Leaves of `tree` in depth-first order.
pub fn flatten_leaves(tree: &FileNode) -> Vec<&FileNode> {
    let mut leaves = Vec::new();
    let mut stack = vec![tree];
    while let Some(node) = stack.pop() {
        match &node.children {
            Some(children) => stack.extend(children.iter().rev()),
            None => leaves.push(node),
        }
    }
    leaves
}

pub struct IndexSynchronizer {
    index: Arc<dyn SearchIndex>,
    texts: Arc<dyn TextReader>,
    index_name: String,
    poll_interval: Duration,
    max_poll_attempts: u32,
    bootstrapped: OnceCell<()>,
}

impl IndexSynchronizer {
    pub fn new(index: Arc<dyn SearchIndex>, texts: Arc<dyn TextReader>, config: &IndexConfig) -> Self {
        Self {
            index,
            texts,
            index_name: config.name.clone(),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            max_poll_attempts: config.max_poll_attempts.max(1),
            bootstrapped: OnceCell::new(),
        }
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    pub fn index(&self) -> &Arc<dyn SearchIndex> {
        &self.index
    }

    /// Push every leaf of `tree` to the index. Failures come back as
    /// [`SyncResult::Failed`] so the caller can offer a retry.
    pub async fn sync(&self, tree: &FileNode) -> SyncResult {
        match self.try_sync(tree).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(index = %self.index_name, error = %e, "index sync failed");
                match e {
                    AppError::SyncFailed { task_id, reason } => {
                        SyncResult::Failed { task_id, reason }
                    }
                    other => SyncResult::Failed {
                        task_id: None,
                        reason: other.to_string(),
                    },
                }
            }
        }
    }

    async fn try_sync(&self, tree: &FileNode) -> Result<SyncResult, AppError> {
        self.bootstrapped
            .get_or_try_init(|| self.bootstrap())
            .await?;

        let documents = self.documents_for(tree).await;
        let task_id = if documents.is_empty() {
            tracing::debug!(index = %self.index_name, "no transcripts to index");
            None
        } else {
            let task = self.index.upsert(&self.index_name, &documents).await?;
            self.wait_for_task(task).await?;
            Some(task)
        };
        let removed = self.prune(&documents).await?;

        tracing::info!(
            index = %self.index_name,
            task = ?task_id,
            documents = documents.len(),
            removed,
            "index synchronized"
        );
        Ok(SyncResult::Synced {
            task_id,
            documents: documents.len(),
        })
    }

    /// Documents for every leaf, in depth-first order. Leaves whose text the
    /// snapshot has not loaded are read here; a failed read indexes the leaf
    /// with empty text.
    pub async fn documents_for(&self, tree: &FileNode) -> Vec<IndexDocument> {
        let reads = flatten_leaves(tree).into_iter().map(|leaf| async move {
            let mut document = IndexDocument::from(leaf);
            if leaf.text.is_none() {
                match self.texts.read_text(&leaf.path).await {
                    Ok(text) => document.text = text,
                    Err(e) => {
                        tracing::debug!(path = %leaf.path, error = %e, "indexing without transcript text")
                    }
                }
            }
            document
        });
        stream::iter(reads)
            .buffered(TEXT_READ_CONCURRENCY)
            .collect()
            .await
    }

    /// Delete indexed documents that no longer have a leaf in the snapshot.
    async fn prune(&self, documents: &[IndexDocument]) -> Result<usize, AppError> {
        let live: HashSet<&str> = documents.iter().map(|d| d.index_id.as_str()).collect();
        let stale: Vec<String> = self
            .index
            .document_ids(&self.index_name)
            .await?
            .into_iter()
            .filter(|id| !live.contains(id.as_str()))
            .collect();
        if stale.is_empty() {
            return Ok(0);
        }

        let task = self.index.delete(&self.index_name, &stale).await?;
        self.wait_for_task(task).await?;
        tracing::debug!(index = %self.index_name, task, removed = stale.len(), "vanished transcripts removed");
        Ok(stale.len())
    }

    /// Create the index on first use. A failed bootstrap is retried by the
    /// next pass.
    async fn bootstrap(&self) -> Result<(), AppError> {
        if self.index.index_exists(&self.index_name).await? {
            return Ok(());
        }
        tracing::info!(index = %self.index_name, "creating search index");
        let task = self
            .index
            .create_index(&self.index_name, PRIMARY_KEY)
            .await?;
        self.wait_for_task(task).await
    }

    async fn wait_for_task(&self, task: TaskId) -> Result<(), AppError> {
        for attempt in 0..self.max_poll_attempts {
            if attempt > 0 {
                tokio::time::sleep(self.poll_interval).await;
            }
            let status = self
                .index
                .task_status(task)
                .await
                .map_err(|e| AppError::SyncFailed {
                    task_id: Some(task),
                    reason: e.to_string(),
                })?;
            match status {
                TaskStatus::Succeeded => return Ok(()),
                TaskStatus::Failed(reason) => {
                    return Err(AppError::SyncFailed {
                        task_id: Some(task),
                        reason,
                    })
                }
                TaskStatus::Pending => {}
            }
        }
        Err(AppError::SyncFailed {
            task_id: Some(task),
            reason: format!("task still pending after {} polls", self.max_poll_attempts),
        })
    }
}
