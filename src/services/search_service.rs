use std::sync::Arc;

use crate::data::index::SearchIndex;
use crate::error::AppError;
use crate::models::file_node::FileNode;
use crate::models::search::SearchHit;

pub const DEFAULT_LIMIT: usize = 20;

pub struct SearchService {
    index: Arc<dyn SearchIndex>,
    index_name: String,
}

impl SearchService {
    pub fn new(index: Arc<dyn SearchIndex>, index_name: impl Into<String>) -> Self {
        Self {
            index,
            index_name: index_name.into(),
        }
    }

    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, AppError> {
        let trimmed = query.trim();
        if trimmed.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        let hits = self.index.search(&self.index_name, trimmed, limit).await?;
        tracing::debug!(query = trimmed, hits = hits.len(), "search");
        Ok(hits)
    }
}

/// The navigable node behind a hit: the snapshot's node when the path is
/// still present, otherwise a bare leaf for the hit's path.
pub fn node_for_hit(snapshot: Option<&FileNode>, hit: &SearchHit) -> FileNode {
    if let Some(node) = snapshot.and_then(|tree| tree.find(&hit.path)) {
        return node.clone();
    }
    let mut node = FileNode::leaf(hit.name.clone(), hit.path.clone());
    node.created_at = hit.created_at;
    node
}
