//! Metadata enrichment of raw listings.
//!
//! Every pass produces a new tree; the input is never mutated. Fetches for
//! siblings are joined rather than awaited one after another, and a directory
//! issues its own stat only once all of its children are done.

use std::sync::Arc;

use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use serde::{Deserialize, Serialize};

use crate::models::file_node::FileNode;
use crate::services::file_service::{MetadataReader, TextReader};

/// Whether transcript text is read during enrichment or on selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextLoading {
    Eager,
    #[default]
    Lazy,
}

impl std::str::FromStr for TextLoading {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "eager" => Ok(Self::Eager),
            "lazy" => Ok(Self::Lazy),
            other => Err(format!("unknown text loading mode: {other}")),
        }
    }
}

#[derive(Clone)]
pub struct Enricher {
    stats: Arc<dyn MetadataReader>,
    texts: Arc<dyn TextReader>,
    mode: TextLoading,
}

impl Enricher {
    pub fn new(
        stats: Arc<dyn MetadataReader>,
        texts: Arc<dyn TextReader>,
        mode: TextLoading,
    ) -> Self {
        Self { stats, texts, mode }
    }

    pub fn mode(&self) -> TextLoading {
        self.mode
    }

    /// Attach `created_at`, `size` and (eager mode) `text` to every node.
    ///
    /// Per-node failures are logged and leave the field absent; they never
    /// abort the rest of the tree. Fields that are already present are kept
    /// and not fetched again.
    pub async fn enrich(&self, tree: &FileNode) -> FileNode {
        self.enrich_node(tree).await
    }

    fn enrich_node<'a>(&'a self, node: &'a FileNode) -> BoxFuture<'a, FileNode> {
        async move {
            match node.children.as_ref() {
                Some(children) => {
                    let enriched_children =
                        join_all(children.iter().map(|child| self.enrich_node(child))).await;
                    let created_at = match node.created_at {
                        Some(known) => Some(known),
                        None => self.fetch_created_at(&node.path).await,
                    };
                    FileNode {
                        name: node.name.clone(),
                        path: node.path.clone(),
                        index_id: node.index_id.clone(),
                        children: Some(enriched_children),
                        created_at,
                        size: None,
                        text: None,
                    }
                }
                None => self.enrich_leaf(node).await,
            }
        }
        .boxed()
    }

    async fn enrich_leaf(&self, node: &FileNode) -> FileNode {
        let needs_stat = node.created_at.is_none() || node.size.is_none();
        let needs_text = self.mode == TextLoading::Eager && node.text.is_none();

        let stat = async {
            if !needs_stat {
                return None;
            }
            match self.stats.stat(&node.path).await {
                Ok(stat) => Some(stat),
                Err(e) => {
                    tracing::warn!(path = %node.path, error = %e, "metadata unavailable");
                    None
                }
            }
        };
        let text = async {
            if !needs_text {
                return None;
            }
            match self.texts.read_text(&node.path).await {
                Ok(text) => Some(text),
                Err(e) => {
                    tracing::warn!(path = %node.path, error = %e, "transcript text unavailable");
                    None
                }
            }
        };
        let (stat, text) = futures::join!(stat, text);

        FileNode {
            name: node.name.clone(),
            path: node.path.clone(),
            index_id: node.index_id.clone(),
            children: None,
            created_at: node.created_at.or(stat.and_then(|s| s.created_at)),
            size: node.size.or(stat.map(|s| s.size)),
            text: node.text.clone().or(text),
        }
    }

    async fn fetch_created_at(&self, path: &str) -> Option<chrono::DateTime<chrono::Utc>> {
        match self.stats.stat(path).await {
            Ok(stat) => stat.created_at,
            Err(e) => {
                tracing::warn!(path, error = %e, "metadata unavailable");
                None
            }
        }
    }
}
