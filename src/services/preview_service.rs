use std::sync::Arc;

use crate::error::AppError;
use crate::models::file_node::FileNode;
use crate::services::file_service::TextReader;

/// Loads transcript text for a selected node on demand.
#[derive(Clone)]
pub struct PreviewLoader {
    texts: Arc<dyn TextReader>,
}

impl PreviewLoader {
    pub fn new(texts: Arc<dyn TextReader>) -> Self {
        Self { texts }
    }

    /// Returns a copy of `node` with `text` set. Nodes that already carry text
    /// and directories come back unchanged without touching the reader.
    pub async fn load(&self, node: &FileNode) -> Result<FileNode, AppError> {
        if node.is_text_loaded() || node.is_directory() {
            return Ok(node.clone());
        }
        let text = self.texts.read_text(&node.path).await?;
        tracing::debug!(path = %node.path, bytes = text.len(), "transcript loaded");
        Ok(FileNode {
            text: Some(text),
            ..node.clone()
        })
    }
}
