use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::file_node::FileNode;

pub type TaskId = u64;

pub const PRIMARY_KEY: &str = "indexId";

/// A leaf as stored in the search index, keyed by `indexId`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexDocument {
    pub index_id: String,
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub text: String,
    pub created_at: Option<DateTime<Utc>>,
    pub size: Option<u64>,
}

impl From<&FileNode> for IndexDocument {
    fn from(node: &FileNode) -> Self {
        Self {
            index_id: node.index_id.clone(),
            name: node.name.clone(),
            path: node.path.clone(),
            text: node.text.clone().unwrap_or_default(),
            created_at: node.created_at,
            size: node.size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub index_id: String,
    pub name: String,
    pub path: String,
    pub snippet: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Succeeded,
    Failed(String),
}

/// Outcome of one synchronization pass. Failures are values so a caller can
/// show a retryable notice instead of tearing the session down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncResult {
    Synced {
        task_id: Option<TaskId>,
        documents: usize,
    },
    Failed {
        task_id: Option<TaskId>,
        reason: String,
    },
}

impl SyncResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Synced { .. })
    }

    pub fn task_id(&self) -> Option<TaskId> {
        match self {
            Self::Synced { task_id, .. } | Self::Failed { task_id, .. } => *task_id,
        }
    }

    pub fn into_result(self) -> Result<usize, crate::error::AppError> {
        match self {
            Self::Synced { documents, .. } => Ok(documents),
            Self::Failed { task_id, reason } => {
                Err(crate::error::AppError::SyncFailed { task_id, reason })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_serializes_with_index_id_primary_key() {
        let mut node = FileNode::leaf("2023-01-01.txt", "/out/AppleVoiceMemos/2023-01-01.txt");
        node.size = Some(12);
        let doc = IndexDocument::from(&node);

        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json[PRIMARY_KEY], node.index_id);
        assert_eq!(json["text"], "");
        assert_eq!(json["size"], 12);
        assert!(json["createdAt"].is_null());
    }

    #[test]
    fn failed_sync_converts_to_sync_failed_error() {
        let result = SyncResult::Failed {
            task_id: Some(7),
            reason: "rejected".to_string(),
        };
        assert!(!result.is_success());
        assert_eq!(result.task_id(), Some(7));
        match result.into_result() {
            Err(crate::error::AppError::SyncFailed { task_id, .. }) => {
                assert_eq!(task_id, Some(7))
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
