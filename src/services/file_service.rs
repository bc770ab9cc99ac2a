//! Filesystem collaborators: listing, metadata and transcript text.
//!
//! The core only talks to these traits; [`LocalFileSystem`] is the default
//! implementation backed by the local disk.

use std::fs;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use walkdir::WalkDir;

use crate::error::AppError;
use crate::models::file_node::FileNode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub created_at: Option<DateTime<Utc>>,
    pub size: u64,
}

#[async_trait]
pub trait DirectoryLister: Send + Sync {
    /// Returns the tree rooted at `root` with only `name`, `path` and
    /// `children` populated.
    async fn list(&self, root: &str, recursive: bool) -> Result<FileNode, AppError>;
}

#[async_trait]
pub trait MetadataReader: Send + Sync {
    async fn stat(&self, path: &str) -> Result<FileStat, AppError>;
}

#[async_trait]
pub trait TextReader: Send + Sync {
    async fn read_text(&self, path: &str) -> Result<String, AppError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

#[async_trait]
impl DirectoryLister for LocalFileSystem {
    async fn list(&self, root: &str, recursive: bool) -> Result<FileNode, AppError> {
        let root = root.to_string();
        tokio::task::spawn_blocking(move || list_tree(&root, recursive))
            .await
            .map_err(|e| AppError::General(format!("listing task failed: {e}")))?
    }
}

#[async_trait]
impl MetadataReader for LocalFileSystem {
    async fn stat(&self, path: &str) -> Result<FileStat, AppError> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| AppError::from_io(path, e))?;
        // Not every filesystem records birth time; modification time is the
        // closest stand-in for "when was this transcript produced".
        let created_at = metadata
            .created()
            .or_else(|_| metadata.modified())
            .ok()
            .map(DateTime::<Utc>::from);
        Ok(FileStat {
            created_at,
            size: metadata.len(),
        })
    }
}

#[async_trait]
impl TextReader for LocalFileSystem {
    async fn read_text(&self, path: &str) -> Result<String, AppError> {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| AppError::from_io(path, e))
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

fn fold_into_parent(stack: &mut Vec<FileNode>) {
    if let Some(done) = stack.pop() {
        match stack.last_mut() {
            Some(parent) => parent.children.get_or_insert_with(Vec::new).push(done),
            None => stack.push(done),
        }
    }
}

/// Builds the nested tree for `root`. Entries are ordered by file name so two
/// listings of an unchanged directory produce identical snapshots.
pub fn list_tree(root: &str, recursive: bool) -> Result<FileNode, AppError> {
    let root_path = Path::new(root);
    let metadata = fs::metadata(root_path).map_err(|e| AppError::from_io(root, e))?;
    if !metadata.is_dir() {
        return Ok(FileNode::leaf(display_name(root_path), root));
    }

    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut stack = vec![FileNode::directory(
        display_name(root_path),
        root,
        Vec::new(),
    )];

    let walker = WalkDir::new(root_path)
        .min_depth(1)
        .max_depth(max_depth)
        .sort_by_file_name();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable entry");
                continue;
            }
        };

        while stack.len() > entry.depth() {
            fold_into_parent(&mut stack);
        }

        let name = entry.file_name().to_string_lossy().to_string();
        let path = entry.path().to_string_lossy().to_string();
        if entry.file_type().is_dir() {
            stack.push(FileNode::directory(name, path, Vec::new()));
        } else if let Some(parent) = stack.last_mut() {
            parent
                .children
                .get_or_insert_with(Vec::new)
                .push(FileNode::leaf(name, path));
        }
    }

    while stack.len() > 1 {
        fold_into_parent(&mut stack);
    }
    stack
        .pop()
        .ok_or_else(|| AppError::General(format!("empty listing for {root}")))
}
