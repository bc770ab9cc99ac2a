use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry of an ingested export tree.
///
/// A node is a directory iff `children` is `Some`. Only leaves carry `size`
/// and `text`; `text == None` means the transcript has not been loaded yet,
/// not that it is empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileNode {
    pub name: String,
    pub path: String,
    pub index_id: String,
    pub children: Option<Vec<FileNode>>,
    pub created_at: Option<DateTime<Utc>>,
    pub size: Option<u64>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Directory,
    Leaf,
}

/// Stable search-index key for a path. Hex keeps it inside the character set
/// every index backend accepts for primary keys.
pub fn index_id_for(path: &str) -> String {
    blake3::hash(path.as_bytes()).to_hex().to_string()
}

impl FileNode {
    pub fn leaf(name: impl Into<String>, path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            name: name.into(),
            index_id: index_id_for(&path),
            path,
            children: None,
            created_at: None,
            size: None,
            text: None,
        }
    }

    pub fn directory(
        name: impl Into<String>,
        path: impl Into<String>,
        children: Vec<FileNode>,
    ) -> Self {
        let path = path.into();
        Self {
            name: name.into(),
            index_id: index_id_for(&path),
            path,
            children: Some(children),
            created_at: None,
            size: None,
            text: None,
        }
    }

    pub fn kind(&self) -> NodeKind {
        if self.children.is_some() {
            NodeKind::Directory
        } else {
            NodeKind::Leaf
        }
    }

    pub fn is_directory(&self) -> bool {
        self.kind() == NodeKind::Directory
    }

    pub fn is_text_loaded(&self) -> bool {
        self.text.is_some()
    }

    /// Total number of nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + self
            .children
            .iter()
            .flatten()
            .map(FileNode::node_count)
            .sum::<usize>()
    }

    /// Depth-first lookup by path.
    pub fn find(&self, path: &str) -> Option<&FileNode> {
        if self.path == path {
            return Some(self);
        }
        self.children
            .iter()
            .flatten()
            .find_map(|child| child.find(path))
    }

    /// Structural and metadata equality, ignoring transcript text that may
    /// have been loaded into one of the two trees after listing.
    pub fn same_snapshot(&self, other: &FileNode) -> bool {
        if self.path != other.path
            || self.name != other.name
            || self.created_at != other.created_at
            || self.size != other.size
        {
            return false;
        }
        match (&self.children, &other.children) {
            (Some(a), Some(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_snapshot(y))
            }
            (None, None) => true,
            _ => false,
        }
    }

    /// Replace the node at `replacement.path` anywhere in this subtree.
    /// Returns whether a node was replaced.
    pub fn replace(&mut self, replacement: &FileNode) -> bool {
        if self.path == replacement.path {
            *self = replacement.clone();
            return true;
        }
        match self.children.as_mut() {
            Some(children) => children.iter_mut().any(|child| child.replace(replacement)),
            None => false,
        }
    }
}
