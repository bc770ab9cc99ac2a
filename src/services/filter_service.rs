use std::collections::BTreeSet;

use crate::models::file_node::FileNode;

pub const DEFAULT_EXCLUDED_NAMES: &[&str] = &[
    // macOS
    ".DS_Store",
    ".localized",
    ".Spotlight-V100",
    ".fseventsd",
    ".Trashes",
    ".TemporaryItems",
    // Windows
    "Thumbs.db",
    "desktop.ini",
];

/// Drops housekeeping entries from a raw listing.
#[derive(Debug, Clone)]
pub struct TreeFilter {
    excluded: BTreeSet<String>,
}

impl Default for TreeFilter {
    fn default() -> Self {
        Self::new(DEFAULT_EXCLUDED_NAMES.iter().copied())
    }
}

impl TreeFilter {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            excluded: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_excluded(&self, name: &str) -> bool {
        self.excluded.contains(name)
    }

    /// Returns a copy of `tree` without excluded entries at any depth. The root
    /// itself is never removed and directories emptied by filtering are kept.
    pub fn filter(&self, tree: &FileNode) -> FileNode {
        let Some(children) = tree.children.as_ref() else {
            return tree.clone();
        };

        let kept = children
            .iter()
            .map(|child| self.filter(child))
            .filter(|child| !self.is_excluded(&child.name))
            .collect();

        FileNode {
            children: Some(kept),
            ..shallow_copy(tree)
        }
    }
}

fn shallow_copy(node: &FileNode) -> FileNode {
    FileNode {
        name: node.name.clone(),
        path: node.path.clone(),
        index_id: node.index_id.clone(),
        children: None,
        created_at: node.created_at,
        size: node.size,
        text: node.text.clone(),
    }
}
