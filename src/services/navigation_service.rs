//! Column navigator state machine.
//!
//! `columns[d]` holds the siblings visible at depth `d`. Transitions are plain
//! synchronous methods; asynchronous work started on behalf of a transition
//! carries a [`Ticket`] and its result is applied only if the ticket still
//! matches the current state.

use std::cmp::Ordering;

use crate::error::AppError;
use crate::models::file_node::FileNode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavPhase {
    Empty,
    Loaded,
    Drilled(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    generation: u64,
    target: String,
}

impl Ticket {
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum PreviewState {
    #[default]
    Idle,
    Loading(String),
    Ready(FileNode),
    Failed { path: String, reason: String },
}

/// What `open` did with the node it was given.
#[derive(Debug, Clone, PartialEq)]
pub enum Opened {
    Drilled { depth: usize },
    Selected(Ticket),
}

#[derive(Debug, Default)]
pub struct Navigator {
    tree: Option<FileNode>,
    columns: Vec<Vec<FileNode>>,
    selection: Option<String>,
    preview: PreviewState,
    /// Bumped by every ingest and drill.
    generation: u64,
    /// Bumped by every `begin_ingest`.
    ingest_seq: u64,
}

fn root_column(tree: &FileNode) -> Vec<FileNode> {
    match &tree.children {
        Some(children) => children.clone(),
        None => vec![tree.clone()],
    }
}

/// Most recent first; unknown creation times after all known ones.
fn by_created_desc(a: &FileNode, b: &FileNode) -> Ordering {
    match (a.created_at, b.created_at) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Display projection of one column. `sort_by` is stable, so ties keep their
/// listing order.
pub fn display_order(column: &[FileNode]) -> Vec<FileNode> {
    let mut sorted = column.to_vec();
    sorted.sort_by(by_created_desc);
    sorted
}

impl Navigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> NavPhase {
        match self.columns.len() {
            0 => NavPhase::Empty,
            1 => NavPhase::Loaded,
            n => NavPhase::Drilled(n - 1),
        }
    }

    pub fn tree(&self) -> Option<&FileNode> {
        self.tree.as_ref()
    }

    pub fn columns(&self) -> &[Vec<FileNode>] {
        &self.columns
    }

    pub fn selection(&self) -> Option<&str> {
        self.selection.as_deref()
    }

    pub fn preview(&self) -> &PreviewState {
        &self.preview
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn find(&self, path: &str) -> Option<&FileNode> {
        self.tree.as_ref().and_then(|tree| tree.find(path))
    }

    pub fn selected_node(&self) -> Option<&FileNode> {
        self.selection.as_deref().and_then(|path| self.find(path))
    }

    pub fn display_column(&self, depth: usize) -> Option<Vec<FileNode>> {
        self.columns.get(depth).map(|column| display_order(column))
    }

    pub fn display_columns(&self) -> Vec<Vec<FileNode>> {
        self.columns.iter().map(|c| display_order(c)).collect()
    }

    /// Replace the snapshot and reset to a single root column.
    ///
    /// Returns `false` without touching anything when `tree` is the same
    /// snapshot as the one already loaded. Loaded previews are not compared.
    pub fn ingest(&mut self, tree: FileNode) -> bool {
        let unchanged = self
            .tree
            .as_ref()
            .is_some_and(|current| current.same_snapshot(&tree));
        if self.phase() != NavPhase::Empty && unchanged {
            return false;
        }
        self.columns = vec![root_column(&tree)];
        self.tree = Some(tree);
        self.selection = None;
        self.preview = PreviewState::Idle;
        self.generation += 1;
        true
    }

    /// Reserve a ticket for an ingestion of `root` that is about to start.
    /// Any ticket handed out earlier becomes stale.
    pub fn begin_ingest(&mut self, root: &str) -> Ticket {
        self.ingest_seq += 1;
        Ticket {
            generation: self.ingest_seq,
            target: root.to_string(),
        }
    }

    pub fn is_latest_ingest(&self, ticket: &Ticket) -> bool {
        ticket.generation == self.ingest_seq
    }

    /// Apply a finished ingestion if it is still the latest one requested.
    /// Returns whether the navigator changed.
    pub fn complete_ingest(&mut self, ticket: &Ticket, tree: FileNode) -> bool {
        if !self.is_latest_ingest(ticket) {
            tracing::debug!(root = %ticket.target, "discarding superseded ingestion");
            return false;
        }
        self.ingest(tree)
    }

    /// Truncate to `depth + 1` columns and append `children`.
    pub fn drill_into(&mut self, depth: usize, children: Vec<FileNode>) -> Result<(), AppError> {
        if self.phase() == NavPhase::Empty {
            return Err(AppError::Navigation(
                "cannot drill before a tree is ingested".to_string(),
            ));
        }
        if depth > self.columns.len() {
            return Err(AppError::Navigation(format!(
                "depth {depth} is beyond the {} visible columns",
                self.columns.len()
            )));
        }
        self.columns.truncate(depth + 1);
        self.columns.push(children);
        self.selection = None;
        self.preview = PreviewState::Idle;
        self.generation += 1;
        Ok(())
    }

    /// Select `node` for preview. The returned ticket identifies the preview
    /// load this selection may start.
    pub fn select(&mut self, node: &FileNode) -> Ticket {
        self.selection = Some(node.path.clone());
        self.preview = if node.is_text_loaded() || node.is_directory() {
            PreviewState::Ready(node.clone())
        } else {
            PreviewState::Loading(node.path.clone())
        };
        Ticket {
            generation: self.generation,
            target: node.path.clone(),
        }
    }

    pub fn is_current(&self, ticket: &Ticket) -> bool {
        ticket.generation == self.generation
            && self.selection.as_deref() == Some(ticket.target.as_str())
    }

    /// Ticket of the selection still waiting on a preview of `path`. A load
    /// started under an older ticket for the same path can settle it.
    pub fn waiting_ticket(&self, path: &str) -> Option<Ticket> {
        match &self.preview {
            PreviewState::Loading(loading)
                if loading == path && self.selection.as_deref() == Some(path) =>
            {
                Some(Ticket {
                    generation: self.generation,
                    target: path.to_string(),
                })
            }
            _ => None,
        }
    }

    /// Route a click on `columns[depth]` to a drill (directory) or a
    /// selection (leaf).
    pub fn open(&mut self, depth: usize, path: &str) -> Result<Opened, AppError> {
        let node = self
            .columns
            .get(depth)
            .and_then(|column| column.iter().find(|n| n.path == path))
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("{path} at depth {depth}")))?;

        match node.children {
            Some(children) => {
                self.drill_into(depth, children)?;
                Ok(Opened::Drilled { depth: depth + 1 })
            }
            None => Ok(Opened::Selected(self.select(&node))),
        }
    }

    /// Apply a finished preview load. Stale tickets are ignored. A loaded
    /// node replaces its counterpart in the snapshot and in every column so
    /// later selections find the text already present.
    pub fn apply_preview(&mut self, ticket: &Ticket, result: Result<FileNode, AppError>) -> bool {
        if !self.is_current(ticket) {
            tracing::debug!(path = %ticket.target, "discarding stale preview");
            return false;
        }
        self.preview = match result {
            Ok(node) => {
                if let Some(tree) = self.tree.as_mut() {
                    tree.replace(&node);
                }
                for column in &mut self.columns {
                    for entry in column.iter_mut() {
                        if entry.replace(&node) {
                            break;
                        }
                    }
                }
                PreviewState::Ready(node)
            }
            Err(e) => PreviewState::Failed {
                path: ticket.target.clone(),
                reason: e.to_string(),
            },
        };
        true
    }
}
