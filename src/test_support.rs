//! In-memory collaborators shared by the unit tests.

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use crate::error::AppError;
use crate::models::file_node::FileNode;
use crate::models::search::{IndexDocument, SearchHit, TaskId, TaskStatus};
use crate::services::file_service::{DirectoryLister, FileStat, MetadataReader, TextReader};
use crate::data::index::SearchIndex;

struct FakeEntry {
    is_dir: bool,
    text: String,
    created: i64,
}

#[derive(Default)]
pub struct FakeFileSystem {
    entries: Mutex<BTreeMap<String, FakeEntry>>,
    failing_stats: Mutex<HashSet<String>>,
    failing_reads: Mutex<HashSet<String>>,
    pub stat_calls: AtomicUsize,
    pub text_reads: AtomicUsize,
    pub list_calls: AtomicUsize,
}

impl FakeFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timestamp(day: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + day * 86_400, 0).unwrap()
    }

    pub fn add_dir(&self, path: &str, day: i64) {
        self.entries.lock().unwrap().insert(
            path.to_string(),
            FakeEntry {
                is_dir: true,
                text: String::new(),
                created: day,
            },
        );
    }

    pub fn add_file(&self, path: &str, text: &str, day: i64) {
        self.entries.lock().unwrap().insert(
            path.to_string(),
            FakeEntry {
                is_dir: false,
                text: text.to_string(),
                created: day,
            },
        );
    }

    pub fn fail_stat(&self, path: &str) {
        self.failing_stats.lock().unwrap().insert(path.to_string());
    }

    pub fn fail_read(&self, path: &str) {
        self.failing_reads.lock().unwrap().insert(path.to_string());
    }

    fn build(&self, path: &str, recursive: bool, entries: &BTreeMap<String, FakeEntry>) -> FileNode {
        let name = crate::scope_path::file_name(path).to_string();
        let entry = &entries[path];
        if !entry.is_dir {
            return FileNode::leaf(name, path);
        }
        let prefix = format!("{path}/");
        let children = entries
            .keys()
            .filter(|p| p.starts_with(&prefix) && !p[prefix.len()..].contains('/'))
            .map(|p| {
                if recursive {
                    self.build(p, true, entries)
                } else if entries[p].is_dir {
                    FileNode::directory(crate::scope_path::file_name(p), p.as_str(), Vec::new())
                } else {
                    FileNode::leaf(crate::scope_path::file_name(p), p.as_str())
                }
            })
            .collect();
        FileNode::directory(name, path, children)
    }
}

#[async_trait]
impl DirectoryLister for FakeFileSystem {
    async fn list(&self, root: &str, recursive: bool) -> Result<FileNode, AppError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let entries = self.entries.lock().unwrap();
        if !entries.contains_key(root) {
            return Err(AppError::NotFound(root.to_string()));
        }
        Ok(self.build(root, recursive, &entries))
    }
}

#[async_trait]
impl MetadataReader for FakeFileSystem {
    async fn stat(&self, path: &str) -> Result<FileStat, AppError> {
        self.stat_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_stats.lock().unwrap().contains(path) {
            return Err(AppError::NotFound(path.to_string()));
        }
        let entries = self.entries.lock().unwrap();
        let entry = entries
            .get(path)
            .ok_or_else(|| AppError::NotFound(path.to_string()))?;
        Ok(FileStat {
            created_at: Some(Self::timestamp(entry.created)),
            size: entry.text.len() as u64,
        })
    }
}

#[async_trait]
impl TextReader for FakeFileSystem {
    async fn read_text(&self, path: &str) -> Result<String, AppError> {
        self.text_reads.fetch_add(1, Ordering::SeqCst);
        if self.failing_reads.lock().unwrap().contains(path) {
            return Err(AppError::Decode {
                path: path.to_string(),
                reason: "invalid utf-8".to_string(),
            });
        }
        let entries = self.entries.lock().unwrap();
        entries
            .get(path)
            .filter(|e| !e.is_dir)
            .map(|e| e.text.clone())
            .ok_or_else(|| AppError::NotFound(path.to_string()))
    }
}

/// Index double whose task outcomes are scripted up front.
#[derive(Default)]
pub struct ScriptedIndex {
    pub exists: Mutex<bool>,
    pub create_calls: AtomicUsize,
    pub upsert_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
    pub last_batch: Mutex<Vec<IndexDocument>>,
    pub stored: Mutex<BTreeSet<String>>,
    statuses: Mutex<VecDeque<TaskStatus>>,
    next_task: AtomicU64,
}

impl ScriptedIndex {
    pub fn new(statuses: Vec<TaskStatus>) -> Self {
        Self {
            statuses: Mutex::new(statuses.into()),
            next_task: AtomicU64::new(1),
            ..Self::default()
        }
    }
}

#[async_trait]
impl SearchIndex for ScriptedIndex {
    async fn index_exists(&self, _index: &str) -> Result<bool, AppError> {
        Ok(*self.exists.lock().unwrap())
    }

    async fn create_index(&self, _index: &str, _primary_key: &str) -> Result<TaskId, AppError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        *self.exists.lock().unwrap() = true;
        Ok(self.next_task.fetch_add(1, Ordering::SeqCst))
    }

    async fn upsert(&self, _index: &str, documents: &[IndexDocument]) -> Result<TaskId, AppError> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_batch.lock().unwrap() = documents.to_vec();
        self.stored
            .lock()
            .unwrap()
            .extend(documents.iter().map(|d| d.index_id.clone()));
        Ok(self.next_task.fetch_add(1, Ordering::SeqCst))
    }

    async fn delete(&self, _index: &str, ids: &[String]) -> Result<TaskId, AppError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        let mut stored = self.stored.lock().unwrap();
        for id in ids {
            stored.remove(id);
        }
        Ok(self.next_task.fetch_add(1, Ordering::SeqCst))
    }

    async fn document_ids(&self, _index: &str) -> Result<Vec<String>, AppError> {
        Ok(self.stored.lock().unwrap().iter().cloned().collect())
    }

    async fn task_status(&self, _task: TaskId) -> Result<TaskStatus, AppError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(TaskStatus::Succeeded))
    }

    async fn search(&self, _index: &str, _query: &str, _limit: usize) -> Result<Vec<SearchHit>, AppError> {
        Ok(Vec::new())
    }

    async fn document_count(&self, _index: &str) -> Result<u64, AppError> {
        Ok(self.stored.lock().unwrap().len() as u64)
    }
}
