use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use rusqlite::Connection;

use crate::data::index::SearchIndex;
use crate::data::{migrations, repository};
use crate::error::AppError;
use crate::models::search::{IndexDocument, SearchHit, TaskId, TaskStatus};

const TASK_INDEX_CREATION: &str = "indexCreation";
const TASK_DOCUMENT_UPSERT: &str = "documentAdditionOrUpdate";
const TASK_DOCUMENT_DELETION: &str = "documentDeletion";

/// Embedded FTS5 index. Work is applied at enqueue time, so every task is
/// already finished when its id is returned.
pub struct SqliteIndex {
    conn: Mutex<Connection>,
}

impl SqliteIndex {
    pub fn open(path: &Path) -> Result<Self, AppError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        migrations::run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self, AppError> {
        let conn = Connection::open_in_memory()?;
        migrations::run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, AppError>,
    ) -> Result<T, AppError> {
        let conn = self
            .conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&conn)
    }
}

#[async_trait]
impl SearchIndex for SqliteIndex {
    async fn index_exists(&self, index: &str) -> Result<bool, AppError> {
        self.with_conn(|conn| repository::index_exists(conn, index))
    }

    async fn create_index(&self, index: &str, primary_key: &str) -> Result<TaskId, AppError> {
        self.with_conn(|conn| {
            let status = if repository::insert_index(conn, index, primary_key)? {
                TaskStatus::Succeeded
            } else {
                TaskStatus::Failed(format!("index `{index}` already exists"))
            };
            repository::insert_task(conn, index, TASK_INDEX_CREATION, &status)
        })
    }

    async fn upsert(&self, index: &str, documents: &[IndexDocument]) -> Result<TaskId, AppError> {
        self.with_conn(|conn| {
            let status = if !repository::index_exists(conn, index)? {
                TaskStatus::Failed(format!("index `{index}` not found"))
            } else {
                match repository::upsert_documents(conn, index, documents) {
                    Ok(_) => TaskStatus::Succeeded,
                    Err(e) => TaskStatus::Failed(e.to_string()),
                }
            };
            repository::insert_task(conn, index, TASK_DOCUMENT_UPSERT, &status)
        })
    }

    async fn delete(&self, index: &str, ids: &[String]) -> Result<TaskId, AppError> {
        self.with_conn(|conn| {
            let status = if !repository::index_exists(conn, index)? {
                TaskStatus::Failed(format!("index `{index}` not found"))
            } else {
                match repository::delete_documents(conn, index, ids) {
                    Ok(_) => TaskStatus::Succeeded,
                    Err(e) => TaskStatus::Failed(e.to_string()),
                }
            };
            repository::insert_task(conn, index, TASK_DOCUMENT_DELETION, &status)
        })
    }

    async fn document_ids(&self, index: &str) -> Result<Vec<String>, AppError> {
        self.with_conn(|conn| repository::document_ids(conn, index))
    }

    async fn task_status(&self, task: TaskId) -> Result<TaskStatus, AppError> {
        self.with_conn(|conn| repository::get_task(conn, task))?
            .ok_or_else(|| AppError::NotFound(format!("task {task}")))
    }

    async fn search(
        &self,
        index: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchHit>, AppError> {
        self.with_conn(|conn| repository::search_documents(conn, index, query, limit))
    }

    async fn document_count(&self, index: &str) -> Result<u64, AppError> {
        self.with_conn(|conn| repository::count_documents(conn, index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::file_node::FileNode;
    use crate::models::search::PRIMARY_KEY;

    fn doc(path: &str, text: &str) -> IndexDocument {
        let mut node = FileNode::leaf(crate::scope_path::file_name(path), path);
        node.text = Some(text.to_string());
        IndexDocument::from(&node)
    }

    #[tokio::test]
    async fn create_then_upsert_succeeds() {
        let index = SqliteIndex::open_in_memory().unwrap();
        assert!(!index.index_exists("t").await.unwrap());

        let created = index.create_index("t", PRIMARY_KEY).await.unwrap();
        assert_eq!(index.task_status(created).await.unwrap(), TaskStatus::Succeeded);

        let task = index.upsert("t", &[doc("/o/a.txt", "hello")]).await.unwrap();
        assert_eq!(index.task_status(task).await.unwrap(), TaskStatus::Succeeded);
        assert_eq!(index.document_count("t").await.unwrap(), 1);
        assert_eq!(index.search("t", "hello", 5).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn upsert_into_missing_index_is_a_failed_task() {
        let index = SqliteIndex::open_in_memory().unwrap();
        let task = index.upsert("missing", &[doc("/o/a.txt", "x")]).await.unwrap();
        match index.task_status(task).await.unwrap() {
            TaskStatus::Failed(reason) => assert!(reason.contains("not found")),
            other => panic!("unexpected status: {other:?}"),
        }
    }

    #[tokio::test]
    async fn creating_twice_fails_the_second_task() {
        let index = SqliteIndex::open_in_memory().unwrap();
        index.create_index("t", PRIMARY_KEY).await.unwrap();
        let again = index.create_index("t", PRIMARY_KEY).await.unwrap();
        assert!(matches!(
            index.task_status(again).await.unwrap(),
            TaskStatus::Failed(_)
        ));
    }

    #[tokio::test]
    async fn delete_is_a_finished_task() {
        let index = SqliteIndex::open_in_memory().unwrap();
        index.create_index("t", PRIMARY_KEY).await.unwrap();
        index
            .upsert("t", &[doc("/o/a.txt", "gone"), doc("/o/b.txt", "kept")])
            .await
            .unwrap();
        let gone = crate::models::file_node::index_id_for("/o/a.txt");

        let task = index.delete("t", &[gone.clone()]).await.unwrap();

        assert_eq!(index.task_status(task).await.unwrap(), TaskStatus::Succeeded);
        assert!(!index.document_ids("t").await.unwrap().contains(&gone));
        assert_eq!(index.document_count("t").await.unwrap(), 1);
        assert!(index.search("t", "gone", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_task_is_not_found() {
        let index = SqliteIndex::open_in_memory().unwrap();
        assert!(matches!(
            index.task_status(404).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn file_backed_index_persists_between_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("index.db");
        {
            let index = SqliteIndex::open(&path).unwrap();
            index.create_index("t", PRIMARY_KEY).await.unwrap();
            index.upsert("t", &[doc("/o/a.txt", "kept")]).await.unwrap();
        }
        let reopened = SqliteIndex::open(&path).unwrap();
        assert!(reopened.index_exists("t").await.unwrap());
        assert_eq!(reopened.document_count("t").await.unwrap(), 1);
    }
}
