use rusqlite::{params, Connection, OptionalExtension};

use crate::error::AppError;
use crate::models::search::{IndexDocument, SearchHit, TaskId, TaskStatus};

const STATUS_ENQUEUED: &str = "enqueued";
const STATUS_SUCCEEDED: &str = "succeeded";
const STATUS_FAILED: &str = "failed";

pub fn index_exists(conn: &Connection, name: &str) -> Result<bool, AppError> {
    let found = conn
        .query_row(
            "SELECT 1 FROM indexes WHERE name = ?1",
            params![name],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Returns `false` when an index with this name is already registered.
pub fn insert_index(conn: &Connection, name: &str, primary_key: &str) -> Result<bool, AppError> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO indexes (name, primary_key) VALUES (?1, ?2)",
        params![name, primary_key],
    )?;
    Ok(inserted > 0)
}

/// Add-or-replace every document in one transaction, keyed by
/// `(index_name, index_id)`. The FTS shadow rows are rewritten alongside.
pub fn upsert_documents(
    conn: &Connection,
    index_name: &str,
    documents: &[IndexDocument],
) -> Result<usize, AppError> {
    let tx = conn.unchecked_transaction()?;
    {
        let mut upsert = tx.prepare(
            "INSERT OR REPLACE INTO documents (index_name, index_id, name, path, text, created_at, size_bytes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        let mut clear_fts =
            tx.prepare("DELETE FROM documents_fts WHERE index_name = ?1 AND index_id = ?2")?;
        let mut insert_fts = tx.prepare(
            "INSERT INTO documents_fts (index_name, index_id, name, text) VALUES (?1, ?2, ?3, ?4)",
        )?;

        for doc in documents {
            let size = doc.size.map(|s| i64::try_from(s).unwrap_or(i64::MAX));
            upsert.execute(params![
                index_name,
                doc.index_id,
                doc.name,
                doc.path,
                doc.text,
                doc.created_at,
                size,
            ])?;
            clear_fts.execute(params![index_name, doc.index_id])?;
            insert_fts.execute(params![index_name, doc.index_id, doc.name, doc.text])?;
        }
    }
    tx.commit()?;
    Ok(documents.len())
}

#[cfg(test)]
pub fn get_document(
    conn: &Connection,
    index_name: &str,
    index_id: &str,
) -> Result<Option<IndexDocument>, AppError> {
    let doc = conn
        .query_row(
            "SELECT index_id, name, path, text, created_at, size_bytes
             FROM documents WHERE index_name = ?1 AND index_id = ?2",
            params![index_name, index_id],
            |row| {
                let size: Option<i64> = row.get(5)?;
                Ok(IndexDocument {
                    index_id: row.get(0)?,
                    name: row.get(1)?,
                    path: row.get(2)?,
                    text: row.get(3)?,
                    created_at: row.get(4)?,
                    size: size.map(|s| s.max(0) as u64),
                })
            },
        )
        .optional()?;
    Ok(doc)
}

pub fn document_ids(conn: &Connection, index_name: &str) -> Result<Vec<String>, AppError> {
    let mut stmt =
        conn.prepare("SELECT index_id FROM documents WHERE index_name = ?1 ORDER BY index_id")?;
    let ids = stmt
        .query_map(params![index_name], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(ids)
}

/// Remove documents by `index_id` together with their FTS rows. Unknown ids
/// are skipped.
pub fn delete_documents(
    conn: &Connection,
    index_name: &str,
    index_ids: &[String],
) -> Result<usize, AppError> {
    let tx = conn.unchecked_transaction()?;
    let mut removed = 0;
    {
        let mut delete_doc =
            tx.prepare("DELETE FROM documents WHERE index_name = ?1 AND index_id = ?2")?;
        let mut delete_fts =
            tx.prepare("DELETE FROM documents_fts WHERE index_name = ?1 AND index_id = ?2")?;
        for id in index_ids {
            removed += delete_doc.execute(params![index_name, id])?;
            delete_fts.execute(params![index_name, id])?;
        }
    }
    tx.commit()?;
    Ok(removed)
}

pub fn count_documents(conn: &Connection, index_name: &str) -> Result<u64, AppError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM documents WHERE index_name = ?1",
        params![index_name],
        |row| row.get(0),
    )?;
    Ok(count.max(0) as u64)
}

pub fn insert_task(
    conn: &Connection,
    index_name: &str,
    kind: &str,
    status: &TaskStatus,
) -> Result<TaskId, AppError> {
    let (status, error) = match status {
        TaskStatus::Pending => (STATUS_ENQUEUED, None),
        TaskStatus::Succeeded => (STATUS_SUCCEEDED, None),
        TaskStatus::Failed(reason) => (STATUS_FAILED, Some(reason.as_str())),
    };
    conn.execute(
        "INSERT INTO tasks (index_name, kind, status, error) VALUES (?1, ?2, ?3, ?4)",
        params![index_name, kind, status, error],
    )?;
    Ok(conn.last_insert_rowid().max(0) as TaskId)
}

pub fn get_task(conn: &Connection, uid: TaskId) -> Result<Option<TaskStatus>, AppError> {
    let uid = i64::try_from(uid).map_err(|_| AppError::NotFound(format!("task {uid}")))?;
    let row = conn
        .query_row(
            "SELECT status, error FROM tasks WHERE uid = ?1",
            params![uid],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?)),
        )
        .optional()?;

    Ok(row.map(|(status, error)| match status.as_str() {
        STATUS_SUCCEEDED => TaskStatus::Succeeded,
        STATUS_FAILED => TaskStatus::Failed(error.unwrap_or_else(|| "unknown error".to_string())),
        _ => TaskStatus::Pending,
    }))
}

/// Builds an FTS5 MATCH expression from free text: each whitespace token is
/// quoted and the last one becomes a prefix match.
pub fn fts_query(query: &str) -> Option<String> {
    let terms: Vec<String> = query
        .split_whitespace()
        .map(|term| format!("\"{}\"", term.replace('"', "\"\"")))
        .collect();
    if terms.is_empty() {
        return None;
    }
    Some(format!("{}*", terms.join(" ")))
}

pub fn search_documents(
    conn: &Connection,
    index_name: &str,
    query: &str,
    limit: usize,
) -> Result<Vec<SearchHit>, AppError> {
    let Some(expr) = fts_query(query) else {
        return Ok(Vec::new());
    };
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);

    // FTS5 auxiliary functions and MATCH take the table name, not an alias.
    let mut stmt = conn.prepare(
        "SELECT d.index_id, d.name, d.path, d.created_at,
                snippet(documents_fts, 3, '<em>', '</em>', '…', 12)
         FROM documents_fts
         JOIN documents d
           ON d.index_name = documents_fts.index_name AND d.index_id = documents_fts.index_id
         WHERE documents_fts MATCH ?1 AND documents_fts.index_name = ?2
         ORDER BY rank
         LIMIT ?3",
    )?;

    let hits = stmt
        .query_map(params![expr, index_name, limit], |row| {
            let snippet: Option<String> = row.get(4)?;
            Ok(SearchHit {
                index_id: row.get(0)?,
                name: row.get(1)?,
                path: row.get(2)?,
                created_at: row.get(3)?,
                snippet: snippet.filter(|s| !s.is_empty()),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(hits)
}
