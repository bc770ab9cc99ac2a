use rusqlite::Connection;

use crate::error::AppError;

const SCHEMA_V1: &str = "
CREATE TABLE IF NOT EXISTS indexes (
    name TEXT PRIMARY KEY,
    primary_key TEXT NOT NULL,
    created_at TEXT DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS documents (
    index_name TEXT NOT NULL,
    index_id TEXT NOT NULL,
    name TEXT NOT NULL,
    path TEXT NOT NULL,
    text TEXT NOT NULL DEFAULT '',
    created_at TEXT,
    size_bytes INTEGER,
    PRIMARY KEY (index_name, index_id)
);

CREATE INDEX IF NOT EXISTS idx_documents_path ON documents(path);

CREATE VIRTUAL TABLE IF NOT EXISTS documents_fts USING fts5(
    index_name UNINDEXED,
    index_id UNINDEXED,
    name,
    text,
    tokenize = 'unicode61'
);

CREATE TABLE IF NOT EXISTS tasks (
    uid INTEGER PRIMARY KEY AUTOINCREMENT,
    index_name TEXT NOT NULL,
    kind TEXT NOT NULL,
    status TEXT NOT NULL,
    error TEXT,
    enqueued_at TEXT DEFAULT CURRENT_TIMESTAMP
);

CREATE INDEX IF NOT EXISTS idx_tasks_index ON tasks(index_name);
";

pub fn run_migrations(conn: &Connection) -> Result<(), AppError> {
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    conn.execute_batch(SCHEMA_V1)?;
    Ok(())
}
