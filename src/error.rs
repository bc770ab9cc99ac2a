use crate::models::search::TaskId;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("could not decode {path}: {reason}")]
    Decode { path: String, reason: String },

    #[error("index sync failed (task {}): {reason}", display_task(.task_id))]
    SyncFailed {
        task_id: Option<TaskId>,
        reason: String,
    },

    #[error("ambiguous path rules: '{first}' overlaps '{second}'")]
    AmbiguousPath { first: String, second: String },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Watcher error: {0}")]
    Watcher(String),

    #[error("Navigation error: {0}")]
    Navigation(String),

    #[error("{0}")]
    General(String),
}

fn display_task(task_id: &Option<TaskId>) -> String {
    task_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "none".to_string())
}

impl AppError {
    /// Classify an I/O failure on `path` into the read-error taxonomy.
    pub fn from_io(path: &str, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                Self::NotFound(path.to_string())
            }
            std::io::ErrorKind::InvalidData => Self::Decode {
                path: path.to_string(),
                reason: err.to_string(),
            },
            _ => Self::Io(err),
        }
    }

    pub fn capture(self) -> Self {
        sentry::capture_message(&self.to_string(), sentry::Level::Error);
        self
    }
}
