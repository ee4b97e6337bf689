use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("SQLite operation failed: {0}")]
    SQLite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArg(String),

    #[error("Synchronization failed: {0}")]
    SyncError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Failure of a remote source to deliver a usable collection.
///
/// Transport and status failures mean the source is unreachable or refusing;
/// `ResponseShape` means it answered but no longer matches the expected
/// contract. Both abort a run before any local write happens.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("{url} responded with HTTP {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("unexpected response shape from {url}: {reason}")]
    ResponseShape { url: String, reason: String },
}

impl FetchError {
    pub fn is_response_shape(&self) -> bool {
        matches!(self, FetchError::ResponseShape { .. })
    }
}
