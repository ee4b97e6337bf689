use nstorage::errors::FetchError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetcherError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("missing or malformed `{0}` array in response")]
    MissingEnvelope(&'static str),

    #[error("{kind} #{index} in response is malformed: {reason}")]
    MalformedItem {
        kind: &'static str,
        index: usize,
        reason: String,
    },

    #[error("endpoint answered with a 404 document: {0}")]
    NotFoundDocument(String),

    #[error("invalid parameter: {0}")]
    InvalidParam(String),
}

impl FetcherError {
    /// Maps a client failure onto the fetch taxonomy of the sync engine.
    pub fn into_fetch_error(self, url: &str) -> FetchError {
        let url = url.to_string();
        match self {
            FetcherError::Request(err) => FetchError::Transport {
                url,
                message: err.to_string(),
            },
            FetcherError::Status { status, body } => FetchError::Status { url, status, body },
            FetcherError::InvalidParam(message) => FetchError::Transport { url, message },
            other @ (FetcherError::Json(_)
            | FetcherError::MissingEnvelope(_)
            | FetcherError::MalformedItem { .. }
            | FetcherError::NotFoundDocument(_)) => FetchError::ResponseShape {
                url,
                reason: other.to_string(),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, FetcherError>;
