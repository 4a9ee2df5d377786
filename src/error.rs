//! Error types for the external calls the monitor makes.

use thiserror::Error;

/// Failure of a single request to the enrichment API
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP 429
    #[error("rate limited")]
    RateLimited,

    /// Any other non-success status
    #[error("HTTP status {0}")]
    Status(u16),

    /// Timeout, connection failure or unreadable body
    #[error("request error: {0}")]
    Transport(String),
}

impl FetchError {
    /// Whether another attempt may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited | Self::Transport(_))
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) if status.as_u16() == 429 => Self::RateLimited,
            Some(status) => Self::Status(status.as_u16()),
            None => Self::Transport(err.to_string()),
        }
    }
}

/// Posting a new notification failed
#[derive(Debug, Error)]
pub enum SendError {
    #[error("channel {0} not found")]
    UnknownChannel(u64),

    #[error("send rejected with HTTP {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("send request failed: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for SendError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Editing a sent notification failed
#[derive(Debug, Error)]
pub enum EditError {
    /// The message was deleted
    #[error("message not found")]
    NotFound,

    #[error("missing permission to edit message")]
    Forbidden,

    /// Past the maximum editable age
    #[error("message too old to edit")]
    TooOld,

    #[error("edit failed: {0}")]
    Other(String),
}

impl From<reqwest::Error> for EditError {
    fn from(err: reqwest::Error) -> Self {
        Self::Other(err.to_string())
    }
}
