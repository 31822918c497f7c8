//! Remote API error types.

use std::time::Duration;
use thiserror::Error;

/// Errors returned by the remote media API.
#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    #[error("not authorized: {0}")]
    Unauthorized(String),

    #[error("quota exceeded: {0}")]
    Quota(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("transfer timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("upload not confirmed: {0}")]
    Confirmation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("invalid response: {0}")]
    Decode(String),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("configuration error: {0}")]
    Config(String),
}

impl RemoteError {
    /// Whether the failure happened on the wire rather than being a verdict from the server.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout(_))
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Result type for remote operations.
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;
