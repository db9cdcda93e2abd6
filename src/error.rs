use std::time::Duration;

/// Result type for game operations
pub type GameResult<T> = Result<T, GameError>;

/// Errors surfaced by store writes and game operations
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    /// Caller lacks permission for the path or operation. Never retried
    /// automatically.
    #[error("not authorized: {0}")]
    Unauthorized(String),

    /// Operation attempted outside the required phase or state. Retryable
    /// once the state changes.
    #[error("precondition failed: {0}")]
    Precondition(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Transient store failure; callable ops fall back where a fallback
    /// exists, direct writes surface this for manual retry.
    #[error("store unavailable: {0}")]
    Store(String),

    #[error("store timed out after {0:?}")]
    Timeout(Duration),

    #[error("serialization failed: {0}")]
    Serde(#[from] serde_json::Error),
}

impl GameError {
    /// Wire error code for `ServerMessage::Error`
    pub fn code(&self) -> &'static str {
        match self {
            GameError::Unauthorized(_) => "UNAUTHORIZED",
            GameError::Precondition(_) => "PRECONDITION",
            GameError::NotFound(_) => "NOT_FOUND",
            GameError::Store(_) | GameError::Timeout(_) => "STORE",
            GameError::Serde(_) => "BAD_MESSAGE",
        }
    }
}
