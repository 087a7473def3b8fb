use thiserror::Error;

use crate::store::error::StoreError;

/// Rolling depth buffer errors.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BufferError {
    #[error("depth buffer is empty, nothing to average")]
    Empty,
}

/// Capture session errors.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session '{0}' is already running")]
    AlreadyRunning(String),

    #[error("session '{0}' is not running")]
    NotRunning(String),

    #[error("session '{0}' has not received a frame yet")]
    NoFrame(String),

    #[error(transparent)]
    Buffer(#[from] BufferError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to spawn acquisition thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("session '{0}' lost its frame source (acquisition thread panicked)")]
    SourceLost(String),
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, SessionError>;
