//! Error taxonomy shared by every memchat component.

use thiserror::Error;

/// Result alias for core operations.
pub type Result<T> = std::result::Result<T, ChatError>;

/// Errors surfaced by chunking, indexing, retrieval, conversation
/// bookkeeping, command parsing and the session stores.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ChatError {
    /// Bad chunking or configuration parameters.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A caller passed an out-of-range argument (e.g. `k <= 0`).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Embedding length differs from the index dimensionality.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The embedding service could not produce a vector.
    #[error("embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// The completion endpoint failed, timed out or returned garbage.
    #[error("completion failed: {0}")]
    CompletionFailed(String),

    /// Reading or writing a session file failed.
    #[error("storage error: {0}")]
    StorageError(String),

    /// A task command named a task that does not exist.
    #[error("task not found: {0}")]
    TaskNotFound(String),

    /// A reserved command could not be parsed.
    #[error("malformed command: {0}")]
    MalformedCommand(String),

    /// A conversation operation was called in the wrong state.
    #[error("invalid conversation state: {0}")]
    InvalidState(String),
}

impl ChatError {
    pub fn storage(err: impl std::fmt::Display) -> Self {
        Self::StorageError(err.to_string())
    }
}
