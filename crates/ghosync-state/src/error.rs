//! Checkpoint store error types.

/// Errors produced by [`CheckpointStore`](crate::CheckpointStore) operations.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// Underlying PostgreSQL failure.
    #[error("postgres error: {0}")]
    Postgres(#[from] postgres::Error),

    /// Stored checkpoint column holds something that is not a checkpoint.
    #[error("stored checkpoint is not valid: {0}")]
    Checkpoint(#[from] serde_json::Error),

    /// A state row holds a value outside the known vocabulary.
    #[error("invalid state row: {0}")]
    Invalid(String),

    /// Internal mutex was poisoned by a panicked thread.
    #[error("checkpoint store lock poisoned")]
    LockPoisoned,
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, StateError>;
