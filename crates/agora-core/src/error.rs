//! Domain error types.

use thiserror::Error;
use uuid::Uuid;

/// Top-level domain error type.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An aggregate was not found.
    #[error("aggregate not found: {0}")]
    AggregateNotFound(Uuid),

    /// A malformed domain operation, rejected before any mutation.
    #[error("validation error: {0}")]
    Validation(String),

    /// A backing-store or other I/O failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// A registry or dependency wiring fault detected at bootstrap.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl DomainError {
    /// Convenience constructor for storage failures from any displayable error.
    pub fn storage(err: impl std::fmt::Display) -> Self {
        Self::Storage(err.to_string())
    }
}
