//! Error types for bus operations.

use thiserror::Error;

/// Errors that can occur during bus operations.
#[derive(Error, Debug)]
pub enum EventError {
    /// Lock poisoned (thread panicked while holding lock).
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),
}

/// Result type alias for bus operations.
pub type Result<T> = std::result::Result<T, EventError>;
