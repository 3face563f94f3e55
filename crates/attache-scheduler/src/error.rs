//! Error types for the reminder scheduler.

use thiserror::Error;

/// Errors that can occur while parsing cron expressions or polling reminders.
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// The cron expression could not be parsed.
    #[error("invalid cron expression: {0}")]
    InvalidCron(String),

    /// Underlying store failure.
    #[error("store error: {0}")]
    Store(#[from] attache_persistence::PersistenceError),
}

/// Result type alias for scheduler operations.
pub type Result<T> = std::result::Result<T, SchedulerError>;
