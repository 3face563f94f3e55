//! Error types for the step sequencer.

use thiserror::Error;

/// Errors that can occur when talking to the sequencer actor.
#[derive(Error, Debug)]
pub enum SequencerError {
    /// The actor task has stopped and its inbox is closed.
    #[error("sequencer actor is no longer running")]
    Closed,
}

/// Result type alias for sequencer operations.
pub type Result<T> = std::result::Result<T, SequencerError>;
