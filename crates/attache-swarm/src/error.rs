//! Error types for swarm dispatch.

use thiserror::Error;

use crate::dispatcher::MAX_AGENTS;

/// Errors that can occur while running a swarm.
#[derive(Error, Debug)]
pub enum SwarmError {
    /// More parallel tasks were requested than the dispatcher allows.
    #[error("too many agents requested: {count} (max {MAX_AGENTS})")]
    TooManyTasks { count: usize },

    /// A sub-agent run failed.
    #[error("{0}")]
    Agent(String),
}

/// Result type alias for swarm operations.
pub type Result<T> = std::result::Result<T, SwarmError>;
