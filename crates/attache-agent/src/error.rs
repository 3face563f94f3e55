//! Error types for the reasoning loop.

use thiserror::Error;

/// Errors that can occur while driving the agent.
#[derive(Error, Debug)]
pub enum AgentError {
    /// Missing or invalid configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The model API call failed.
    #[error("model invocation failed: {0}")]
    ModelInvocation(String),

    /// The model returned something we could not parse.
    #[error("response parse error: {0}")]
    ResponseParse(String),

    /// Underlying store failure.
    #[error("store error: {0}")]
    Persistence(#[from] attache_persistence::PersistenceError),
}

/// Result type alias for agent operations.
pub type Result<T> = std::result::Result<T, AgentError>;
