//! Ephemeral swarm task descriptors.

use serde::{Deserialize, Serialize};

/// One unit of work handed to a sub-agent.
///
/// Tasks are ephemeral: they exist only for the lifetime of a dispatch and
/// are never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwarmTask {
    /// Zero-based position in the dispatch; drives the start stagger and the
    /// `[Agent #N ...]` report prefix (N = index + 1).
    pub index: usize,
    /// The task text for this agent alone.
    pub prompt: String,
    /// The system instruction shared by every agent in the dispatch.
    pub shared_instruction: String,
}

impl SwarmTask {
    pub fn new(index: usize, prompt: impl Into<String>, shared_instruction: impl Into<String>) -> Self {
        Self {
            index,
            prompt: prompt.into(),
            shared_instruction: shared_instruction.into(),
        }
    }

    /// One-based agent number used in report prefixes.
    pub fn agent_number(&self) -> usize {
        self.index + 1
    }
}
