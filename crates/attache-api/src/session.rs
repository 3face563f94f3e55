//! Per-process hub session state.

use serde::{Deserialize, Serialize};

/// An agent fetched from the network, including the private fields the API
/// never exposes to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubAgent {
    pub id: String,
    pub name: String,
    pub provider: String,
    pub capabilities: Vec<String>,
    pub description: String,
    pub score: f64,
    pub endpoint: String,
}

/// Mutable state threaded through the demo flow, from intent parsing to task
/// execution. Lives behind a lock in [`crate::state::AppState`].
#[derive(Debug, Clone, Default)]
pub struct HubSession {
    pub intent: String,
    pub domain: String,
    pub agents: Vec<HubAgent>,
    pub shortlisted_indices: Vec<usize>,
    pub selected_agent: String,
    pub selected_endpoint: String,
}

impl HubSession {
    /// Starts a new flow: keeps nothing but the fresh intent and domain.
    pub fn reset(&mut self, intent: impl Into<String>, domain: impl Into<String>) {
        *self = Self {
            intent: intent.into(),
            domain: domain.into(),
            ..Self::default()
        };
    }

    /// Marks an agent as selected, recording its dispatch endpoint.
    pub fn select(&mut self, agent: &HubAgent) {
        self.selected_agent = agent.name.clone();
        self.selected_endpoint = agent.endpoint.clone();
    }
}
