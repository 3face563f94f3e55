//! Shared context handed to the reasoning loop and its tools.

use std::sync::Arc;

use attache_events::{ApprovalGate, EventBus};
use attache_persistence::{MessageStore, ReminderStore};

use crate::client::ChatClient;
use crate::config::ModelConfig;

/// Everything a turn needs, threaded explicitly instead of via globals.
#[derive(Clone)]
pub struct AgentContext {
    pub bus: EventBus,
    pub reminders: Arc<ReminderStore>,
    pub messages: Arc<MessageStore>,
    pub chat: Arc<dyn ChatClient>,
    pub http: reqwest::Client,
    /// Model driving the main conversation.
    pub model: ModelConfig,
    /// Model driving swarm sub-agents.
    pub child_model: ModelConfig,
    /// Agent-hub search endpoint.
    pub hub_url: String,
    /// When set, contacting a network agent requires human approval.
    pub approval: Option<ApprovalGate>,
    /// Assistant persona name used in prompts and node logs.
    pub persona: String,
}

impl AgentContext {
    pub fn new(
        bus: EventBus,
        reminders: Arc<ReminderStore>,
        messages: Arc<MessageStore>,
        chat: Arc<dyn ChatClient>,
        hub_url: impl Into<String>,
    ) -> Self {
        Self {
            bus,
            reminders,
            messages,
            chat,
            http: reqwest::Client::new(),
            model: ModelConfig::default(),
            child_model: ModelConfig::new("x-ai/grok-beta"),
            hub_url: hub_url.into(),
            approval: None,
            persona: "Attache".to_string(),
        }
    }

    pub fn with_model(mut self, model: ModelConfig) -> Self {
        self.model = model;
        self
    }

    pub fn with_child_model(mut self, model: ModelConfig) -> Self {
        self.child_model = model;
        self
    }

    pub fn with_approval(mut self, gate: ApprovalGate) -> Self {
        self.approval = Some(gate);
        self
    }

    pub fn with_persona(mut self, persona: impl Into<String>) -> Self {
        self.persona = persona.into();
        self
    }
}
