//! The typed bus event union.
//!
//! Every in-process event is a variant of [`BusEvent`], so the payload shape
//! for each event name is fixed at compile time. [`EventKind`] is the
//! fieldless mirror used to key subscription tables.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A debounced, multi-modal message arriving from the chat transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Aggregated text (multiple short messages joined with blank lines).
    pub text: String,
    /// Base64-encoded image payloads.
    #[serde(default)]
    pub images: Vec<String>,
    /// Originating chat.
    pub chat_id: i64,
    /// Stable user identifier (or a `system-*` marker for internal triggers).
    pub user_id: String,
}

/// A pending human-in-the-loop approval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub id: Uuid,
    /// Human-readable description of the action awaiting approval.
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl ApprovalRequest {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            description: description.into(),
            created_at: Utc::now(),
        }
    }
}

/// The outcome of an approval request, keyed by the request id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalDecision {
    pub id: Uuid,
    pub approved: bool,
}

/// A single hop in the agent network, mirrored to the visualization stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeLog {
    /// Logical sender, e.g. "LocalAgent" or an agent endpoint URL.
    pub source: String,
    /// Logical receiver.
    pub target: String,
    /// What happened, e.g. "search_hub" or "netagent_reply".
    pub action: String,
    /// Free-form payload for the console view.
    pub payload: Value,
    /// Set by the emitter when the hop happened earlier than the publish.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl NodeLog {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        action: impl Into<String>,
        payload: Value,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            action: action.into(),
            payload,
            timestamp: None,
        }
    }
}

/// Every event that can travel over the in-process bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusEvent {
    /// Free-form agent activity log line.
    AgentLog { role: String, content: String },
    /// The reasoning loop hit an unrecoverable error.
    AgentError { message: String },
    /// A debounced user message is ready for the reasoning loop.
    MessageReceived(InboundMessage),
    /// An action is waiting on a human decision.
    ApprovalRequested(ApprovalRequest),
    /// A human decided on a pending approval.
    ApprovalDecision(ApprovalDecision),
    /// A stored reminder came due.
    ReminderTriggered { id: Uuid, note: String },
    /// A network hop to mirror onto the visualization stream.
    NodeLog(NodeLog),
    /// An agent-hub discovery search was issued.
    HubSearch {
        search_id: Uuid,
        intent: String,
        capabilities: Vec<String>,
    },
}

/// Fieldless mirror of [`BusEvent`], used to key subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    AgentLog,
    AgentError,
    MessageReceived,
    ApprovalRequested,
    ApprovalDecision,
    ReminderTriggered,
    NodeLog,
    HubSearch,
}

impl BusEvent {
    /// The kind this event is delivered under.
    pub fn kind(&self) -> EventKind {
        match self {
            BusEvent::AgentLog { .. } => EventKind::AgentLog,
            BusEvent::AgentError { .. } => EventKind::AgentError,
            BusEvent::MessageReceived(_) => EventKind::MessageReceived,
            BusEvent::ApprovalRequested(_) => EventKind::ApprovalRequested,
            BusEvent::ApprovalDecision(_) => EventKind::ApprovalDecision,
            BusEvent::ReminderTriggered { .. } => EventKind::ReminderTriggered,
            BusEvent::NodeLog(_) => EventKind::NodeLog,
            BusEvent::HubSearch { .. } => EventKind::HubSearch,
        }
    }
}
