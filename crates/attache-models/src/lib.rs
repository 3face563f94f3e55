//! Core data models for Attache.
//!
//! This crate provides the fundamental data types used throughout the
//! Attache system: the typed bus event union, reminders, agent cards,
//! node-log wire records, and persisted chat messages.

pub mod agent_card;
pub mod event;
pub mod message;
pub mod node_log;
pub mod reminder;
pub mod swarm;

// Re-export main types
pub use agent_card::{default_manifest, default_shortlist, AgentCard};
pub use event::{ApprovalDecision, ApprovalRequest, BusEvent, EventKind, InboundMessage, NodeLog};
pub use message::{MessageRole, StoredMessage};
pub use node_log::NodeLogEvent;
pub use reminder::Reminder;
pub use swarm::SwarmTask;
