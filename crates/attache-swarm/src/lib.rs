//! Parallel sub-agent dispatch for Attache.
//!
//! The [`SwarmDispatcher`] fans a list of task prompts out to concurrent
//! sub-agents, staggering launches and stitching the individual reports back
//! together in task order.

pub mod dispatcher;
pub mod error;

pub use dispatcher::{SubAgentRunner, SwarmDispatcher, MAX_AGENTS, STAGGER};
pub use error::{Result, SwarmError};
