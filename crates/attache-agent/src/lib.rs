//! The LLM reasoning loop and its tool surface.
//!
//! [`brain::run_turn`] drives a tool-calling conversation against an
//! OpenRouter-compatible chat API. Tools cover reminders, parallel sub-agent
//! swarms, and the agent-hub network; every tool resolves to a string so the
//! loop degrades gracefully instead of erroring across the transport seam.

pub mod brain;
pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod subagent;
pub mod tool;
pub mod tools;

pub use brain::{run_turn, HISTORY_LIMIT, MAX_STEPS};
pub use client::{ChatClient, ChatMessage, ChatResponse, ChatTool, OpenRouterClient};
pub use config::ModelConfig;
pub use context::AgentContext;
pub use error::{AgentError, Result};
pub use subagent::LlmSubAgentRunner;
pub use tool::{ToolCall, ToolDefinition};
pub use tools::{child_tools, default_tools, execute_tool};
