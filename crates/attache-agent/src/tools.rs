//! The agent's tool surface.
//!
//! Every tool resolves to a plain string the model can read back. Failures
//! come back as formatted failure strings, never as errors, so a broken tool
//! can not abort the surrounding reasoning loop.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use attache_models::{BusEvent, NodeLog, Reminder};
use attache_scheduler::CronExpr;
use attache_swarm::{SwarmDispatcher, SwarmError};

use crate::context::AgentContext;
use crate::subagent::LlmSubAgentRunner;
use crate::tool::{ToolCall, ToolDefinition};

/// Simulated network settle time before contacting a network agent.
const NETAGENT_DELAY: Duration = Duration::from_secs(1);

/// Full tool set for the main agent.
pub fn default_tools() -> Vec<ToolDefinition> {
    let mut tools = child_tools();
    tools.push(ToolDefinition::new(
        "dispatch_swarm",
        "Spin up a swarm of sub-agents to perform parallel tasks. Use this when you have a list \
         of items (e.g., 5 customer names) and need to perform the SAME action on all of them.",
        json!({
            "type": "object",
            "properties": {
                "tasks": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "An array of specific tasks. One for each agent. E.g. ['Find email for John Doe', 'Find email for Jane Smith']"
                },
                "system_instruction": {
                    "type": "string",
                    "description": "The shared system prompt for all agents. Define their persona and strict output format."
                }
            },
            "required": ["tasks", "system_instruction"]
        }),
    ));
    tools
}

/// Tool set for swarm sub-agents. Excludes `dispatch_swarm` so a sub-agent
/// can not recursively fan out.
pub fn child_tools() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new(
            "set_reminder",
            "Set a recurring or one-time reminder using Cron format.",
            json!({
                "type": "object",
                "properties": {
                    "cron": {
                        "type": "string",
                        "description": "Cron expression (min hr day month dow). E.g. '0 9 * * 1-5' for weekdays at 9am."
                    },
                    "note": { "type": "string", "description": "What to remind you about." }
                },
                "required": ["cron", "note"]
            }),
        ),
        ToolDefinition::new(
            "list_reminders",
            "List all active reminders.",
            json!({ "type": "object", "properties": {} }),
        ),
        ToolDefinition::new(
            "delete_reminder",
            "Delete a reminder by ID.",
            json!({
                "type": "object",
                "properties": { "id": { "type": "string" } },
                "required": ["id"]
            }),
        ),
        ToolDefinition::new(
            "search_agent_hub",
            "Reach out to the 'AgentHub' (the agent internet) to find and delegate a task to a \
             specialized 3rd-party agent. Use this for ANY task you cannot do yourself (e.g., \
             booking trains, buying tickets, browsing complex sites).",
            json!({
                "type": "object",
                "properties": {
                    "intent": {
                        "type": "string",
                        "description": "A clear, concise instruction of what needs to be achieved."
                    },
                    "capabilities": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "List of capabilities the target agent must have (e.g., ['travel', 'booking', 'europe'])."
                    }
                },
                "required": ["intent", "capabilities"]
            }),
        ),
        ToolDefinition::new(
            "call_netagent",
            "Converse with a specific NetAgent to negotiate or execute a multi-step task. ALWAYS \
             use search_agent_hub first to find the correct agent_id. Pass the session_id returned \
             from previous calls to continue an ongoing conversation.",
            json!({
                "type": "object",
                "properties": {
                    "agent_url": {
                        "type": "string",
                        "description": "The URL endpoint of the NetAgent to contact."
                    },
                    "prompt": {
                        "type": "string",
                        "description": "Your message, request, or reply to the NetAgent."
                    },
                    "session_id": {
                        "type": "string",
                        "description": "The session ID for ongoing conversations. Leave empty if this is the FIRST message to the agent."
                    }
                },
                "required": ["agent_url", "prompt"]
            }),
        ),
    ]
}

/// Executes one tool call from the main agent.
pub async fn execute_tool(ctx: &AgentContext, call: &ToolCall) -> String {
    match call.name.as_str() {
        "dispatch_swarm" => dispatch_swarm(ctx, call).await,
        _ => execute_child_tool(ctx, call).await,
    }
}

/// Executes one tool call from a sub-agent.
pub async fn execute_child_tool(ctx: &AgentContext, call: &ToolCall) -> String {
    match call.name.as_str() {
        "set_reminder" => set_reminder(ctx, call),
        "list_reminders" => list_reminders(ctx),
        "delete_reminder" => delete_reminder(ctx, call),
        "search_agent_hub" => search_agent_hub(ctx, call).await,
        "call_netagent" => call_netagent(ctx, call).await,
        other => format!("Unknown tool: {}", other),
    }
}

fn set_reminder(ctx: &AgentContext, call: &ToolCall) -> String {
    let Some(cron) = call.string_arg("cron") else {
        return "Error setting reminder: missing 'cron' argument".to_string();
    };
    let Some(note) = call.string_arg("note") else {
        return "Error setting reminder: missing 'note' argument".to_string();
    };

    if let Err(e) = CronExpr::parse(cron) {
        return format!("Error setting reminder: {}", e);
    }

    let reminder = Reminder::new(cron, note);
    match ctx.reminders.save(&reminder) {
        Ok(()) => format!("✅ Reminder set (ID: {})", reminder.id),
        Err(e) => format!("Error setting reminder: {}", e),
    }
}

fn list_reminders(ctx: &AgentContext) -> String {
    match ctx.reminders.list_enabled() {
        Ok(reminders) if reminders.is_empty() => "No active reminders.".to_string(),
        Ok(reminders) => {
            let rows: Vec<Value> = reminders
                .iter()
                .map(|r| json!({ "id": r.id, "cron": r.cron, "note": r.note }))
                .collect();
            serde_json::to_string_pretty(&rows).unwrap_or_else(|_| "[]".to_string())
        }
        Err(e) => format!("Error listing reminders: {}", e),
    }
}

fn delete_reminder(ctx: &AgentContext, call: &ToolCall) -> String {
    let Some(id) = call.string_arg("id").and_then(|s| Uuid::parse_str(s).ok()) else {
        return "❌ Reminder not found.".to_string();
    };
    match ctx.reminders.delete(&id) {
        Ok(true) => "✅ Reminder deleted.".to_string(),
        Ok(false) => "❌ Reminder not found.".to_string(),
        Err(e) => format!("Error deleting reminder: {}", e),
    }
}

async fn dispatch_swarm(ctx: &AgentContext, call: &ToolCall) -> String {
    let tasks = call.string_array_arg("tasks");
    let instruction = call.string_arg("system_instruction").unwrap_or_default();

    let dispatcher = SwarmDispatcher::new(ctx.bus.clone());
    let runner = Arc::new(LlmSubAgentRunner::new(ctx.clone()));
    match dispatcher.dispatch(tasks, instruction, runner).await {
        Ok(report) => format!("✅ Swarm Execution Complete.\n\n{}", report),
        Err(SwarmError::TooManyTasks { .. }) => {
            "❌ Too many agents requested. Max limit is 10.".to_string()
        }
        Err(e) => format!("Swarm failed: {}", e),
    }
}

async fn search_agent_hub(ctx: &AgentContext, call: &ToolCall) -> String {
    let intent = call.string_arg("intent").unwrap_or_default().to_string();
    let capabilities = call.string_array_arg("capabilities");

    publish(ctx, BusEvent::HubSearch {
        search_id: Uuid::new_v4(),
        intent: intent.clone(),
        capabilities: capabilities.clone(),
    });
    node_log(
        ctx,
        &ctx.persona,
        "AgentHub",
        "search_hub",
        json!({ "intent": &intent, "capabilities": &capabilities }),
    );

    let body = json!({ "intent": &intent, "capabilities": &capabilities });
    let data: Vec<Value> = match ctx.http.post(&ctx.hub_url).json(&body).send().await {
        Ok(response) => response.json().await.unwrap_or_default(),
        Err(e) => {
            warn!(error = %e, url = %ctx.hub_url, "agent hub unreachable");
            Vec::new()
        }
    };

    let matches: Vec<Value> = data
        .iter()
        .filter_map(|m| m.get("agent_id").cloned())
        .collect();
    let matches_detail: Vec<Value> = data
        .iter()
        .map(|m| {
            json!({
                "agent_id": m.get("agent_id").cloned().unwrap_or(Value::Null),
                "endpoint": m.get("endpoint").cloned().unwrap_or(Value::Null),
                "confidence": m.get("trust").cloned().unwrap_or(Value::Null),
                "capabilities": m.pointer("/metadata/capabilities").cloned().unwrap_or(json!([])),
                "description": m.pointer("/metadata/description").cloned().unwrap_or(json!("")),
                "tags": m.pointer("/metadata/tags").cloned().unwrap_or(json!([])),
                "reasoning": m.get("reasoning").cloned().unwrap_or(json!("")),
            })
        })
        .collect();

    node_log(
        ctx,
        "AgentHub",
        &ctx.persona,
        "search_hub_result",
        json!({
            "results_count": data.len(),
            "matches": matches,
            "matches_detail": matches_detail,
        }),
    );

    serde_json::to_string_pretty(&data).unwrap_or_else(|_| "[]".to_string())
}

async fn call_netagent(ctx: &AgentContext, call: &ToolCall) -> String {
    let agent_url = call.string_arg("agent_url").unwrap_or_default().to_string();
    let prompt = call.string_arg("prompt").unwrap_or_default().to_string();

    if let Some(gate) = &ctx.approval {
        let description = format!("Contact network agent {} with: {}", agent_url, prompt);
        if !gate.request(&description).await {
            info!(url = %agent_url, "netagent call denied");
            return "❌ Action denied by user.".to_string();
        }
    }

    let session_id = match call.string_arg("session_id") {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => format!("session_{}", &Uuid::new_v4().simple().to_string()[..8]),
    };

    node_log(
        ctx,
        &ctx.persona,
        &agent_url,
        "netagent_request",
        json!({ "prompt": &prompt, "session_id": &session_id }),
    );

    tokio::time::sleep(NETAGENT_DELAY).await;

    let body = json!({ "prompt": &prompt, "session_id": &session_id });
    let reply = match ctx.http.post(&agent_url).json(&body).send().await {
        Ok(response) if response.status().is_success() => response
            .json::<Value>()
            .await
            .ok()
            .and_then(|v| v.get("answer").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_else(|| {
                "We are not able to connect to the NetAgent. Please try again later.".to_string()
            }),
        Ok(_) => "We are not able to connect to the NetAgent. Please try again later.".to_string(),
        Err(_) => format!("Connection to {} failed. Simulation mode active.", agent_url),
    };

    node_log(
        ctx,
        &agent_url,
        &ctx.persona,
        "netagent_reply",
        json!({ "session_id": &session_id, "reply": &reply }),
    );

    serde_json::to_string_pretty(&json!({ "session_id": &session_id, "reply": &reply }))
        .unwrap_or(reply)
}

fn node_log(ctx: &AgentContext, source: &str, target: &str, action: &str, payload: Value) {
    publish(
        ctx,
        BusEvent::NodeLog(NodeLog::new(source, target, action, payload)),
    );
}

fn publish(ctx: &AgentContext, event: BusEvent) {
    if let Err(e) = ctx.bus.publish(event) {
        warn!(error = %e, "failed to publish tool event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use tempfile::tempdir;

    use attache_events::{ApprovalGate, EventBus};
    use attache_models::EventKind;
    use attache_persistence::{MessageStore, ReminderStore};

    use crate::client::{ChatClient, ChatMessage, ChatResponse, ChatTool};
    use crate::config::ModelConfig;
    use crate::error::{AgentError, Result};

    /// A chat client for tests that never expect to reach the model.
    struct PanicChat;

    #[async_trait]
    impl ChatClient for PanicChat {
        async fn chat(
            &self,
            _config: &ModelConfig,
            _messages: Vec<ChatMessage>,
            _tools: Option<Vec<ChatTool>>,
        ) -> Result<ChatResponse> {
            Err(AgentError::ModelInvocation("not wired in this test".into()))
        }
    }

    fn context() -> AgentContext {
        let dir = tempdir().unwrap();
        let base = dir.path().to_path_buf();
        std::mem::forget(dir);
        AgentContext::new(
            EventBus::new(),
            Arc::new(ReminderStore::new(base.clone())),
            Arc::new(MessageStore::new(base)),
            Arc::new(PanicChat),
            "http://127.0.0.1:1/search",
        )
    }

    #[tokio::test]
    async fn test_set_reminder_roundtrip() {
        let ctx = context();

        let call = ToolCall::new(
            "set_reminder",
            json!({ "cron": "0 9 * * 1-5", "note": "standup" }),
        );
        let reply = execute_tool(&ctx, &call).await;
        assert!(reply.starts_with("✅ Reminder set (ID: "), "{}", reply);

        let listed = execute_tool(&ctx, &ToolCall::new("list_reminders", json!({}))).await;
        assert!(listed.contains("standup"));
        assert!(listed.contains("0 9 * * 1-5"));
    }

    #[tokio::test]
    async fn test_set_reminder_rejects_bad_cron() {
        let ctx = context();

        let call = ToolCall::new(
            "set_reminder",
            json!({ "cron": "every morning", "note": "nope" }),
        );
        let reply = execute_tool(&ctx, &call).await;
        assert!(reply.starts_with("Error setting reminder:"), "{}", reply);

        let listed = execute_tool(&ctx, &ToolCall::new("list_reminders", json!({}))).await;
        assert_eq!(listed, "No active reminders.");
    }

    #[tokio::test]
    async fn test_delete_reminder_messages() {
        let ctx = context();
        let reminder = Reminder::new("* * * * *", "temp");
        ctx.reminders.save(&reminder).unwrap();

        let call = ToolCall::new("delete_reminder", json!({ "id": reminder.id.to_string() }));
        assert_eq!(execute_tool(&ctx, &call).await, "✅ Reminder deleted.");
        assert_eq!(execute_tool(&ctx, &call).await, "❌ Reminder not found.");

        let garbage = ToolCall::new("delete_reminder", json!({ "id": "not-a-uuid" }));
        assert_eq!(execute_tool(&ctx, &garbage).await, "❌ Reminder not found.");
    }

    #[tokio::test]
    async fn test_dispatch_swarm_cap_message() {
        let ctx = context();
        let tasks: Vec<String> = (0..11).map(|i| format!("task {}", i)).collect();

        let call = ToolCall::new(
            "dispatch_swarm",
            json!({ "tasks": tasks, "system_instruction": "report facts" }),
        );
        let reply = execute_tool(&ctx, &call).await;
        assert_eq!(reply, "❌ Too many agents requested. Max limit is 10.");
    }

    #[tokio::test]
    async fn test_call_netagent_denied_without_network() {
        let ctx = context();
        let gate = ApprovalGate::new(ctx.bus.clone());
        let decider = gate.clone();
        // Deny every approval as soon as it is requested.
        let _handle = ctx
            .bus
            .subscribe(EventKind::ApprovalRequested, move |event| {
                if let BusEvent::ApprovalRequested(request) = event {
                    let _ = decider.decide(request.id, false);
                }
            })
            .unwrap();
        let ctx = ctx.with_approval(gate);

        let call = ToolCall::new(
            "call_netagent",
            json!({ "agent_url": "http://127.0.0.1:1/run", "prompt": "book it" }),
        );
        let reply = execute_tool(&ctx, &call).await;
        assert_eq!(reply, "❌ Action denied by user.");
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let ctx = context();
        let call = ToolCall::new("launch_rocket", json!({}));
        assert_eq!(execute_tool(&ctx, &call).await, "Unknown tool: launch_rocket");
    }

    #[test]
    fn test_child_tools_exclude_swarm() {
        let names: Vec<String> = child_tools().into_iter().map(|t| t.name).collect();
        assert!(!names.contains(&"dispatch_swarm".to_string()));
        assert!(names.contains(&"call_netagent".to_string()));

        let full: Vec<String> = default_tools().into_iter().map(|t| t.name).collect();
        assert!(full.contains(&"dispatch_swarm".to_string()));
        assert_eq!(full.len(), names.len() + 1);
    }
}
