//! The main reasoning loop.

use chrono::{DateTime, Utc};
use tracing::{debug, error, info};

use attache_models::{BusEvent, MessageRole, StoredMessage};

use crate::client::{ChatMessage, ChatTool, ChatToolCall};
use crate::context::AgentContext;
use crate::error::Result;
use crate::tools::{default_tools, execute_tool};

/// Upper bound on model round-trips per turn.
pub const MAX_STEPS: usize = 10;

/// How many stored messages are replayed as conversation context.
pub const HISTORY_LIMIT: usize = 30;

const FALLBACK_REPLY: &str = "I'm having trouble thinking right now. Check the logs.";

/// Runs one conversational turn and always produces a reply string; any
/// failure inside the loop is logged and collapsed into a canned apology so
/// the transport never sees an error.
pub async fn run_turn(ctx: &AgentContext, text: &str, images: &[String], user_id: &str) -> String {
    info!(user_id, images = images.len(), "agent turn started");
    match try_turn(ctx, text, images).await {
        Ok(reply) => reply,
        Err(e) => {
            error!(error = %e, user_id, "agent turn failed");
            let _ = ctx.bus.publish(BusEvent::AgentError {
                message: e.to_string(),
            });
            FALLBACK_REPLY.to_string()
        }
    }
}

fn system_prompt(persona: &str, now: DateTime<Utc>) -> String {
    format!(
        "You are {persona}, a personal AI assistant.\n\
         You are helpful, witty, and direct.\n\
         Current System Time: {}\n\n\
         Guidelines:\n\
         1. **Parallel Processing**: Use 'dispatch_swarm' for lists of tasks.\n\
         2. **Context**: You can see images and process text.\n\
         3. Format responses with Telegram-safe HTML only: <b>, <i>, <pre>, <code>, <br>. \
         Do NOT use <p> or <div> (Telegram rejects them).",
        now.format("%Y-%m-%d %H:%M:%S UTC")
    )
}

async fn try_turn(ctx: &AgentContext, text: &str, images: &[String]) -> Result<String> {
    let history = ctx.messages.recent(HISTORY_LIMIT)?;

    let mut messages = vec![ChatMessage::system(system_prompt(&ctx.persona, Utc::now()))];
    for row in &history {
        match row.role {
            MessageRole::User => messages.push(ChatMessage::user(&row.content)),
            MessageRole::Assistant => messages.push(ChatMessage::assistant(&row.content)),
        }
    }
    if images.is_empty() {
        messages.push(ChatMessage::user(text));
    } else {
        messages.push(ChatMessage::user_with_images(text, images));
    }

    ctx.messages.append(&StoredMessage::with_images(
        MessageRole::User,
        text,
        images.to_vec(),
    ))?;

    let tools: Vec<ChatTool> = default_tools().iter().map(ChatTool::from_definition).collect();
    let mut last_text: Option<String> = None;

    for _ in 0..MAX_STEPS {
        let response = ctx
            .chat
            .chat(&ctx.model, messages.clone(), Some(tools.clone()))
            .await?;

        if response.has_tool_calls() {
            let calls = response.tool_calls();
            let chat_calls: Vec<ChatToolCall> =
                calls.iter().map(ChatToolCall::from_tool_call).collect();
            last_text = response.text().map(str::to_string);
            messages.push(ChatMessage::assistant_with_tools(
                last_text.clone(),
                chat_calls,
            ));
            for call in &calls {
                debug!(tool = %call.name, "executing tool");
                let result = execute_tool(ctx, call).await;
                messages.push(ChatMessage::tool(&call.id, result));
            }
            continue;
        }

        let reply = response.text().unwrap_or_default().to_string();
        ctx.messages
            .append(&StoredMessage::new(MessageRole::Assistant, &reply))?;
        return Ok(reply);
    }

    // Step cap reached mid tool loop. Surface whatever the model said last.
    let reply = last_text.unwrap_or_else(|| FALLBACK_REPLY.to_string());
    ctx.messages
        .append(&StoredMessage::new(MessageRole::Assistant, &reply))?;
    Ok(reply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use serde_json::json;
    use tempfile::tempdir;

    use attache_events::EventBus;
    use attache_models::EventKind;
    use attache_persistence::{MessageStore, ReminderStore};

    use crate::client::{ChatChoice, ChatClient, ChatResponse, ChatUsage, ResponseMessage};
    use crate::config::ModelConfig;
    use crate::error::AgentError;

    struct ScriptedChat {
        responses: Mutex<VecDeque<crate::error::Result<ChatResponse>>>,
        seen: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl ScriptedChat {
        fn new(responses: Vec<crate::error::Result<ChatResponse>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatClient for ScriptedChat {
        async fn chat(
            &self,
            _config: &ModelConfig,
            messages: Vec<ChatMessage>,
            _tools: Option<Vec<ChatTool>>,
        ) -> crate::error::Result<ChatResponse> {
            self.seen.lock().unwrap().push(messages);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(AgentError::ModelInvocation("script exhausted".into())))
        }
    }

    fn text_response(text: &str) -> ChatResponse {
        ChatResponse {
            id: "gen-test".into(),
            choices: vec![ChatChoice {
                index: 0,
                message: ResponseMessage {
                    role: "assistant".into(),
                    content: Some(text.to_string()),
                    tool_calls: None,
                },
                finish_reason: Some("stop".into()),
            }],
            usage: None::<ChatUsage>,
        }
    }

    fn tool_response(name: &str, arguments: serde_json::Value) -> ChatResponse {
        ChatResponse {
            id: "gen-test".into(),
            choices: vec![ChatChoice {
                index: 0,
                message: ResponseMessage {
                    role: "assistant".into(),
                    content: None,
                    tool_calls: Some(vec![crate::client::ChatToolCall {
                        id: "call-1".into(),
                        call_type: "function".into(),
                        function: crate::client::ChatToolFunction {
                            name: name.into(),
                            arguments: arguments.to_string(),
                        },
                    }]),
                },
                finish_reason: Some("tool_calls".into()),
            }],
            usage: None,
        }
    }

    fn context(chat: Arc<ScriptedChat>) -> AgentContext {
        let dir = tempdir().unwrap();
        let base = dir.path().to_path_buf();
        std::mem::forget(dir);
        AgentContext::new(
            EventBus::new(),
            Arc::new(ReminderStore::new(base.clone())),
            Arc::new(MessageStore::new(base)),
            chat,
            "http://127.0.0.1:1/search",
        )
    }

    #[tokio::test]
    async fn test_plain_reply_persisted() {
        let chat = Arc::new(ScriptedChat::new(vec![Ok(text_response("Hi Levi!"))]));
        let ctx = context(chat.clone());

        let reply = run_turn(&ctx, "hello", &[], "user-1").await;
        assert_eq!(reply, "Hi Levi!");

        let stored = ctx.messages.recent(10).unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].content, "hello");
        assert_eq!(stored[1].content, "Hi Levi!");

        // System prompt plus the fresh user message.
        let seen = chat.seen.lock().unwrap();
        assert_eq!(seen[0][0].role, "system");
        assert_eq!(seen[0].last().unwrap().role, "user");
    }

    #[tokio::test]
    async fn test_tool_loop_roundtrip() {
        let chat = Arc::new(ScriptedChat::new(vec![
            Ok(tool_response("list_reminders", json!({}))),
            Ok(text_response("You have no reminders.")),
        ]));
        let ctx = context(chat.clone());

        let reply = run_turn(&ctx, "what's on my plate?", &[], "user-1").await;
        assert_eq!(reply, "You have no reminders.");

        // Second request carries the tool result back to the model.
        let seen = chat.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        let tool_msg = seen[1].iter().find(|m| m.role == "tool").unwrap();
        assert_eq!(
            tool_msg.content,
            Some(serde_json::Value::String("No active reminders.".into()))
        );
        assert_eq!(tool_msg.tool_call_id.as_deref(), Some("call-1"));
    }

    #[tokio::test]
    async fn test_model_failure_collapses_to_fallback() {
        let chat = Arc::new(ScriptedChat::new(vec![Err(AgentError::ModelInvocation(
            "boom".into(),
        ))]));
        let ctx = context(chat);
        let (_handle, mut rx) = ctx.bus.subscribe_channel(EventKind::AgentError).unwrap();

        let reply = run_turn(&ctx, "hello", &[], "user-1").await;
        assert_eq!(reply, "I'm having trouble thinking right now. Check the logs.");
        assert!(matches!(rx.try_recv(), Ok(BusEvent::AgentError { .. })));
    }

    #[tokio::test]
    async fn test_history_replayed_in_order() {
        let chat = Arc::new(ScriptedChat::new(vec![Ok(text_response("noted"))]));
        let ctx = context(chat.clone());
        ctx.messages
            .append(&StoredMessage::new(MessageRole::User, "earlier question"))
            .unwrap();
        ctx.messages
            .append(&StoredMessage::new(MessageRole::Assistant, "earlier answer"))
            .unwrap();

        run_turn(&ctx, "follow-up", &[], "user-1").await;

        let seen = chat.seen.lock().unwrap();
        let roles: Vec<&str> = seen[0].iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
    }

    #[tokio::test]
    async fn test_step_cap_stops_tool_loop() {
        let responses = (0..MAX_STEPS)
            .map(|_| Ok(tool_response("list_reminders", json!({}))))
            .collect();
        let chat = Arc::new(ScriptedChat::new(responses));
        let ctx = context(chat.clone());

        let reply = run_turn(&ctx, "loop forever", &[], "user-1").await;
        assert_eq!(reply, "I'm having trouble thinking right now. Check the logs.");
        assert_eq!(chat.seen.lock().unwrap().len(), MAX_STEPS);
    }

    #[tokio::test]
    async fn test_images_forwarded_as_parts() {
        let chat = Arc::new(ScriptedChat::new(vec![Ok(text_response("nice photo"))]));
        let ctx = context(chat.clone());

        run_turn(&ctx, "look", &["aGVsbG8=".to_string()], "user-1").await;

        let seen = chat.seen.lock().unwrap();
        let user_msg = seen[0].last().unwrap();
        assert!(user_msg.content.as_ref().unwrap().is_array());

        let stored = ctx.messages.recent(10).unwrap();
        assert_eq!(stored[0].images.len(), 1);
    }
}
