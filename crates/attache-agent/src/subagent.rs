//! LLM-backed sub-agent runner for swarm dispatch.

use async_trait::async_trait;
use tracing::{debug, info};

use attache_models::SwarmTask;
use attache_swarm::{SubAgentRunner, SwarmError};

use crate::client::{ChatMessage, ChatTool, ChatToolCall};
use crate::context::AgentContext;
use crate::error::Result;
use crate::tools::{child_tools, execute_child_tool};

/// Sub-agents get a tighter loop than the main agent.
pub const SUB_AGENT_MAX_STEPS: usize = 5;

/// Runs each swarm task as a bounded reasoning loop on the child model,
/// with the recursion-safe child tool set.
pub struct LlmSubAgentRunner {
    ctx: AgentContext,
}

impl LlmSubAgentRunner {
    pub fn new(ctx: AgentContext) -> Self {
        Self { ctx }
    }

    fn system_prompt(&self, task: &SwarmTask) -> String {
        format!(
            "You are a sub-agent working for {persona} (the lead agent).\n\
             Your ID is: #{id}.\n\n\
             INSTRUCTIONS:\n\
             {instruction}\n\n\
             CONTEXT:\n\
             - You have access to tools. Use them to fetch real data.\n\
             - Be concise. Report ONLY the facts found.\n\
             - Do not ask the user for clarification; you are running in a background process.\n\
             - If you fail, report \"FAILED: [Reason]\".",
            persona = self.ctx.persona,
            id = task.agent_number(),
            instruction = task.shared_instruction,
        )
    }

    async fn run_loop(&self, task: &SwarmTask) -> Result<String> {
        let mut messages = vec![
            ChatMessage::system(self.system_prompt(task)),
            ChatMessage::user(&task.prompt),
        ];
        let tools: Vec<ChatTool> = child_tools().iter().map(ChatTool::from_definition).collect();
        let mut last_text: Option<String> = None;

        for _ in 0..SUB_AGENT_MAX_STEPS {
            let response = self
                .ctx
                .chat
                .chat(&self.ctx.child_model, messages.clone(), Some(tools.clone()))
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
                    debug!(agent = task.agent_number(), tool = %call.name, "sub-agent tool");
                    let result = execute_child_tool(&self.ctx, call).await;
                    messages.push(ChatMessage::tool(&call.id, result));
                }
                continue;
            }

            return Ok(response.text().unwrap_or_default().to_string());
        }

        Ok(last_text.unwrap_or_else(|| "FAILED: step limit reached".to_string()))
    }
}

#[async_trait]
impl SubAgentRunner for LlmSubAgentRunner {
    async fn run(&self, task: &SwarmTask) -> std::result::Result<String, SwarmError> {
        info!(agent = task.agent_number(), "sub-agent started");
        let report = self
            .run_loop(task)
            .await
            .map_err(|e| SwarmError::Agent(e.to_string()))?;
        info!(agent = task.agent_number(), "sub-agent finished");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use tempfile::tempdir;

    use attache_events::EventBus;
    use attache_persistence::{MessageStore, ReminderStore};

    use crate::client::{ChatChoice, ChatClient, ChatResponse, ResponseMessage};
    use crate::config::ModelConfig;
    use crate::error::AgentError;

    struct ScriptedChat(Mutex<VecDeque<Result<ChatResponse>>>);

    #[async_trait]
    impl ChatClient for ScriptedChat {
        async fn chat(
            &self,
            _config: &ModelConfig,
            _messages: Vec<ChatMessage>,
            _tools: Option<Vec<ChatTool>>,
        ) -> Result<ChatResponse> {
            self.0
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
            usage: None,
        }
    }

    fn context(responses: Vec<Result<ChatResponse>>) -> AgentContext {
        let dir = tempdir().unwrap();
        let base = dir.path().to_path_buf();
        std::mem::forget(dir);
        AgentContext::new(
            EventBus::new(),
            Arc::new(ReminderStore::new(base.clone())),
            Arc::new(MessageStore::new(base)),
            Arc::new(ScriptedChat(Mutex::new(responses.into()))),
            "http://127.0.0.1:1/search",
        )
    }

    fn task(prompt: &str) -> SwarmTask {
        SwarmTask {
            index: 0,
            prompt: prompt.to_string(),
            shared_instruction: "Report facts only.".to_string(),
        }
    }

    #[tokio::test]
    async fn test_sub_agent_returns_text() {
        let ctx = context(vec![Ok(text_response("42 results found"))]);
        let runner = LlmSubAgentRunner::new(ctx);

        let report = runner.run(&task("count results")).await.unwrap();
        assert_eq!(report, "42 results found");
    }

    #[tokio::test]
    async fn test_sub_agent_failure_becomes_swarm_error() {
        let ctx = context(vec![Err(AgentError::ModelInvocation("rate limited".into()))]);
        let runner = LlmSubAgentRunner::new(ctx);

        let err = runner.run(&task("anything")).await.unwrap_err();
        assert!(matches!(err, SwarmError::Agent(_)));
        assert!(err.to_string().contains("rate limited"));
    }
}
