//! OpenRouter API client for chat completions with tool calling.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, trace};

use crate::config::ModelConfig;
use crate::error::{AgentError, Result};
use crate::tool::{ToolCall, ToolDefinition};

/// Environment variable for the OpenRouter API key.
pub const OPENROUTER_API_KEY_ENV: &str = "OPENROUTER_API_KEY";

const OPENROUTER_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// The seam the reasoning loop talks through. Production uses
/// [`OpenRouterClient`]; tests substitute scripted implementations.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn chat(
        &self,
        config: &ModelConfig,
        messages: Vec<ChatMessage>,
        tools: Option<Vec<ChatTool>>,
    ) -> Result<ChatResponse>;
}

/// OpenRouter chat completions client.
#[derive(Clone)]
pub struct OpenRouterClient {
    client: reqwest::Client,
    api_key: String,
}

impl OpenRouterClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
        }
    }

    /// Creates a client from `OPENROUTER_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var(OPENROUTER_API_KEY_ENV).map_err(|_| {
            AgentError::Configuration(format!(
                "Missing {} environment variable",
                OPENROUTER_API_KEY_ENV
            ))
        })?;
        Ok(Self::new(api_key))
    }
}

#[async_trait]
impl ChatClient for OpenRouterClient {
    async fn chat(
        &self,
        config: &ModelConfig,
        messages: Vec<ChatMessage>,
        tools: Option<Vec<ChatTool>>,
    ) -> Result<ChatResponse> {
        let request = ChatRequest {
            model: config.model.clone(),
            messages,
            tools,
            max_tokens: Some(config.max_tokens),
            temperature: Some(config.temperature),
        };

        trace!("sending chat request: {:?}", request);

        let response = self
            .client
            .post(OPENROUTER_API_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| AgentError::ModelInvocation(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AgentError::ModelInvocation(format!(
                "OpenRouter API error {}: {}",
                status, text
            )));
        }

        let response: ChatResponse = response
            .json()
            .await
            .map_err(|e| AgentError::ResponseParse(format!("Failed to parse response: {}", e)))?;

        debug!(
            tokens = response.usage.as_ref().map_or(0, |u| u.total_tokens),
            "chat response received"
        );

        Ok(response)
    }
}

/// Chat completion request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ChatTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// A message in the chat conversation.
///
/// `content` is either a plain string or an array of multimodal parts, which
/// is why it is carried as a raw JSON value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ChatToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::plain("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain("user", content)
    }

    /// User message carrying text plus base64-encoded JPEG images.
    pub fn user_with_images(content: impl Into<String>, images: &[String]) -> Self {
        let mut parts = vec![json!({ "type": "text", "text": content.into() })];
        for image in images {
            parts.push(json!({
                "type": "image_url",
                "image_url": { "url": format!("data:image/jpeg;base64,{}", image) },
            }));
        }
        Self {
            role: "user".to_string(),
            content: Some(Value::Array(parts)),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain("assistant", content)
    }

    pub fn assistant_with_tools(content: Option<String>, tool_calls: Vec<ChatToolCall>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.map(Value::String),
            tool_calls: Some(tool_calls),
            tool_call_id: None,
        }
    }

    /// Tool result message tied back to the call that produced it.
    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: "tool".to_string(),
            content: Some(Value::String(content.into())),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    fn plain(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: Some(Value::String(content.into())),
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

/// Tool call in a chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub call_type: String,
    pub function: ChatToolFunction,
}

impl ChatToolCall {
    pub fn from_tool_call(call: &ToolCall) -> Self {
        Self {
            id: call.id.clone(),
            call_type: "function".to_string(),
            function: ChatToolFunction {
                name: call.name.clone(),
                arguments: serde_json::to_string(&call.arguments).unwrap_or_default(),
            },
        }
    }

    pub fn to_tool_call(&self) -> Result<ToolCall> {
        let arguments: Value = serde_json::from_str(&self.function.arguments).map_err(|e| {
            AgentError::ResponseParse(format!("Invalid tool arguments JSON: {}", e))
        })?;
        Ok(ToolCall::with_id(&self.id, &self.function.name, arguments))
    }
}

/// Function details in a tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatToolFunction {
    pub name: String,
    /// JSON-encoded arguments.
    pub arguments: String,
}

/// Tool definition for the API.
#[derive(Debug, Clone, Serialize)]
pub struct ChatTool {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: ChatToolDefinition,
}

impl ChatTool {
    pub fn from_definition(def: &ToolDefinition) -> Self {
        Self {
            tool_type: "function".to_string(),
            function: ChatToolDefinition {
                name: def.name.clone(),
                description: def.description.clone(),
                parameters: def.parameters.clone(),
            },
        }
    }
}

/// Function definition in a tool.
#[derive(Debug, Clone, Serialize)]
pub struct ChatToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema for parameters.
    pub parameters: Value,
}

/// Chat completion response.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub id: String,
    pub choices: Vec<ChatChoice>,
    pub usage: Option<ChatUsage>,
}

impl ChatResponse {
    pub fn message(&self) -> Option<&ResponseMessage> {
        self.choices.first().map(|c| &c.message)
    }

    /// The assistant's text, if the first choice carries any.
    pub fn text(&self) -> Option<&str> {
        self.message().and_then(|m| m.content.as_deref())
    }

    pub fn has_tool_calls(&self) -> bool {
        self.choices
            .first()
            .is_some_and(|c| c.message.tool_calls.is_some())
    }

    pub fn tool_calls(&self) -> Vec<ToolCall> {
        self.choices
            .first()
            .and_then(|c| c.message.tool_calls.as_ref())
            .map_or(Vec::new(), |calls| {
                calls.iter().filter_map(|c| c.to_tool_call().ok()).collect()
            })
    }
}

/// A choice in the completion response.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub index: u32,
    pub message: ResponseMessage,
    pub finish_reason: Option<String>,
}

/// Message in a completion response.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseMessage {
    pub role: String,
    pub content: Option<String>,
    pub tool_calls: Option<Vec<ChatToolCall>>,
}

/// Token usage information.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}
