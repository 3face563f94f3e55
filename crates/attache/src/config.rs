//! Application configuration from environment variables.

use std::path::PathBuf;

use crate::error::{AppError, Result};

const DEFAULT_HUB_URL: &str = "http://localhost:8000/search";
const DEFAULT_API_PORT: u16 = 3001;

/// Everything the process needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `TELEGRAM_BOT_TOKEN`.
    pub telegram_token: String,
    /// `TELEGRAM_CHAT_ID`, the single authorized chat.
    pub telegram_chat_id: i64,
    /// `ATTACHE_MODEL` override for the lead agent model.
    pub model: Option<String>,
    /// `ATTACHE_CHILD_MODEL` override for swarm sub-agents.
    pub child_model: Option<String>,
    /// `AGENTHUB_URL`, the agent-hub search endpoint.
    pub hub_url: String,
    /// `ATTACHE_STATE_DIR`, defaults to the platform data directory.
    pub state_dir: PathBuf,
    /// `ATTACHE_API_PORT` for the HTTP control surface.
    pub api_port: u16,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let telegram_token = require("TELEGRAM_BOT_TOKEN")?;
        let telegram_chat_id = require("TELEGRAM_CHAT_ID")?
            .parse()
            .map_err(|_| AppError::Config("TELEGRAM_CHAT_ID must be an integer".into()))?;

        let api_port = match std::env::var("ATTACHE_API_PORT") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| AppError::Config("ATTACHE_API_PORT must be a port number".into()))?,
            Err(_) => DEFAULT_API_PORT,
        };

        Ok(Self {
            telegram_token,
            telegram_chat_id,
            model: std::env::var("ATTACHE_MODEL").ok(),
            child_model: std::env::var("ATTACHE_CHILD_MODEL").ok(),
            hub_url: std::env::var("AGENTHUB_URL").unwrap_or_else(|_| DEFAULT_HUB_URL.into()),
            state_dir: state_dir(),
            api_port,
        })
    }
}

fn require(name: &str) -> Result<String> {
    std::env::var(name)
        .ok()
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::Config(format!("Missing {name} environment variable")))
}

fn state_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("ATTACHE_STATE_DIR") {
        return PathBuf::from(dir);
    }
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("attache")
}

/// Default tracing filter per verbosity level.
pub fn log_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "attache=info,teloxide=warn",
        1 => "attache=debug,teloxide=warn",
        _ => "attache=trace,teloxide=info",
    }
}
