//! Top-level application errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Agent(#[from] attache_agent::AgentError),

    #[error(transparent)]
    Api(#[from] attache_api::ApiError),

    #[error(transparent)]
    Events(#[from] attache_events::EventError),

    #[error(transparent)]
    Telegram(#[from] attache_telegram::TelegramError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
