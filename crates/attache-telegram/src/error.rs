//! Error types for the Telegram bot.

use thiserror::Error;

/// Errors that can occur in the Telegram bot.
#[derive(Debug, Error)]
pub enum TelegramError {
    /// Bot token not provided or invalid.
    #[error("Telegram bot token not set. Set TELEGRAM_BOT_TOKEN environment variable.")]
    NoToken,

    /// Telegram API call failed.
    #[error("Telegram API error: {0}")]
    Api(String),

    /// Media could not be downloaded.
    #[error("Failed to download media: {0}")]
    MediaDownload(String),

    /// Event bus error.
    #[error("Event bus error: {0}")]
    Bus(String),

    /// Persistence error.
    #[error("Persistence error: {0}")]
    Persistence(#[from] attache_persistence::PersistenceError),
}

/// Result type for Telegram operations.
pub type Result<T> = std::result::Result<T, TelegramError>;

impl From<teloxide::RequestError> for TelegramError {
    fn from(e: teloxide::RequestError) -> Self {
        TelegramError::Api(e.to_string())
    }
}

impl From<reqwest::Error> for TelegramError {
    fn from(e: reqwest::Error) -> Self {
        TelegramError::MediaDownload(e.to_string())
    }
}

impl From<attache_events::EventError> for TelegramError {
    fn from(e: attache_events::EventError) -> Self {
        TelegramError::Bus(e.to_string())
    }
}
