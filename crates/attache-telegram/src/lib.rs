//! Telegram front end.
//!
//! Bridges one authorized Telegram chat onto the event bus: inbound messages
//! are debounced and published as [`attache_models::InboundMessage`]s,
//! approval requests come back as inline-keyboard prompts, and replies are
//! rewritten into Telegram's HTML subset before sending.

pub mod bot;
pub mod debounce;
pub mod error;
pub mod handlers;
pub mod html;

pub use bot::TelegramBot;
pub use debounce::{DebounceInbox, DEBOUNCE_WINDOW};
pub use error::{Result, TelegramError};
pub use handlers::Command;
pub use html::sanitize_html;
