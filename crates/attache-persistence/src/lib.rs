//! Atomic JSON-file persistence for Attache.
//!
//! Reminders and chat history are stored as one JSON file per row. Writes go
//! through a temp-file-then-rename path so a crash never leaves a partially
//! written file behind.

pub mod atomic;
pub mod error;
pub mod message_store;
pub mod reminder_store;

pub use error::{PersistenceError, Result};
pub use message_store::MessageStore;
pub use reminder_store::ReminderStore;
