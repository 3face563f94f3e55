//! Debounced inbound message buffering.
//!
//! Telegram users often send a thought as several short messages in quick
//! succession. Each piece restarts a per-chat timer; once the chat goes
//! quiet the pieces are joined and published as a single
//! [`InboundMessage`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use attache_events::EventBus;
use attache_models::{BusEvent, InboundMessage};

use crate::error::{Result, TelegramError};

/// How long a chat must stay quiet before its buffer is flushed.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_secs(4);

/// Stand-in text when a flush carries images but no words.
const MEDIA_ONLY_TEXT: &str = "(User sent media)";

#[derive(Default)]
struct Buffer {
    pieces: Vec<String>,
    images: Vec<String>,
    user_id: String,
    /// Bumped on every push; a flush task only fires if no newer push
    /// superseded it.
    generation: u64,
}

/// Per-chat debounce buffer feeding the event bus.
#[derive(Clone)]
pub struct DebounceInbox {
    bus: EventBus,
    window: Duration,
    buffers: Arc<Mutex<HashMap<i64, Buffer>>>,
}

impl DebounceInbox {
    pub fn new(bus: EventBus) -> Self {
        Self::with_window(bus, DEBOUNCE_WINDOW)
    }

    pub fn with_window(bus: EventBus, window: Duration) -> Self {
        Self {
            bus,
            window,
            buffers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Buffers one message piece and restarts the chat's flush timer.
    pub fn push(
        &self,
        chat_id: i64,
        user_id: &str,
        text: Option<String>,
        images: Vec<String>,
    ) -> Result<()> {
        let generation = {
            let mut buffers = self
                .buffers
                .lock()
                .map_err(|e| TelegramError::Bus(e.to_string()))?;
            let buffer = buffers.entry(chat_id).or_default();
            if let Some(text) = text.filter(|t| !t.trim().is_empty()) {
                buffer.pieces.push(text);
            }
            buffer.images.extend(images);
            buffer.user_id = user_id.to_string();
            buffer.generation += 1;
            buffer.generation
        };

        let inbox = self.clone();
        tokio::spawn(async move {
            sleep(inbox.window).await;
            if let Err(error) = inbox.flush_if_current(chat_id, generation) {
                warn!(%error, chat_id, "failed to flush debounced messages");
            }
        });

        Ok(())
    }

    /// Drops everything buffered for a chat without publishing.
    pub fn clear(&self, chat_id: i64) -> Result<()> {
        let mut buffers = self
            .buffers
            .lock()
            .map_err(|e| TelegramError::Bus(e.to_string()))?;
        buffers.remove(&chat_id);
        Ok(())
    }

    fn flush_if_current(&self, chat_id: i64, generation: u64) -> Result<()> {
        let buffer = {
            let mut buffers = self
                .buffers
                .lock()
                .map_err(|e| TelegramError::Bus(e.to_string()))?;
            let current = buffers
                .get(&chat_id)
                .is_some_and(|buffer| buffer.generation == generation);
            if !current {
                return Ok(());
            }
            buffers.remove(&chat_id)
        };

        let Some(buffer) = buffer else {
            return Ok(());
        };
        if buffer.pieces.is_empty() && buffer.images.is_empty() {
            return Ok(());
        }

        let text = if buffer.pieces.is_empty() {
            MEDIA_ONLY_TEXT.to_string()
        } else {
            buffer.pieces.join("\n\n")
        };

        debug!(chat_id, pieces = buffer.pieces.len(), images = buffer.images.len(), "flushing chat buffer");
        self.bus.publish(BusEvent::MessageReceived(InboundMessage {
            text,
            images: buffer.images,
            chat_id,
            user_id: buffer.user_id,
        }))?;
        Ok(())
    }
}
