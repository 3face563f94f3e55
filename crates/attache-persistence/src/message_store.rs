//! Chat-history persistence.

use std::fs;
use std::path::PathBuf;

use tracing::warn;

use attache_models::StoredMessage;

use crate::atomic::{atomic_write_json, read_json};
use crate::error::{PersistenceError, Result};

/// Manages the rolling conversation history.
///
/// One JSON file per message under `base_path/messages/`. File names carry
/// the creation timestamp so no index file is needed; ordering is
/// reconstructed from the rows themselves.
pub struct MessageStore {
    base_path: PathBuf,
}

impl MessageStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn dir(&self) -> PathBuf {
        self.base_path.join("messages")
    }

    fn path(&self, message: &StoredMessage) -> PathBuf {
        self.dir().join(format!(
            "{}-{}.json",
            message.created_at.timestamp_millis(),
            message.id
        ))
    }

    /// Appends one message to the history.
    pub fn append(&self, message: &StoredMessage) -> Result<()> {
        atomic_write_json(&self.path(message), message)
    }

    fn load_all(&self) -> Result<Vec<StoredMessage>> {
        let dir = self.dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut messages = Vec::new();
        let entries = fs::read_dir(&dir).map_err(|source| PersistenceError::ReadError {
            path: dir.clone(),
            source,
        })?;

        for entry in entries {
            let entry = entry.map_err(|source| PersistenceError::ReadError {
                path: dir.clone(),
                source,
            })?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                match read_json::<StoredMessage>(&path) {
                    Ok(message) => messages.push(message),
                    Err(e) => warn!(path = %path.display(), error = %e, "skipping corrupt message"),
                }
            }
        }

        messages.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(messages)
    }

    /// Returns the most recent `limit` messages in ascending (oldest-first)
    /// order, ready to replay as conversation context.
    pub fn recent(&self, limit: usize) -> Result<Vec<StoredMessage>> {
        let mut messages = self.load_all()?;
        if messages.len() > limit {
            messages.drain(..messages.len() - limit);
        }
        Ok(messages)
    }

    /// Wipes the entire history.
    pub fn clear(&self) -> Result<()> {
        let dir = self.dir();
        if dir.exists() {
            fs::remove_dir_all(&dir)
                .map_err(|source| PersistenceError::WriteError { path: dir, source })?;
        }
        Ok(())
    }
}
