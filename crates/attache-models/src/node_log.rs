//! Wire form of node-log records pushed over the visualization WebSocket.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::event::NodeLog;

/// Immutable wire record for one network hop.
///
/// Serialized as JSON and broadcast to every connected visualization client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeLogEvent {
    pub id: Uuid,
    /// RFC 3339 timestamp of the hop.
    pub timestamp: String,
    pub source: String,
    pub target: String,
    pub action: String,
    pub payload: Value,
}

impl NodeLogEvent {
    /// Stamps a bus-level [`NodeLog`] into its wire form.
    ///
    /// A fresh id is minted per record; the emitter's timestamp is kept when
    /// present, otherwise the record is stamped with the current time.
    pub fn from_log(log: &NodeLog) -> Self {
        let timestamp = log
            .timestamp
            .unwrap_or_else(Utc::now)
            .to_rfc3339();
        Self {
            id: Uuid::new_v4(),
            timestamp,
            source: log.source.clone(),
            target: log.target.clone(),
            action: log.action.clone(),
            payload: log.payload.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_log_mints_id_and_timestamp() {
        let log = NodeLog::new("LocalAgent", "AgentHub", "search_hub", json!({"q": 1}));
        let a = NodeLogEvent::from_log(&log);
        let b = NodeLogEvent::from_log(&log);

        assert_ne!(a.id, b.id);
        assert_eq!(a.action, "search_hub");
        assert!(a.timestamp.contains('T'));
    }

    #[test]
    fn test_from_log_keeps_emitter_timestamp() {
        let at = "2026-01-02T03:04:05Z".parse().unwrap();
        let mut log = NodeLog::new("a", "b", "ping", json!({}));
        log.timestamp = Some(at);

        let event = NodeLogEvent::from_log(&log);
        assert!(event.timestamp.starts_with("2026-01-02T03:04:05"));
    }
}
