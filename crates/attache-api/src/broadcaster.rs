//! Bridges bus node-log events onto a broadcast channel for WebSocket fans.

use tokio::sync::broadcast;

use attache_events::{EventBus, SubscriptionHandle};
use attache_models::{BusEvent, EventKind, NodeLogEvent};

const CHANNEL_CAPACITY: usize = 256;

/// Fans bus `NodeLog` events out to every connected visualization client.
///
/// Slow receivers lag and drop records rather than backpressuring the bus;
/// the visualization stream is best-effort.
#[derive(Clone)]
pub struct NodeLogBroadcaster {
    tx: broadcast::Sender<NodeLogEvent>,
}

impl Default for NodeLogBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeLogBroadcaster {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Subscribes to the bus and forwards every node log, stamped into its
    /// wire form. Keep the returned handle alive for as long as forwarding
    /// should continue.
    pub fn attach(&self, bus: &EventBus) -> attache_events::Result<SubscriptionHandle> {
        let tx = self.tx.clone();
        bus.subscribe(EventKind::NodeLog, move |event| {
            if let BusEvent::NodeLog(log) = event {
                let _ = tx.send(NodeLogEvent::from_log(log));
            }
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NodeLogEvent> {
        self.tx.subscribe()
    }

    /// Publishes one wire record directly, bypassing the bus.
    pub fn send(&self, event: NodeLogEvent) {
        let _ = self.tx.send(event);
    }
}
