//! EventBus - thread-safe typed pub/sub.
//!
//! Key concurrency patterns:
//! - `Arc<RwLock<HashMap>>` for the per-kind subscriber lists (reads on every
//!   publish, writes only on subscribe/unsubscribe)
//! - subscriber `Arc`s are cloned out of the lock before delivery, so a
//!   handler may publish or subscribe without deadlocking
//! - `mpsc` channels bridge the synchronous bus into async consumers

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use tokio::sync::mpsc;
use tracing::error;

use attache_models::{BusEvent, EventKind};

use crate::error::{EventError, Result};

type Handler = Box<dyn Fn(&BusEvent) + Send + Sync>;

struct Subscription {
    id: u64,
    handler: Handler,
}

/// Opaque token identifying one subscription; pass back to
/// [`EventBus::unsubscribe`] to stop delivery.
#[derive(Debug, Clone)]
pub struct SubscriptionHandle {
    kind: EventKind,
    id: u64,
}

/// Process-wide typed pub/sub hub.
///
/// Delivery is synchronous and in subscription order per kind. There is no
/// buffering: subscribers registered after a publish never see it. A
/// panicking subscriber is isolated and logged; later subscribers still
/// receive the event.
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Arc<RwLock<HashMap<EventKind, Vec<Arc<Subscription>>>>>,
    next_id: Arc<AtomicU64>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for one event kind.
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> Result<SubscriptionHandle>
    where
        F: Fn(&BusEvent) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut subs = self
            .subscribers
            .write()
            .map_err(|e| EventError::LockPoisoned(e.to_string()))?;
        subs.entry(kind).or_default().push(Arc::new(Subscription {
            id,
            handler: Box::new(handler),
        }));
        Ok(SubscriptionHandle { kind, id })
    }

    /// Bridges one event kind into an async consumer.
    ///
    /// Returns the subscription handle together with an unbounded receiver
    /// that gets a clone of every matching event.
    pub fn subscribe_channel(
        &self,
        kind: EventKind,
    ) -> Result<(SubscriptionHandle, mpsc::UnboundedReceiver<BusEvent>)> {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = self.subscribe(kind, move |event| {
            // Best effort: a dropped receiver just stops caring.
            let _ = tx.send(event.clone());
        })?;
        Ok((handle, rx))
    }

    /// Removes a subscription. Removing an already-removed handle is a no-op.
    pub fn unsubscribe(&self, handle: &SubscriptionHandle) {
        if let Ok(mut subs) = self.subscribers.write() {
            if let Some(list) = subs.get_mut(&handle.kind) {
                list.retain(|s| s.id != handle.id);
            }
        }
    }

    /// Publishes an event to every subscriber of its kind, in subscription
    /// order. Fire-and-forget: the publisher learns nothing about handlers.
    pub fn publish(&self, event: BusEvent) -> Result<()> {
        let targets: Vec<Arc<Subscription>> = {
            let subs = self
                .subscribers
                .read()
                .map_err(|e| EventError::LockPoisoned(e.to_string()))?;
            subs.get(&event.kind()).cloned().unwrap_or_default()
        };

        for sub in targets {
            // Isolate panicking subscribers so the rest still get the event.
            let outcome = catch_unwind(AssertUnwindSafe(|| (sub.handler)(&event)));
            if outcome.is_err() {
                error!(kind = ?event.kind(), subscription = sub.id, "subscriber panicked");
            }
        }

        Ok(())
    }

    /// Number of live subscriptions for a kind.
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.subscribers
            .read()
            .ok()
            .and_then(|subs| subs.get(&kind).map(|l| l.len()))
            .unwrap_or(0)
    }
}
