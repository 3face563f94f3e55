//! Human-in-the-loop approval gate.
//!
//! An agent asking for permission publishes an `ApprovalRequested` event and
//! waits for a matching `ApprovalDecision` on the bus. The chat transport
//! owns the other half: it renders the request and publishes the decision.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{debug, warn};
use uuid::Uuid;

use attache_models::{ApprovalDecision, ApprovalRequest, BusEvent, EventKind};

use crate::bus::EventBus;
use crate::error::Result;

/// Default time a request waits before resolving to deny.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// One-shot rendezvous between a requesting agent and a deciding human.
///
/// Any number of requests may be outstanding concurrently; decisions are
/// matched by request id. Duplicate and unknown decisions are no-ops.
#[derive(Clone)]
pub struct ApprovalGate {
    bus: EventBus,
    timeout: Duration,
}

impl ApprovalGate {
    pub fn new(bus: EventBus) -> Self {
        Self {
            bus,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Overrides the deny-timeout (tests use short windows).
    pub fn with_timeout(bus: EventBus, timeout: Duration) -> Self {
        Self { bus, timeout }
    }

    /// Asks for approval and waits for the decision.
    ///
    /// Resolves `false` on timeout or any internal failure; this never
    /// returns an error, so a forgotten approval can only deny, not crash.
    pub async fn request(&self, description: &str) -> bool {
        let request = ApprovalRequest::new(description);
        let request_id = request.id;

        let (tx, rx) = oneshot::channel();
        // First matching decision wins the slot; duplicates find it empty.
        let slot: Arc<Mutex<Option<oneshot::Sender<bool>>>> = Arc::new(Mutex::new(Some(tx)));

        let decision_slot = Arc::clone(&slot);
        let handle = match self.bus.subscribe(EventKind::ApprovalDecision, move |event| {
            if let BusEvent::ApprovalDecision(decision) = event {
                if decision.id != request_id {
                    return;
                }
                if let Ok(mut guard) = decision_slot.lock() {
                    if let Some(tx) = guard.take() {
                        let _ = tx.send(decision.approved);
                    }
                }
            }
        }) {
            Ok(handle) => handle,
            Err(e) => {
                warn!(error = %e, "approval subscription failed, denying");
                return false;
            }
        };

        if let Err(e) = self.bus.publish(BusEvent::ApprovalRequested(request)) {
            warn!(error = %e, "approval publish failed, denying");
            self.bus.unsubscribe(&handle);
            return false;
        }

        debug!(id = %request_id, description, "waiting for approval");

        let approved = match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(approved)) => approved,
            // Timeout, or the subscription was torn down under us.
            _ => false,
        };

        self.bus.unsubscribe(&handle);
        debug!(id = %request_id, approved, "approval resolved");
        approved
    }

    /// Publishes a decision for a pending request.
    pub fn decide(&self, id: Uuid, approved: bool) -> Result<()> {
        self.bus
            .publish(BusEvent::ApprovalDecision(ApprovalDecision { id, approved }))
    }
}
