//! Route handlers for the control surface.

mod agents;
mod dev;
mod intent;
mod ws;

pub use agents::{connect, execute, manifest, select};
pub use dev::{emit_node_log, simulate_orchestration};
pub use intent::parse_intent;
pub use ws::node_log_stream;

use attache_models::{BusEvent, NodeLog};

use crate::error::{ApiError, Result};
use crate::state::AppState;

/// Publishes one node-log hop onto the bus, where the broadcaster picks it
/// up for connected WebSocket clients.
pub(crate) fn publish_log(state: &AppState, log: NodeLog) -> Result<()> {
    state
        .bus
        .publish(BusEvent::NodeLog(log))
        .map_err(|e| ApiError::Internal(e.to_string()))
}
