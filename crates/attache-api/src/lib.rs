//! HTTP control surface and node-log WebSocket stream.
//!
//! Exposes the orchestration demo flow (intent parsing, manifest scan,
//! selection, connection, execution), a pair of developer endpoints for
//! scripting the visualization, and a WebSocket that fans out node logs to
//! connected clients.

pub mod broadcaster;
pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
pub mod session;
pub mod state;

pub use broadcaster::NodeLogBroadcaster;
pub use config::ApiConfig;
pub use error::{ApiError, Result};
pub use router::{create_router, serve};
pub use session::{HubAgent, HubSession};
pub use state::AppState;
