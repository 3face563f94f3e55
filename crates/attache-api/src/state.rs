//! Shared application state for the HTTP surface.

use std::sync::Arc;

use tokio::sync::RwLock;

use attache_agent::ChatClient;
use attache_events::{EventBus, SubscriptionHandle};

use crate::broadcaster::NodeLogBroadcaster;
use crate::config::ApiConfig;
use crate::error::{ApiError, Result};
use crate::session::HubSession;

/// State cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ApiConfig>,
    pub bus: EventBus,
    pub session: Arc<RwLock<HubSession>>,
    /// Optional LLM used for structured intent parsing; handlers fall back
    /// to keyword heuristics when absent or failing.
    pub chat: Option<Arc<dyn ChatClient>>,
    pub http: reqwest::Client,
    pub broadcaster: NodeLogBroadcaster,
    /// Bus subscription that forwards node logs into the broadcaster. Held
    /// so forwarding lasts for the lifetime of the state.
    _forward: Arc<SubscriptionHandle>,
}

impl AppState {
    pub fn new(config: ApiConfig, bus: EventBus, chat: Option<Arc<dyn ChatClient>>) -> Result<Self> {
        let broadcaster = NodeLogBroadcaster::new();
        let forward = broadcaster
            .attach(&bus)
            .map_err(|e| ApiError::Internal(e.to_string()))?;
        Ok(Self {
            config: Arc::new(config),
            bus,
            session: Arc::new(RwLock::new(HubSession::default())),
            chat,
            http: reqwest::Client::new(),
            broadcaster,
            _forward: Arc::new(forward),
        })
    }
}
