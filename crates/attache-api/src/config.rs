//! API server configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the HTTP control surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Agent-hub search endpoint, e.g. `http://localhost:8000/search`.
    pub hub_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
            hub_url: "http://localhost:8000/search".to_string(),
        }
    }
}

impl ApiConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Base URL of the agent network, derived by stripping the `/search`
    /// suffix off the hub URL.
    pub fn network_base(&self) -> String {
        self.hub_url
            .trim_end_matches('/')
            .trim_end_matches("/search")
            .trim_end_matches('/')
            .to_string()
    }
}
