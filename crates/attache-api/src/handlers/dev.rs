//! Developer endpoints for exercising the visualization stream.

use std::time::Duration;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use attache_models::{NodeLog, NodeLogEvent};

use crate::error::{ApiError, Result};
use crate::state::AppState;

use super::agents::new_session_id;
use super::publish_log;

/// Gap between scripted orchestration events.
const SIMULATION_SPACING: Duration = Duration::from_millis(900);

#[derive(Debug, Default, Deserialize)]
pub struct EmitNodeLogRequest {
    pub source: Option<String>,
    pub target: Option<String>,
    pub action: Option<String>,
    pub payload: Option<Value>,
}

/// `POST /api/dev/emit-node-log`
///
/// Publishes a single hand-crafted node log. Only `action` is required.
pub async fn emit_node_log(
    State(state): State<AppState>,
    body: Option<Json<EmitNodeLogRequest>>,
) -> Result<Json<Value>> {
    let Json(body) = body.unwrap_or_default();

    let action = body
        .action
        .filter(|action| !action.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing required field: action".into()))?;

    let log = NodeLog::new(
        body.source.as_deref().unwrap_or("DevTerminal"),
        body.target.as_deref().unwrap_or("Frontend"),
        &action,
        body.payload.unwrap_or_else(|| json!({})),
    );
    let emitted = NodeLogEvent::from_log(&log);
    publish_log(&state, log)?;

    Ok(Json(json!({ "ok": true, "emitted": emitted })))
}

#[derive(Debug, Default, Deserialize)]
pub struct SimulateRequest {
    pub intent: Option<String>,
    pub capabilities: Option<Vec<String>>,
    pub agent_id: Option<String>,
    pub url: Option<String>,
}

/// `POST /api/dev/simulate-orchestration`
///
/// Replays the full hub-search and dispatch sequence as scripted node logs,
/// spaced out so the visualization animates the way a live run would.
pub async fn simulate_orchestration(
    State(state): State<AppState>,
    body: Option<Json<SimulateRequest>>,
) -> Result<Json<Value>> {
    let Json(body) = body.unwrap_or_default();

    let intent = body
        .intent
        .unwrap_or_else(|| "book me a flight from berlin to london".to_string());
    let capabilities = body
        .capabilities
        .unwrap_or_else(|| vec!["travel".to_string(), "booking".to_string()]);
    let agent_id = body
        .agent_id
        .unwrap_or_else(|| "agent_flight_travel".to_string());
    let url = body
        .url
        .unwrap_or_else(|| "http://localhost:8000/flight/run".to_string());
    let session_id = new_session_id();

    let sequence = vec![
        NodeLog::new(
            "Attache",
            "AgentHub",
            "search_hub",
            json!({ "intent": &intent, "capabilities": &capabilities }),
        ),
        NodeLog::new(
            "AgentHub",
            "Attache",
            "search_hub_result",
            json!({
                "results_count": 1,
                "matches": [&agent_id],
                "matches_detail": [{
                    "agent_id": &agent_id,
                    "confidence": 0.93,
                    "capabilities": ["flight_search", "travel_planning"],
                    "description": "Finds and explains flight options from a local dataset.",
                    "tags": ["travel", "flights"],
                    "reasoning": "High travel intent match.",
                }],
            }),
        ),
        NodeLog::new(
            "Attache",
            &agent_id,
            "netagent_request",
            json!({
                "session_id": &session_id,
                "url": &url,
                "prompt": "Find best options and explain tradeoffs.",
            }),
        ),
        NodeLog::new(
            &agent_id,
            "Attache",
            "netagent_reply",
            json!({
                "session_id": &session_id,
                "reply": "Top option found. Best price-to-duration route is ready for confirmation.",
            }),
        ),
    ];

    let actions: Vec<String> = sequence.iter().map(|log| log.action.clone()).collect();
    let emitted_count = sequence.len();

    let playback = state.clone();
    tokio::spawn(async move {
        for (idx, log) in sequence.into_iter().enumerate() {
            if idx > 0 {
                tokio::time::sleep(SIMULATION_SPACING).await;
            }
            if let Err(error) = publish_log(&playback, log) {
                warn!(%error, "simulated node log dropped");
            }
        }
    });

    Ok(Json(json!({
        "ok": true,
        "emitted_count": emitted_count,
        "sequence": actions,
    })))
}
