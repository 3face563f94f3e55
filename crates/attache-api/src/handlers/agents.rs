//! Agent discovery, selection, connection, and task execution endpoints.

use std::collections::HashMap;
use std::sync::OnceLock;

use axum::extract::State;
use axum::Json;
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;
use uuid::Uuid;

use attache_models::NodeLog;

use crate::error::{ApiError, Result};
use crate::session::HubAgent;
use crate::state::AppState;

use super::publish_log;

const MANIFEST_LIMIT: usize = 6;
const SHORTLIST_LIMIT: usize = 5;
const WORKFLOW_STEP_LIMIT: usize = 3;
const ACTION_MAX_CHARS: usize = 120;

/// `GET /api/agents/manifest`
///
/// Scans the agent network for candidates matching the session intent. When
/// the network is unreachable the static roster stands in, so the flow keeps
/// working offline.
pub async fn manifest(State(state): State<AppState>) -> Result<Json<Value>> {
    let intent = state.session.read().await.intent.clone();

    publish_log(
        &state,
        NodeLog::new(
            "SearchEngine",
            "AgentManifest",
            "scan_manifest",
            json!({ "intent": &intent }),
        ),
    )?;

    let agents = match fetch_agents(&state, &intent).await {
        Ok(agents) if !agents.is_empty() => agents,
        Ok(_) => {
            warn!("agent network returned no agents, using static roster");
            static_roster(&state.config.network_base())
        }
        Err(error) => {
            warn!(%error, "agent network unreachable, using static roster");
            static_roster(&state.config.network_base())
        }
    };

    let shortlisted_indices: Vec<usize> = (0..agents.len().min(SHORTLIST_LIMIT)).collect();

    {
        let mut session = state.session.write().await;
        session.agents = agents.clone();
        session.shortlisted_indices = shortlisted_indices.clone();
    }

    publish_log(
        &state,
        NodeLog::new(
            "AgentManifest",
            "SearchEngine",
            "manifest_result",
            json!({
                "total_agents": agents.len(),
                "shortlisted": shortlisted_indices.len(),
            }),
        ),
    )?;

    let public: Vec<Value> = agents
        .iter()
        .map(|agent| {
            json!({
                "name": agent.name,
                "provider": agent.provider,
                "capabilities": agent.capabilities,
                "description": agent.description,
                "score": agent.score,
            })
        })
        .collect();

    Ok(Json(json!({
        "agents": public,
        "shortlisted_indices": shortlisted_indices,
    })))
}

#[derive(Debug, Default, Deserialize)]
pub struct SelectRequest {
    #[serde(default)]
    pub candidates: Vec<String>,
}

/// `POST /api/agents/select`
///
/// Picks the agents to proceed with. An empty candidate list defaults to the
/// top three from the current manifest.
pub async fn select(
    State(state): State<AppState>,
    body: Option<Json<SelectRequest>>,
) -> Result<Json<Value>> {
    let Json(body) = body.unwrap_or_default();

    let (selected, confidence) = {
        let mut session = state.session.write().await;
        let selected: Vec<String> = if body.candidates.is_empty() {
            session
                .agents
                .iter()
                .take(3)
                .map(|agent| agent.name.clone())
                .collect()
        } else {
            body.candidates
        };

        let confidence = session
            .agents
            .first()
            .map(|agent| (agent.score * 100.0).round() / 100.0)
            .unwrap_or(0.85);

        let top = session
            .agents
            .iter()
            .find(|agent| selected.contains(&agent.name))
            .or_else(|| session.agents.first())
            .cloned();
        if let Some(agent) = &top {
            session.select(agent);
        }

        (selected, confidence)
    };

    publish_log(
        &state,
        NodeLog::new(
            "SearchEngine",
            "LocalAgent",
            "agents_selected",
            json!({ "selected_agents": &selected, "confidence": confidence }),
        ),
    )?;

    Ok(Json(json!({
        "selected_agents": selected,
        "confidence": confidence,
    })))
}

#[derive(Debug, Default, Deserialize)]
pub struct ConnectRequest {
    #[serde(default)]
    pub agent: String,
    #[serde(default)]
    pub context: Value,
}

/// `POST /api/agents/connect`
///
/// Establishes the (simulated) connection to one agent and records its
/// dispatch endpoint on the session.
pub async fn connect(
    State(state): State<AppState>,
    body: Option<Json<ConnectRequest>>,
) -> Result<Json<Value>> {
    let Json(body) = body.unwrap_or_default();

    let name = {
        let mut session = state.session.write().await;
        let agent = session
            .agents
            .iter()
            .find(|agent| agent.name == body.agent)
            .or_else(|| session.agents.first())
            .cloned();
        match &agent {
            Some(agent) => {
                session.select(agent);
                agent.name.clone()
            }
            None => body.agent.clone(),
        }
    };

    if name.is_empty() {
        return Err(ApiError::NotFound("no agent available to connect".into()));
    }

    publish_log(
        &state,
        NodeLog::new(
            "LocalAgent",
            &name,
            "establish_connection",
            json!({ "agent": &body.agent, "context": &body.context }),
        ),
    )?;

    Ok(Json(json!({
        "establish_connection": true,
        "agent": name,
        "context": body.context,
    })))
}

#[derive(Debug, Default, Deserialize)]
pub struct ExecuteRequest {
    #[serde(default)]
    pub task: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub agent: String,
}

/// `POST /api/agents/execute`
///
/// Dispatches the task to the connected agent's endpoint and folds its answer
/// into a short prioritized workflow. Without a reachable endpoint the
/// canned workflow is returned with status `ready`.
pub async fn execute(
    State(state): State<AppState>,
    body: Option<Json<ExecuteRequest>>,
) -> Result<Json<Value>> {
    let Json(body) = body.unwrap_or_default();
    let session = state.session.read().await.clone();

    let source = if !session.selected_agent.is_empty() {
        session.selected_agent.clone()
    } else if !body.agent.is_empty() {
        body.agent.clone()
    } else {
        "AgentNetwork".to_string()
    };

    let task = if body.task.is_empty() {
        session.intent.clone()
    } else {
        body.task
    };
    let domain = if body.domain.is_empty() {
        session.domain.clone()
    } else {
        body.domain
    };

    publish_log(
        &state,
        NodeLog::new(
            &source,
            "LocalAgent",
            "execute_task",
            json!({ "task": &task, "domain": &domain }),
        ),
    )?;

    let session_id = new_session_id();

    let (workflow, status) = if session.selected_endpoint.is_empty() {
        (fallback_workflow(&task, &domain), "ready")
    } else {
        match dispatch_task(&state, &session.selected_endpoint, &task, &domain).await {
            Ok(workflow) => (workflow, "completed"),
            Err(error) => {
                warn!(
                    %error,
                    endpoint = %session.selected_endpoint,
                    "task dispatch failed, using fallback workflow"
                );
                (fallback_workflow(&task, &domain), "ready")
            }
        }
    };

    publish_log(
        &state,
        NodeLog::new(
            &source,
            "LocalAgent",
            "task_result",
            json!({ "session_id": &session_id, "workflow": &workflow }),
        ),
    )?;

    Ok(Json(json!({
        "session_id": session_id,
        "workflow": workflow,
        "status": status,
    })))
}

/// Fetches the network's agent listing and scores it against the intent via
/// the hub's search endpoint. Agents the search does not mention keep a flat
/// 0.5 score.
async fn fetch_agents(state: &AppState, intent: &str) -> Result<Vec<HubAgent>> {
    let base = state.config.network_base();
    let listing: Value = state
        .http
        .get(format!("{base}/agents"))
        .send()
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .error_for_status()
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .json()
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let query = if intent.is_empty() { "general" } else { intent };
    let search: Value = state
        .http
        .post(&state.config.hub_url)
        .json(&json!({ "intent": query }))
        .send()
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .error_for_status()
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .json()
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let mut scores: HashMap<String, f64> = HashMap::new();
    if let Some(results) = search.get("results").and_then(Value::as_array) {
        for result in results {
            if let (Some(id), Some(trust)) = (
                result.get("agent_id").and_then(Value::as_str),
                result.get("trust").and_then(Value::as_f64),
            ) {
                scores.insert(id.to_string(), trust);
            }
        }
    }

    let entries = listing
        .get("agents")
        .and_then(Value::as_array)
        .cloned()
        .or_else(|| listing.as_array().cloned())
        .unwrap_or_default();

    let mut agents: Vec<HubAgent> = entries
        .iter()
        .filter_map(|entry| {
            let id = entry.get("id").and_then(Value::as_str)?.to_string();
            let score = scores.get(&id).copied().unwrap_or(0.5);
            Some(HubAgent {
                name: entry
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or(&id)
                    .to_string(),
                provider: entry
                    .get("provider")
                    .and_then(Value::as_str)
                    .unwrap_or("AgentNetwork")
                    .to_string(),
                capabilities: entry
                    .get("capabilities")
                    .and_then(Value::as_array)
                    .map(|caps| {
                        caps.iter()
                            .filter_map(Value::as_str)
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default(),
                description: entry
                    .get("description")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                endpoint: entry
                    .get("endpoint")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                id,
                score,
            })
        })
        .collect();

    agents.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    agents.truncate(MANIFEST_LIMIT);
    Ok(agents)
}

/// The offline stand-in roster, keyed to the network base so endpoints stay
/// routable once the network comes back up.
fn static_roster(base: &str) -> Vec<HubAgent> {
    let entries: [(&str, &str, &str, f64, &str, &str); 6] = [
        (
            "agent_flight_travel",
            "FlightTravelAgent",
            "travel",
            0.92,
            "/flight/run",
            "Finds and compares flight options.",
        ),
        (
            "agent_legal",
            "SmartLegalAgent",
            "legal",
            0.76,
            "/sim/sim_legal/run",
            "Reviews contracts and legal questions.",
        ),
        (
            "agent_health",
            "SmartHealthcareAgent",
            "health",
            0.68,
            "/sim/sim_health/run",
            "Answers healthcare and triage questions.",
        ),
        (
            "agent_shopping",
            "SmartShoppingAgent",
            "shopping",
            0.61,
            "/sim/sim_ecom1/run",
            "Searches product catalogs for the best deals.",
        ),
        (
            "agent_retail",
            "SmartRetailAgent",
            "retail",
            0.55,
            "/sim/sim_ecom2/run",
            "Tracks retail inventory and pricing.",
        ),
        (
            "agent_compliance",
            "SmartComplianceAgent",
            "law",
            0.43,
            "/sim/sim_legal2/run",
            "Checks regulatory compliance requirements.",
        ),
    ];

    entries
        .iter()
        .map(|(id, name, capability, score, path, description)| HubAgent {
            id: (*id).to_string(),
            name: (*name).to_string(),
            provider: "AgentNetwork".to_string(),
            capabilities: vec![(*capability).to_string()],
            description: (*description).to_string(),
            score: *score,
            endpoint: format!("{base}{path}"),
        })
        .collect()
}

async fn dispatch_task(
    state: &AppState,
    endpoint: &str,
    task: &str,
    domain: &str,
) -> Result<Vec<Value>> {
    let prompt = format!(
        "Execute task: {task} in domain: {domain}. \
         Provide a structured workflow with prioritized actions."
    );
    let response: Value = state
        .http
        .post(endpoint)
        .json(&json!({ "prompt": prompt }))
        .send()
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .error_for_status()
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .json()
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let answer = response
        .get("answer")
        .and_then(Value::as_str)
        .unwrap_or_default();
    if answer.trim().is_empty() {
        return Err(ApiError::Internal("agent returned an empty answer".into()));
    }
    Ok(workflow_from_answer(answer))
}

/// Turns an agent's free-text answer into at most three prioritized steps,
/// stripping list markers off each line.
fn workflow_from_answer(answer: &str) -> Vec<Value> {
    const PRIORITIES: [&str; WORKFLOW_STEP_LIMIT] = ["high", "medium", "low"];

    let steps: Vec<Value> = answer
        .lines()
        .map(|line| list_marker().replace(line.trim(), "").trim().to_string())
        .filter(|line| !line.is_empty())
        .take(WORKFLOW_STEP_LIMIT)
        .enumerate()
        .map(|(idx, action)| {
            json!({
                "action": truncate(&action, ACTION_MAX_CHARS),
                "priority": PRIORITIES[idx],
            })
        })
        .collect();

    if steps.is_empty() {
        vec![json!({
            "action": truncate(answer.trim(), ACTION_MAX_CHARS),
            "priority": "high",
        })]
    } else {
        steps
    }
}

fn fallback_workflow(task: &str, domain: &str) -> Vec<Value> {
    vec![
        json!({ "action": format!("{task}_analysis"), "priority": "high" }),
        json!({ "action": format!("{domain}_review"), "priority": "medium" }),
    ]
}

pub(crate) fn new_session_id() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("session_{}", &id[..8])
}

fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

fn list_marker() -> &'static Regex {
    static LIST_MARKER: OnceLock<Regex> = OnceLock::new();
    LIST_MARKER.get_or_init(|| Regex::new(r"^[\d.\-*]+\s*").expect("pattern compiles"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workflow_from_answer_strips_markers_and_caps_steps() {
        let answer = "1. Search for flights\n2. Compare prices\n- Book the best one\n4. Extra";
        let workflow = workflow_from_answer(answer);

        assert_eq!(workflow.len(), 3);
        assert_eq!(workflow[0]["action"], "Search for flights");
        assert_eq!(workflow[0]["priority"], "high");
        assert_eq!(workflow[1]["action"], "Compare prices");
        assert_eq!(workflow[1]["priority"], "medium");
        assert_eq!(workflow[2]["action"], "Book the best one");
        assert_eq!(workflow[2]["priority"], "low");
    }

    #[test]
    fn test_workflow_from_single_paragraph_answer() {
        let long = "a".repeat(200);
        let workflow = workflow_from_answer(&long);

        assert_eq!(workflow.len(), 1);
        assert_eq!(workflow[0]["action"].as_str().map(str::len), Some(120));
        assert_eq!(workflow[0]["priority"], "high");
    }

    #[test]
    fn test_static_roster_endpoints_use_base() {
        let roster = static_roster("http://localhost:8000");
        assert_eq!(roster.len(), 6);
        assert_eq!(roster[0].name, "FlightTravelAgent");
        assert_eq!(roster[0].endpoint, "http://localhost:8000/flight/run");
        assert!(roster.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_session_id_shape() {
        let id = new_session_id();
        assert!(id.starts_with("session_"));
        assert_eq!(id.len(), "session_".len() + 8);
    }
}
