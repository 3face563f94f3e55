//! Maps wire node-log records onto sequencer step events.

use serde_json::{json, Value};

use attache_models::{AgentCard, NodeLogEvent};

use crate::state::{StepEvent, STEP_LABELS};

/// Manifest data recovered from a hub search result.
pub struct ManifestUpdate {
    pub cards: Vec<AgentCard>,
    pub shortlist: Vec<usize>,
}

/// What a single node-log record contributes to the visualization.
#[derive(Default)]
pub struct Translation {
    pub manifest: Option<ManifestUpdate>,
    pub events: Vec<StepEvent>,
}

/// Translates one backend node-log record. Unknown actions translate to
/// nothing; a `search_hub_result` yields two step events (the manifest scan
/// and the selection) plus any manifest cards carried in the payload.
pub fn translate(event: &NodeLogEvent) -> Translation {
    match event.action.as_str() {
        "search_hub" => Translation {
            manifest: None,
            events: vec![StepEvent {
                step: 1,
                label: STEP_LABELS[1].to_string(),
                payload: json!({
                    "type": "intent_message",
                    "payload": event.payload,
                }),
            }],
        },
        "search_hub_result" => translate_search_result(event),
        "netagent_request" => Translation {
            manifest: None,
            events: vec![StepEvent {
                step: 4,
                label: STEP_LABELS[4].to_string(),
                payload: json!({
                    "establish_connection": true,
                    "agent": event.target,
                    "context": event.payload,
                }),
            }],
        },
        "netagent_reply" => {
            let reply = event
                .payload
                .get("reply")
                .and_then(Value::as_str)
                .unwrap_or("Agent replied.");
            let action: String = reply.chars().take(140).collect();
            Translation {
                manifest: None,
                events: vec![StepEvent {
                    step: 5,
                    label: STEP_LABELS[5].to_string(),
                    payload: json!({
                        "workflow": [{ "action": action, "priority": "high" }],
                        "status": "ready",
                    }),
                }],
            }
        }
        _ => Translation::default(),
    }
}

fn translate_search_result(event: &NodeLogEvent) -> Translation {
    let matches: Vec<String> = event
        .payload
        .get("matches")
        .and_then(Value::as_array)
        .map(|values| {
            values
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let cards = match_detail_cards(&event.payload);
    let manifest = if cards.is_empty() {
        None
    } else {
        let shortlist: Vec<usize> = (0..cards.len().min(5)).collect();
        Some(ManifestUpdate { cards, shortlist })
    };

    let total_agents = event
        .payload
        .get("results_count")
        .and_then(Value::as_u64)
        .unwrap_or_else(|| {
            manifest
                .as_ref()
                .map(|m| m.cards.len() as u64)
                .unwrap_or(attache_models::default_manifest().len() as u64)
        });

    let confidence = if matches.is_empty() { 0.5 } else { 0.92 };

    Translation {
        manifest,
        events: vec![
            StepEvent {
                step: 2,
                label: STEP_LABELS[2].to_string(),
                payload: json!({
                    "status": "scanning_manifest",
                    "total_agents": total_agents,
                    "matches": matches,
                }),
            },
            StepEvent {
                step: 3,
                label: STEP_LABELS[3].to_string(),
                payload: json!({
                    "selected_agents": matches,
                    "confidence": confidence,
                }),
            },
        ],
    }
}

/// Builds manifest cards from the hub's `matches_detail` rows. Score falls
/// back to a decaying ladder bottoming out at 0.3 when the hub omits a
/// confidence figure.
fn match_detail_cards(payload: &Value) -> Vec<AgentCard> {
    let Some(details) = payload.get("matches_detail").and_then(Value::as_array) else {
        return Vec::new();
    };

    details
        .iter()
        .enumerate()
        .filter_map(|(idx, detail)| {
            let name = detail.get("agent_id").and_then(Value::as_str)?;
            let provider = detail
                .get("tags")
                .and_then(Value::as_array)
                .and_then(|tags| tags.first())
                .and_then(Value::as_str)
                .unwrap_or("AgentNetwork");
            let capabilities: Vec<String> = detail
                .get("capabilities")
                .and_then(Value::as_array)
                .map(|values| {
                    values
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();
            let description = detail
                .get("description")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .or_else(|| {
                    detail
                        .get("reasoning")
                        .and_then(Value::as_str)
                        .filter(|s| !s.is_empty())
                })
                .unwrap_or("Agent discovered via AgentHub search.");
            let score = detail
                .get("confidence")
                .and_then(Value::as_f64)
                .unwrap_or_else(|| (0.9 - idx as f64 * 0.1).max(0.3));
            Some(AgentCard::new(name, provider, capabilities, description, score))
        })
        .collect()
}
