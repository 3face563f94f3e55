//! Observable sequencer state and the per-stage metadata tables.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use attache_models::AgentCard;

/// Stages run 1 through 5; 0 means idle.
pub const FINAL_STEP: u8 = 5;

/// One line in the visualization console.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleEntry {
    pub timestamp: DateTime<Utc>,
    pub label: String,
    pub payload: Value,
}

impl ConsoleEntry {
    pub fn new(label: impl Into<String>, payload: Value) -> Self {
        Self {
            timestamp: Utc::now(),
            label: label.into(),
            payload,
        }
    }
}

/// A stage completion derived from real backend activity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepEvent {
    pub step: u8,
    pub label: String,
    pub payload: Value,
}

/// Everything a renderer needs to draw the current frame.
#[derive(Debug, Clone, Serialize)]
pub struct SequencerState {
    pub current_step: u8,
    pub is_running: bool,
    pub is_complete: bool,
    pub selected_agent: String,
    pub console_entries: Vec<ConsoleEntry>,
    pub active_edge: Option<String>,
    /// Index of the manifest card currently being read, if any.
    pub card_reading_index: Option<usize>,
    pub card_flipped_indices: Vec<usize>,
    pub shortlist_phase: bool,
    pub shortlisted_indices: Vec<usize>,
    pub manifest: Vec<AgentCard>,
}

impl Default for SequencerState {
    fn default() -> Self {
        Self {
            current_step: 0,
            is_running: false,
            is_complete: false,
            selected_agent: "ResearchAgent".to_string(),
            console_entries: Vec::new(),
            active_edge: None,
            card_reading_index: None,
            card_flipped_indices: Vec::new(),
            shortlist_phase: false,
            shortlisted_indices: Vec::new(),
            manifest: attache_models::default_manifest(),
        }
    }
}

/// Network edge lit up while each stage is in flight. Index 0 and 2 carry no
/// edge (idle, and the manifest scan happens inside the search node).
pub const EDGE_MAP: [Option<&str>; 6] = [
    None,
    Some("local-search"),
    None,
    Some("search-local"),
    Some("local-agent"),
    Some("agent-local"),
];

pub const STEP_LABELS: [&str; 6] = [
    "",
    "Local Agent → Search Engine",
    "Search Engine → Agent Manifest",
    "Search Engine → Local Agent",
    "Local Agent → Agent Network",
    "Agent Network → Local Agent",
];

/// The canned console payload shown when a stage begins, before any real
/// backend data arrives for it.
pub fn default_step_payload(step: u8, manifest: &[AgentCard], shortlist: &[usize]) -> Value {
    match step {
        1 => json!({
            "type": "intent_message",
            "payload": { "intent": "generate_research_plan", "domain": "biotech" },
        }),
        2 => json!({
            "status": "scanning_manifest",
            "total_agents": manifest.len(),
        }),
        3 => {
            let selected: Vec<&str> = shortlist
                .iter()
                .filter_map(|&i| manifest.get(i).map(|card| card.name.as_str()))
                .collect();
            json!({ "selected_agents": selected, "confidence": 0.92 })
        }
        4 => json!({
            "establish_connection": true,
            "agent": manifest.first().map(|c| c.name.as_str()).unwrap_or("ResearchAgent"),
            "context": { "domain": "biotech", "task": "research_plan" },
        }),
        5 => json!({
            "workflow": [
                { "action": "literature_review", "priority": "high" },
                { "action": "experiment_design", "priority": "medium" },
            ],
            "status": "ready",
        }),
        _ => json!({}),
    }
}
