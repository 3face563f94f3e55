//! Agent cards shown by the visualization during the manifest scan.

use serde::{Deserialize, Serialize};

/// A discoverable agent as presented on the manifest wall.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentCard {
    pub name: String,
    pub provider: String,
    pub capabilities: Vec<String>,
    pub description: String,
    /// Match/trust score in `0.0..=1.0`.
    pub score: f64,
}

impl AgentCard {
    pub fn new(
        name: impl Into<String>,
        provider: impl Into<String>,
        capabilities: Vec<String>,
        description: impl Into<String>,
        score: f64,
    ) -> Self {
        Self {
            name: name.into(),
            provider: provider.into(),
            capabilities: capabilities.into_iter().collect(),
            description: description.into(),
            score,
        }
    }
}

/// The six-card roster the sequencer animates before any real manifest
/// data has arrived.
pub fn default_manifest() -> Vec<AgentCard> {
    vec![
        AgentCard::new(
            "ResearchAgent",
            "DeepMind",
            vec![
                "literature_review".into(),
                "data_synthesis".into(),
                "hypothesis_gen".into(),
            ],
            "Deep research across scientific domains with citation tracking.",
            0.92,
        ),
        AgentCard::new(
            "PlannerAgent",
            "OpenAI",
            vec![
                "task_decomposition".into(),
                "scheduling".into(),
                "resource_alloc".into(),
            ],
            "Breaks complex goals into actionable multi-step plans.",
            0.76,
        ),
        AgentCard::new(
            "DataAgent",
            "Anthropic",
            vec![
                "data_collection".into(),
                "cleaning".into(),
                "transformation".into(),
            ],
            "Automated data pipeline construction and management.",
            0.68,
        ),
        AgentCard::new(
            "SynthesisAgent",
            "Cohere",
            vec![
                "summarization".into(),
                "cross_reference".into(),
                "insight_gen".into(),
            ],
            "Synthesizes findings from multiple agent outputs.",
            0.61,
        ),
        AgentCard::new(
            "ValidationAgent",
            "Meta AI",
            vec![
                "fact_checking".into(),
                "consistency".into(),
                "bias_detection".into(),
            ],
            "Validates outputs for accuracy and logical consistency.",
            0.55,
        ),
        AgentCard::new(
            "ReportAgent",
            "Google",
            vec!["formatting".into(), "visualization".into(), "export".into()],
            "Generates structured reports and visual summaries.",
            0.43,
        ),
    ]
}

/// Default shortlist: the five highest-scored cards of the default manifest.
pub fn default_shortlist() -> Vec<usize> {
    vec![0, 1, 2, 3, 4]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_manifest_shape() {
        let manifest = default_manifest();
        assert_eq!(manifest.len(), 6);
        assert_eq!(manifest[0].name, "ResearchAgent");
        // Sorted by score descending
        assert!(manifest.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_default_shortlist_within_manifest() {
        let manifest = default_manifest();
        let shortlist = default_shortlist();
        assert_eq!(shortlist.len(), 5);
        assert!(shortlist.iter().all(|&i| i < manifest.len()));
    }
}
