//! Intent parsing endpoint.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use attache_agent::{ChatClient, ChatMessage, ModelConfig};
use attache_models::NodeLog;

use crate::error::Result;
use crate::state::AppState;

use super::publish_log;

#[derive(Debug, Default, Deserialize)]
pub struct ParseIntentRequest {
    #[serde(default)]
    pub message: String,
}

/// `POST /api/parse-intent`
///
/// Classifies a free-form user message into an intent and domain, resetting
/// the hub session for a fresh flow. Uses the model when one is configured,
/// otherwise falls back to keyword heuristics.
pub async fn parse_intent(
    State(state): State<AppState>,
    body: Option<Json<ParseIntentRequest>>,
) -> Result<Json<Value>> {
    let Json(body) = body.unwrap_or_default();

    publish_log(
        &state,
        NodeLog::new(
            "LocalAgent",
            "SearchEngine",
            "parse_intent",
            json!({ "raw_message": &body.message }),
        ),
    )?;

    let (intent, domain) = match model_parse(&state, &body.message).await {
        Some(parsed) => parsed,
        None => keyword_parse(&body.message),
    };
    debug!(%intent, %domain, "intent parsed");

    state.session.write().await.reset(&intent, &domain);

    publish_log(
        &state,
        NodeLog::new(
            "SearchEngine",
            "LocalAgent",
            "intent_parsed",
            json!({ "intent": &intent, "domain": &domain }),
        ),
    )?;

    Ok(Json(json!({
        "type": "intent_message",
        "payload": { "intent": intent, "domain": domain },
    })))
}

async fn model_parse(state: &AppState, message: &str) -> Option<(String, String)> {
    let chat = state.chat.as_ref()?;
    let messages = vec![
        ChatMessage::system(
            "Classify the user's request. Respond with only a JSON object of the form \
             {\"intent\": \"snake_case_intent\", \"domain\": \"one_word_domain\"}.",
        ),
        ChatMessage::user(message),
    ];

    let response = match chat.chat(&ModelConfig::default(), messages, None).await {
        Ok(response) => response,
        Err(error) => {
            warn!(%error, "intent model call failed, using keyword fallback");
            return None;
        }
    };

    let text = response.text()?;
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    let parsed: Value = serde_json::from_str(&text[start..=end]).ok()?;
    let intent = parsed.get("intent")?.as_str()?.to_string();
    let domain = parsed.get("domain")?.as_str()?.to_string();
    Some((intent, domain))
}

fn keyword_parse(message: &str) -> (String, String) {
    let lower = message.to_lowercase();
    let contains_any =
        |words: &[&str]| words.iter().any(|word| lower.contains(word));

    if contains_any(&["flight", "travel", "book"]) {
        ("find_flights".to_string(), "travel".to_string())
    } else if contains_any(&["research", "biotech"]) {
        ("generate_research_plan".to_string(), "biotech".to_string())
    } else if contains_any(&["shop", "buy", "product"]) {
        ("product_search".to_string(), "e-commerce".to_string())
    } else {
        ("general_task".to_string(), "general".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_parse_buckets() {
        assert_eq!(
            keyword_parse("Book me a flight to London"),
            ("find_flights".to_string(), "travel".to_string())
        );
        assert_eq!(
            keyword_parse("plan my biotech research"),
            ("generate_research_plan".to_string(), "biotech".to_string())
        );
        assert_eq!(
            keyword_parse("where can I buy a new laptop"),
            ("product_search".to_string(), "e-commerce".to_string())
        );
        assert_eq!(
            keyword_parse("tell me a joke"),
            ("general_task".to_string(), "general".to_string())
        );
    }
}
