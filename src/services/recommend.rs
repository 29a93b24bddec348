use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::services::advisor::{extract_json, Advisor};
use crate::services::mastery;
use crate::store::WarehouseProxy;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub topic: String,
    pub reason: String,
    #[serde(default)]
    pub connections: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_mastery: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RecommendationPayload {
    #[serde(default)]
    recommendations: Vec<Recommendation>,
}

/// Ranks what the user should study next from their mastery snapshots.
/// Never fails: a missing warehouse, a dead model endpoint or an unparsable
/// reply all collapse to the canned fallback list.
pub async fn recommendations_for(
    warehouse: Option<&WarehouseProxy>,
    timeout: Duration,
    advisor: &Advisor,
    user_id: &str,
    current_node_id: Option<&str>,
) -> Vec<Recommendation> {
    let scores = match warehouse {
        Some(proxy) => mastery::all_scores(proxy, timeout, user_id)
            .await
            .unwrap_or_else(|err| {
                warn!(error = %err, user_id, "score lookup failed for recommendations");
                Vec::new()
            }),
        None => Vec::new(),
    };

    let summary = if scores.is_empty() {
        "No topics learned yet.".to_string()
    } else {
        // Weakest first so the model sees the gaps before the strengths.
        scores
            .iter()
            .rev()
            .map(|s| format!("- {}: {:.1}% mastery", s.concept_id, s.mastery_score))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let focus = current_node_id
        .map(|id| format!("\nThe user is currently looking at: {id}"))
        .unwrap_or_default();

    let prompt = format!(
        "You are a learning advisor for a knowledge-graph study app.\n\n\
         The user's current mastery levels:\n{summary}\n{focus}\n\
         Suggest 3 topics the user should study next. Consider prerequisites, \
         knowledge gaps and natural progressions.\n\n\
         Respond ONLY with valid JSON:\n\
         {{\n  \"recommendations\": [\n    {{\n      \"topic\": \"topic name\",\n      \"reason\": \"one sentence why\",\n      \"connections\": [\"known topic it builds on\"],\n      \"targetMastery\": 70\n    }}\n  ]\n}}",
    );

    match advisor.complete(&prompt).await {
        Ok(raw) => match parse_recommendations(&raw) {
            Some(recs) if !recs.is_empty() => recs,
            _ => {
                warn!(user_id, "unparsable recommendation reply, using fallback");
                fallback_recommendations()
            }
        },
        Err(err) => {
            warn!(error = %err, user_id, "advisor unavailable, using fallback recommendations");
            fallback_recommendations()
        }
    }
}

fn parse_recommendations(raw: &str) -> Option<Vec<Recommendation>> {
    let json = extract_json(raw)?;
    let payload: RecommendationPayload = serde_json::from_str(&json).ok()?;
    Some(payload.recommendations)
}

fn fallback_recommendations() -> Vec<Recommendation> {
    vec![Recommendation {
        topic: "Continue exploring".to_string(),
        reason: "Keep building on the topics you have already started".to_string(),
        connections: Vec::new(),
        target_mastery: Some(70.0),
    }]
}
