use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::sleep;
use tracing::warn;

use crate::graph::{ConceptNode, ROOT_NODE_ID};

const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_API_ENDPOINT: &str = "https://api.openai.com/v1";
const DEFAULT_TIMEOUT_MS: u64 = 60_000;
const MAX_RETRIES: usize = 3;
const BASE_BACKOFF_MS: u64 = 200;

#[derive(Debug, Clone)]
pub struct AdvisorConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub api_endpoint: String,
    pub timeout: Duration,
}

#[derive(Debug, Error)]
pub enum AdvisorError {
    #[error("advisor not configured: {0}")]
    NotConfigured(&'static str),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    HttpStatus {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("no JSON found in model reply")]
    NoJson,
    #[error("JSON decode failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("empty response")]
    EmptyChoices,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Where the AI thinks a new topic belongs in the graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentSuggestion {
    pub subject: String,
    pub parents: Vec<String>,
    #[serde(default)]
    pub related: Vec<String>,
    pub reasoning: String,
}

/// A placement with intermediate concepts: the chain starts at an existing
/// node id and may introduce new labels on the way down.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainSuggestion {
    pub subject: String,
    pub immediate_parent: String,
    pub parent_chain: Vec<String>,
    #[serde(default)]
    pub related: Vec<String>,
    pub reasoning: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtopicSuggestion {
    pub label: String,
    pub subject: String,
    pub description: String,
    #[serde(default)]
    pub related_node_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtopicsResponse {
    pub subtopics: Vec<SubtopicSuggestion>,
    pub reasoning: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedSummary {
    pub title: String,
    pub summary: String,
}

/// Client for the generative-model API backing graph placement, subtopic
/// generation and recommendation ranking. OpenAI-compatible chat endpoint.
#[derive(Clone)]
pub struct Advisor {
    config: AdvisorConfig,
    client: reqwest::Client,
}

impl Advisor {
    pub fn from_env() -> Self {
        let api_key = env_string("LLM_API_KEY");
        let model = env_string("LLM_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let api_endpoint = env_string("LLM_API_ENDPOINT")
            .unwrap_or_else(|| DEFAULT_API_ENDPOINT.to_string())
            .trim_end_matches('/')
            .to_string();
        let timeout = Duration::from_millis(
            env_string("LLM_TIMEOUT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_TIMEOUT_MS),
        );

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            config: AdvisorConfig {
                api_key,
                model,
                api_endpoint,
                timeout,
            },
            client,
        }
    }

    pub fn is_available(&self) -> bool {
        self.config
            .api_key
            .as_deref()
            .is_some_and(|v| !v.trim().is_empty())
    }

    pub async fn suggest_parent(
        &self,
        topic_name: &str,
        nodes: &[ConceptNode],
    ) -> Result<ParentSuggestion, AdvisorError> {
        let prompt = format!(
            "You are helping organize a knowledge graph. A user wants to add \"{topic_name}\".\n\n\
             Existing topics:\n{nodes}\n\n\
             Respond ONLY with valid JSON:\n\
             {{\n  \"subject\": \"category\",\n  \"parents\": [\"parent-id\"],\n  \"related\": [],\n  \"reasoning\": \"explanation\"\n}}",
            nodes = node_listing(nodes),
        );
        self.complete_json(&prompt).await
    }

    pub async fn suggest_chain(
        &self,
        topic_name: &str,
        nodes: &[ConceptNode],
    ) -> Result<ChainSuggestion, AdvisorError> {
        let prompt = format!(
            "You are helping organize a knowledge graph. A user wants to add: \"{topic_name}\".\n\n\
             EXISTING topics in the graph:\n{nodes}\n\n\
             Your task: determine the SIMPLEST, MOST DIRECT path to connect \"{topic_name}\".\n\n\
             Rules:\n\
             1. Prefer EXISTING nodes over creating new ones; only create intermediate nodes when truly necessary.\n\
             2. Suggest related nodes that enhance understanding but are NOT direct prerequisites.\n\
             3. Create chains only when \"{topic_name}\" is very specific and needs a clear intermediate concept.\n\
             4. parentChain format: [\"existing-node-id\"] when connecting directly, or [\"root-id\", \"Intermediate Concept\", \"Immediate Parent\"]; the first item MUST be an existing node id.\n\n\
             Respond with valid JSON:\n\
             {{\n  \"subject\": \"category\",\n  \"immediateParent\": \"slug-format\",\n  \"parentChain\": [\"existing-id-or-chain\"],\n  \"related\": [\"existing-id\"],\n  \"reasoning\": \"explanation of why this is the simplest path\"\n}}",
            nodes = node_listing(nodes),
        );

        let mut suggestion: ChainSuggestion = self.complete_json(&prompt).await?;
        // New chain items arrive as free-form labels; existing ids keep
        // their slug form.
        suggestion.parent_chain = suggestion
            .parent_chain
            .into_iter()
            .map(|item| {
                if item.contains('-') {
                    item
                } else {
                    title_case(&item)
                }
            })
            .collect();
        Ok(suggestion)
    }

    pub async fn find_related(
        &self,
        concept_name: &str,
        nodes: &[ConceptNode],
    ) -> Result<Vec<String>, AdvisorError> {
        let prompt = format!(
            "Given the concept \"{concept_name}\" and the following existing topics, suggest 0-3 related topics \
             that connect to \"{concept_name}\" but are NOT direct prerequisites.\n\n\
             Existing topics:\n{nodes}\n\n\
             Respond with ONLY a JSON array of IDs (use exact IDs from the list):\n\
             [\"id1\", \"id2\"]\n\n\
             If no good related topics exist, return empty array: []",
            nodes = node_listing(nodes),
        );
        self.complete_json(&prompt).await
    }

    pub async fn generate_subtopics(
        &self,
        topic_name: &str,
        nodes: &[ConceptNode],
    ) -> Result<SubtopicsResponse, AdvisorError> {
        let prompt = format!(
            "You are an expert knowledge structure designer. A user wants to explore \"{topic_name}\" in depth.\n\n\
             EXISTING TOPICS:\n{nodes}\n\n\
             Generate 3-5 subtopics of \"{topic_name}\" that break it into digestible learning units. \
             For each: a clear 2-4 word name, a subject category, a one-sentence description, and 0-2 \
             existing topic ids that are conceptually related (not parent/child).\n\n\
             Return ONLY a valid JSON object (no markdown, no code blocks):\n\
             {{\n  \"subtopics\": [\n    {{\n      \"label\": \"subtopic name\",\n      \"subject\": \"subject category\",\n      \"description\": \"what this subtopic covers\",\n      \"relatedNodeIds\": [\"existing-id-1\"]\n    }}\n  ],\n  \"reasoning\": \"why these subtopics were chosen\"\n}}",
            nodes = node_listing(nodes),
        );
        self.complete_json(&prompt).await
    }

    /// Short encyclopedic fallback used when no reference source matches a
    /// concept.
    pub async fn concept_summary(&self, concept: &str) -> Result<GeneratedSummary, AdvisorError> {
        let prompt = format!(
            "Write a concise 2-3 sentence encyclopedic summary of the concept \"{concept}\" for a learner \
             encountering it for the first time.\n\n\
             Respond ONLY with valid JSON:\n{{\n  \"title\": \"canonical concept name\",\n  \"summary\": \"the summary\"\n}}",
        );
        self.complete_json(&prompt).await
    }

    /// Raw completion for callers that render their own prompts.
    pub async fn complete(&self, prompt: &str) -> Result<String, AdvisorError> {
        let messages = [ChatMessage {
            role: "user".into(),
            content: prompt.into(),
        }];
        let response = self.chat(&messages).await?;
        response
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or(AdvisorError::EmptyChoices)
    }

    async fn complete_json<T: serde::de::DeserializeOwned>(
        &self,
        prompt: &str,
    ) -> Result<T, AdvisorError> {
        let raw = self.complete(prompt).await?;
        let json = extract_json(&raw).ok_or(AdvisorError::NoJson)?;
        Ok(serde_json::from_str(&json)?)
    }

    async fn chat(&self, messages: &[ChatMessage]) -> Result<ChatResponse, AdvisorError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .ok_or(AdvisorError::NotConfigured("LLM_API_KEY"))?;

        let url = format!("{}/chat/completions", self.config.api_endpoint);
        let payload = serde_json::json!({
            "model": self.config.model,
            "messages": messages,
            "stream": false,
        });

        let mut last_error: Option<AdvisorError> = None;
        for retry in 0..=MAX_RETRIES {
            match self
                .client
                .post(&url)
                .bearer_auth(api_key)
                .json(&payload)
                .send()
                .await
            {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return Ok(resp.json::<ChatResponse>().await?);
                    }
                    let body = resp.text().await.unwrap_or_default();
                    let err = AdvisorError::HttpStatus { status, body };
                    if retry < MAX_RETRIES && is_retryable(status) {
                        warn!(retry, ?status, "advisor request failed, retrying");
                        sleep(Duration::from_millis(BASE_BACKOFF_MS * (1 << retry))).await;
                        last_error = Some(err);
                        continue;
                    }
                    return Err(err);
                }
                Err(e) => {
                    let err = AdvisorError::Request(e);
                    if retry < MAX_RETRIES {
                        warn!(retry, "advisor request error, retrying");
                        sleep(Duration::from_millis(BASE_BACKOFF_MS * (1 << retry))).await;
                        last_error = Some(err);
                        continue;
                    }
                    return Err(err);
                }
            }
        }
        Err(last_error.unwrap_or(AdvisorError::EmptyChoices))
    }
}

fn node_listing(nodes: &[ConceptNode]) -> String {
    nodes
        .iter()
        .filter(|n| n.id != ROOT_NODE_ID)
        .map(|n| format!("- {} ({}, id: {})", n.label, n.subject, n.id))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Pulls the first JSON object or array out of a model reply, tolerating
/// markdown code fences and surrounding prose.
pub fn extract_json(raw: &str) -> Option<String> {
    let mut text = raw.trim().to_string();
    if text.contains("```") {
        text = text
            .lines()
            .filter(|line| !line.trim_start().starts_with("```"))
            .collect::<Vec<_>>()
            .join("\n");
    }

    let object = text.find('{').zip(text.rfind('}'));
    let array = text.find('[').zip(text.rfind(']'));
    let (start, end) = object.or(array)?;
    if start > end {
        return None;
    }
    Some(text[start..=end].to_string())
}

fn title_case(value: &str) -> String {
    value
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn is_retryable(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS
        || status == reqwest::StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_plain_object() {
        let raw = r#"{"subject": "Math", "parents": ["math-root"], "reasoning": "x"}"#;
        assert_eq!(extract_json(raw).as_deref(), Some(raw));
    }

    #[test]
    fn extracts_from_code_fence() {
        let raw = "Here you go:\n```json\n{\"a\": 1}\n```\nHope that helps!";
        assert_eq!(extract_json(raw).as_deref(), Some("{\"a\": 1}"));
    }

    #[test]
    fn extracts_array_when_no_object() {
        let raw = "The related ids are [\"calc\", \"lin-alg\"] as requested.";
        assert_eq!(extract_json(raw).as_deref(), Some("[\"calc\", \"lin-alg\"]"));
    }

    #[test]
    fn rejects_reply_without_json() {
        assert_eq!(extract_json("I cannot answer that."), None);
    }

    #[test]
    fn title_case_capitalizes_each_word() {
        assert_eq!(title_case("machine learning"), "Machine Learning");
        assert_eq!(title_case("NEURAL networks"), "Neural Networks");
    }
}
