use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use tracing::warn;

use crate::response::AppError;
use crate::services::advisor::AdvisorError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/suggest-parent", post(suggest_parent))
        .route("/suggest-chain", post(suggest_chain))
        .route("/find-related", post(find_related))
        .route("/subtopics", post(generate_subtopics))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TopicRequest {
    topic_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConceptRequest {
    concept_name: Option<String>,
}

fn advisor_failure(action: &str, err: AdvisorError) -> Response {
    warn!(error = %err, action, "advisor call failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({
            "error": format!("Failed to {action}"),
            "details": err.to_string(),
        })),
    )
        .into_response()
}

async fn suggest_parent(
    State(state): State<AppState>,
    Json(payload): Json<TopicRequest>,
) -> Result<Response, AppError> {
    let Some(topic_name) = payload.topic_name.filter(|t| !t.trim().is_empty()) else {
        return Err(AppError::bad_request("topicName is required"));
    };

    let nodes = state.graph().nodes().await;
    match state.advisor().suggest_parent(&topic_name, &nodes).await {
        Ok(suggestion) => Ok(Json(suggestion).into_response()),
        Err(err) => Ok(advisor_failure("suggest a parent", err)),
    }
}

async fn suggest_chain(
    State(state): State<AppState>,
    Json(payload): Json<TopicRequest>,
) -> Result<Response, AppError> {
    let Some(topic_name) = payload.topic_name.filter(|t| !t.trim().is_empty()) else {
        return Err(AppError::bad_request("topicName is required"));
    };

    let nodes = state.graph().nodes().await;
    match state.advisor().suggest_chain(&topic_name, &nodes).await {
        Ok(suggestion) => Ok(Json(suggestion).into_response()),
        Err(err) => Ok(advisor_failure("suggest a parent chain", err)),
    }
}

/// Related-topic lookup is best effort: any advisor failure yields an empty
/// list instead of an error.
async fn find_related(
    State(state): State<AppState>,
    Json(payload): Json<ConceptRequest>,
) -> Result<Json<Vec<String>>, AppError> {
    let Some(concept_name) = payload.concept_name.filter(|c| !c.trim().is_empty()) else {
        return Err(AppError::bad_request("conceptName is required"));
    };

    let nodes = state.graph().nodes().await;
    let related = state
        .advisor()
        .find_related(&concept_name, &nodes)
        .await
        .unwrap_or_else(|err| {
            warn!(error = %err, "related lookup failed, returning empty list");
            Vec::new()
        });
    Ok(Json(related))
}

async fn generate_subtopics(
    State(state): State<AppState>,
    Json(payload): Json<TopicRequest>,
) -> Result<Response, AppError> {
    let Some(topic_name) = payload.topic_name.filter(|t| !t.trim().is_empty()) else {
        return Err(AppError::bad_request("topicName is required"));
    };

    let nodes = state.graph().nodes().await;
    match state.advisor().generate_subtopics(&topic_name, &nodes).await {
        Ok(response) => Ok(Json(response).into_response()),
        Err(err) => Ok(advisor_failure("generate subtopics", err)),
    }
}
