use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::mastery::score::MasterySnapshot;
use crate::response::AppError;
use crate::services::mastery as mastery_service;
use crate::services::recommend::{self, Recommendation};
use crate::state::AppState;
use crate::store::interactions::NewInteraction;
use crate::store::StoreError;

const MISSING_FIELDS: &str = "Missing required fields: userId, nodeId, interactionType";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/log-interaction", post(log_interaction))
        .route("/score/:user_id/:node_id", get(get_score))
        .route("/recommendations/:user_id", get(get_recommendations))
        .route("/:user_id", get(get_all_scores))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LogInteractionRequest {
    user_id: Option<String>,
    node_id: Option<String>,
    interaction_type: Option<String>,
    #[serde(default)]
    duration_seconds: Option<u32>,
    #[serde(default)]
    metadata: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct LogInteractionResponse {
    success: bool,
    message: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScoreResponse {
    user_id: String,
    node_id: String,
    mastery_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AllScoresResponse {
    user_id: String,
    scores: Vec<MasterySnapshot>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecommendationsQuery {
    current_node_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RecommendationsResponse {
    user_id: String,
    recommendations: Vec<Recommendation>,
}

/// Writes degrade: once the payload validates, a store fault still returns
/// success so a flaky warehouse never breaks the client's event loop.
async fn log_interaction(
    State(state): State<AppState>,
    Json(payload): Json<LogInteractionRequest>,
) -> Result<Json<LogInteractionResponse>, AppError> {
    let (Some(user_id), Some(node_id), Some(interaction_type)) =
        (payload.user_id, payload.node_id, payload.interaction_type)
    else {
        return Err(AppError::validation(MISSING_FIELDS));
    };

    let interaction = NewInteraction {
        user_id,
        concept_id: node_id,
        kind: interaction_type,
        duration_seconds: payload.duration_seconds.unwrap_or(0),
        metadata: payload.metadata,
    };

    let Some(proxy) = state.warehouse() else {
        warn!("warehouse unavailable, interaction queued");
        return Ok(Json(LogInteractionResponse {
            success: true,
            message: "Interaction logged (queued)",
        }));
    };

    match mastery_service::log_interaction(proxy, state.store_timeout(), interaction).await {
        Ok(_) => Ok(Json(LogInteractionResponse {
            success: true,
            message: "Interaction logged",
        })),
        Err(StoreError::Validation(message)) => Err(AppError::validation(message)),
        Err(err) => {
            warn!(error = %err, "interaction write failed, reporting queued");
            Ok(Json(LogInteractionResponse {
                success: true,
                message: "Interaction logged (queued)",
            }))
        }
    }
}

/// Always 200: a failed recompute reports score 0 with an advisory error
/// field rather than surfacing the store fault.
async fn get_score(
    State(state): State<AppState>,
    Path((user_id, node_id)): Path<(String, String)>,
) -> Json<ScoreResponse> {
    let degraded = |user_id: String, node_id: String, message: String| ScoreResponse {
        user_id,
        node_id,
        mastery_score: 0.0,
        error: Some(message),
    };

    let Some(proxy) = state.warehouse() else {
        return Json(degraded(
            user_id,
            node_id,
            "mastery store unavailable".to_string(),
        ));
    };

    match mastery_service::score_concept(proxy, state.store_timeout(), &user_id, &node_id).await {
        Ok(snapshot) => Json(ScoreResponse {
            user_id,
            node_id,
            mastery_score: snapshot.mastery_score,
            error: None,
        }),
        Err(err) => {
            warn!(error = %err, %user_id, %node_id, "score recompute failed");
            Json(degraded(user_id, node_id, "Failed to compute score".to_string()))
        }
    }
}

async fn get_all_scores(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<AllScoresResponse>, AppError> {
    let proxy = state
        .warehouse()
        .ok_or_else(|| AppError::internal("mastery store unavailable"))?;

    let scores = mastery_service::all_scores(proxy, state.store_timeout(), &user_id)
        .await
        .map_err(|err| {
            warn!(error = %err, %user_id, "score listing failed");
            AppError::internal("Failed to fetch scores")
        })?;

    Ok(Json(AllScoresResponse { user_id, scores }))
}

async fn get_recommendations(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<RecommendationsQuery>,
) -> Json<RecommendationsResponse> {
    let recommendations = recommend::recommendations_for(
        state.warehouse(),
        state.store_timeout(),
        state.advisor(),
        &user_id,
        query.current_node_id.as_deref(),
    )
    .await;

    Json(RecommendationsResponse {
        user_id,
        recommendations,
    })
}
