use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::graph::{ConceptEdge, ConceptNode, KnowledgeTree, NodeUpdate};
use crate::response::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_tree))
        .route("/nodes", post(create_node))
        .route("/edges", post(create_edge))
        .route("/nodes/:id", patch(update_node))
}

#[derive(Debug, Deserialize)]
struct CreateNodeRequest {
    label: Option<String>,
    subject: Option<String>,
    #[serde(default)]
    parents: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct CreateEdgeRequest {
    from: Option<String>,
    to: Option<String>,
    #[serde(rename = "type")]
    edge_type: Option<String>,
}

async fn get_tree(State(state): State<AppState>) -> Json<KnowledgeTree> {
    Json(state.graph().tree().await)
}

async fn create_node(
    State(state): State<AppState>,
    Json(payload): Json<CreateNodeRequest>,
) -> Result<(StatusCode, Json<ConceptNode>), AppError> {
    let label = payload.label.filter(|l| !l.trim().is_empty());
    let subject = payload.subject.filter(|s| !s.trim().is_empty());
    let (Some(label), Some(subject)) = (label, subject) else {
        return Err(AppError::bad_request("Label and subject are required"));
    };

    let node = state.graph().add_node(label, subject, payload.parents).await;
    Ok((StatusCode::CREATED, Json(node)))
}

async fn create_edge(
    State(state): State<AppState>,
    Json(payload): Json<CreateEdgeRequest>,
) -> Result<(StatusCode, Json<ConceptEdge>), AppError> {
    let (Some(from), Some(to), Some(edge_type)) = (payload.from, payload.to, payload.edge_type)
    else {
        return Err(AppError::bad_request("from, to, and type are required"));
    };

    let edge = state.graph().add_edge(from, to, edge_type).await;
    Ok((StatusCode::CREATED, Json(edge)))
}

async fn update_node(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(updates): Json<NodeUpdate>,
) -> Result<Json<ConceptNode>, AppError> {
    state
        .graph()
        .update_node(&id, updates)
        .await
        .map(Json)
        .ok_or_else(|| AppError::not_found("Node not found"))
}
