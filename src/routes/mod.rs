use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Router;

use crate::response::json_error;
use crate::state::AppState;

mod ai;
mod health;
mod mastery;
mod references;
mod tree;

pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/api/tree", tree::router())
        .nest("/api/ai", ai::router())
        .nest("/api/mastery", mastery::router())
        .nest("/api/references", references::router())
        .nest("/health", health::router())
        .nest("/api/health", health::router())
        .fallback(not_found)
        .with_state(state)
}

async fn not_found() -> Response {
    json_error(StatusCode::NOT_FOUND, "NOT_FOUND", "Route not found").into_response()
}
