use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tracing::warn;

use crate::services::reference::{ArxivPaper, ReferenceError, VideoResult, WikipediaSummary};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:concept", get(get_references))
        .route("/arxiv/:concept", get(get_arxiv))
}

#[derive(Debug, Serialize)]
struct ConceptReferences {
    wikipedia: Option<WikipediaSummary>,
    youtube: Vec<VideoResult>,
}

/// Both sources are fetched concurrently and each degrades on its own:
/// a missing YouTube key or dead Wikipedia never fails the request.
async fn get_references(
    State(state): State<AppState>,
    Path(concept): Path<String>,
) -> Json<ConceptReferences> {
    let refs = state.references();
    let (wikipedia, youtube) = tokio::join!(
        refs.wikipedia_summary(state.advisor(), &concept),
        refs.youtube_videos(&concept),
    );

    let youtube = youtube.unwrap_or_else(|err| {
        match err {
            ReferenceError::MissingApiKey(_) => {}
            other => warn!(error = %other, %concept, "video lookup failed"),
        }
        Vec::new()
    });

    Json(ConceptReferences { wikipedia, youtube })
}

async fn get_arxiv(
    State(state): State<AppState>,
    Path(concept): Path<String>,
) -> Json<Vec<ArxivPaper>> {
    let papers = state
        .references()
        .arxiv_papers(&concept)
        .await
        .unwrap_or_else(|err| {
            warn!(error = %err, %concept, "paper lookup failed");
            Vec::new()
        });
    Json(papers)
}
