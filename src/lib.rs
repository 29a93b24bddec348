pub mod config;
pub mod graph;
pub mod logging;
pub mod mastery;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::config::Config;
use crate::state::AppState;
use crate::store::WarehouseProxy;

/// Builds the full application router from environment configuration.
/// A warehouse that fails to connect is logged and left out; the server
/// still boots with degraded mastery routes.
pub async fn create_app() -> axum::Router {
    let config = Config::from_env();

    let warehouse = match WarehouseProxy::connect(&config.database_url).await {
        Ok(proxy) => Some(proxy),
        Err(err) => {
            warn!(error = %err, "warehouse not initialized, mastery routes degraded");
            None
        }
    };

    let state = AppState::new(warehouse, config.store_timeout());

    routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
