pub mod interactions;
pub mod scores;

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use thiserror::Error;

/// Error taxonomy for the warehouse boundary. Only `Validation` ever
/// surfaces to HTTP callers as a hard failure; everything else is degraded
/// to a default value or a "queued" acknowledgement by the service layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store call timed out")]
    Timeout,
    #[error(transparent)]
    Sql(#[from] sqlx::Error),
}

const SCHEMA_STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS user_interactions (
      id TEXT PRIMARY KEY,
      user_id TEXT NOT NULL,
      node_id TEXT NOT NULL,
      interaction_type TEXT NOT NULL,
      duration_seconds INTEGER NOT NULL DEFAULT 0,
      metadata TEXT,
      timestamp TEXT NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_interactions_user_node
      ON user_interactions (user_id, node_id)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS mastery_scores (
      user_id TEXT NOT NULL,
      node_id TEXT NOT NULL,
      mastery_score REAL NOT NULL,
      revisit_count INTEGER NOT NULL,
      total_time_spent INTEGER NOT NULL,
      subtopics_explored INTEGER NOT NULL,
      content_read_pct REAL NOT NULL,
      last_updated TEXT NOT NULL,
      PRIMARY KEY (user_id, node_id)
    )
    "#,
];

/// Connection handle to the local analytics warehouse. The interaction log
/// and the score snapshots live here; everything else in the app is
/// in-memory state.
#[derive(Clone)]
pub struct WarehouseProxy {
    pool: SqlitePool,
}

impl WarehouseProxy {
    pub async fn connect(url: &str) -> Result<Arc<Self>, StoreError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(StoreError::Sql)?
            .create_if_missing(true);

        // An in-memory database is per-connection; the pool must not hand
        // out a second connection with a different (empty) database.
        let max_connections = if url.contains(":memory:") || url.contains("mode=memory") {
            1
        } else {
            5
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(options)
            .await?;

        for statement in SCHEMA_STATEMENTS {
            sqlx::query(statement).execute(&pool).await?;
        }

        Ok(Arc::new(Self { pool }))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
