use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::Row;
use uuid::Uuid;

use crate::mastery::event::{InteractionEvent, InteractionKind};
use crate::store::{StoreError, WarehouseProxy};

/// Payload for appending one interaction row. The kind stays an open string
/// at this boundary; unknown kinds and unknown concept ids are accepted
/// silently.
#[derive(Debug, Clone)]
pub struct NewInteraction {
    pub user_id: String,
    pub concept_id: String,
    pub kind: String,
    pub duration_seconds: u32,
    pub metadata: Option<serde_json::Value>,
}

/// Appends one immutable event row. Rows are never updated or deleted.
pub async fn record(
    proxy: &WarehouseProxy,
    interaction: NewInteraction,
) -> Result<InteractionEvent, StoreError> {
    if interaction.user_id.trim().is_empty()
        || interaction.concept_id.trim().is_empty()
        || interaction.kind.trim().is_empty()
    {
        return Err(StoreError::Validation(
            "Missing required fields: userId, nodeId, interactionType".to_string(),
        ));
    }

    let id = Uuid::new_v4().to_string();
    let timestamp = Utc::now();
    let metadata_json = interaction
        .metadata
        .as_ref()
        .map(|value| value.to_string());

    sqlx::query(
        r#"
        INSERT INTO user_interactions
          (id, user_id, node_id, interaction_type, duration_seconds, metadata, timestamp)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(&id)
    .bind(interaction.user_id.trim())
    .bind(interaction.concept_id.trim())
    .bind(interaction.kind.trim())
    .bind(interaction.duration_seconds as i64)
    .bind(metadata_json)
    .bind(timestamp.to_rfc3339_opts(SecondsFormat::Millis, true))
    .execute(proxy.pool())
    .await?;

    Ok(InteractionEvent {
        id,
        user_id: interaction.user_id.trim().to_string(),
        concept_id: interaction.concept_id.trim().to_string(),
        kind: InteractionKind::parse(interaction.kind.trim()),
        duration_seconds: interaction.duration_seconds,
        metadata: interaction.metadata,
        timestamp,
    })
}

/// All events for a (user, concept) pair, empty when none exist. Order is
/// irrelevant downstream; aggregation is order-independent.
pub async fn list_for(
    proxy: &WarehouseProxy,
    user_id: &str,
    concept_id: &str,
) -> Result<Vec<InteractionEvent>, StoreError> {
    let rows = sqlx::query(
        r#"
        SELECT id, interaction_type, duration_seconds, metadata, timestamp
        FROM user_interactions
        WHERE user_id = $1
          AND node_id = $2
        "#,
    )
    .bind(user_id)
    .bind(concept_id)
    .fetch_all(proxy.pool())
    .await?;

    let mut events = Vec::with_capacity(rows.len());
    for row in rows {
        let metadata = row
            .try_get::<Option<String>, _>("metadata")
            .unwrap_or(None)
            .and_then(|raw| serde_json::from_str(&raw).ok());
        let timestamp = row
            .try_get::<String, _>("timestamp")
            .ok()
            .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);

        events.push(InteractionEvent {
            id: row.try_get::<String, _>("id").unwrap_or_default(),
            user_id: user_id.to_string(),
            concept_id: concept_id.to_string(),
            kind: InteractionKind::parse(
                &row.try_get::<String, _>("interaction_type")
                    .unwrap_or_default(),
            ),
            duration_seconds: row
                .try_get::<i64, _>("duration_seconds")
                .unwrap_or(0)
                .max(0) as u32,
            metadata,
            timestamp,
        });
    }
    Ok(events)
}
