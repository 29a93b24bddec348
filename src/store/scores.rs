use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::Row;

use crate::mastery::score::MasterySnapshot;
use crate::store::{StoreError, WarehouseProxy};

/// Atomic replace of the snapshot row for (user, concept). No partial
/// updates; the scorer always writes a fully recomputed snapshot.
pub async fn upsert(proxy: &WarehouseProxy, snapshot: &MasterySnapshot) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO mastery_scores
          (user_id, node_id, mastery_score, revisit_count, total_time_spent,
           subtopics_explored, content_read_pct, last_updated)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (user_id, node_id) DO UPDATE SET
          mastery_score = excluded.mastery_score,
          revisit_count = excluded.revisit_count,
          total_time_spent = excluded.total_time_spent,
          subtopics_explored = excluded.subtopics_explored,
          content_read_pct = excluded.content_read_pct,
          last_updated = excluded.last_updated
        "#,
    )
    .bind(&snapshot.user_id)
    .bind(&snapshot.concept_id)
    .bind(snapshot.mastery_score)
    .bind(snapshot.revisit_count as i64)
    .bind(snapshot.total_time_spent_seconds as i64)
    .bind(snapshot.subtopics_explored as i64)
    .bind(snapshot.content_read_pct)
    .bind(
        snapshot
            .last_updated
            .to_rfc3339_opts(SecondsFormat::Millis, true),
    )
    .execute(proxy.pool())
    .await?;

    Ok(())
}

/// `None` when the pair was never scored; callers treat absence as score 0.
pub async fn get(
    proxy: &WarehouseProxy,
    user_id: &str,
    concept_id: &str,
) -> Result<Option<MasterySnapshot>, StoreError> {
    let row = sqlx::query(
        r#"
        SELECT user_id, node_id, mastery_score, revisit_count, total_time_spent,
               subtopics_explored, content_read_pct, last_updated
        FROM mastery_scores
        WHERE user_id = $1
          AND node_id = $2
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .bind(concept_id)
    .fetch_optional(proxy.pool())
    .await?;

    Ok(row.map(|row| map_row(&row)))
}

/// All snapshots for a user, mastery score descending. The node-id tiebreak
/// keeps the order stable within one call.
pub async fn list_for_user(
    proxy: &WarehouseProxy,
    user_id: &str,
) -> Result<Vec<MasterySnapshot>, StoreError> {
    let rows = sqlx::query(
        r#"
        SELECT user_id, node_id, mastery_score, revisit_count, total_time_spent,
               subtopics_explored, content_read_pct, last_updated
        FROM mastery_scores
        WHERE user_id = $1
        ORDER BY mastery_score DESC, node_id ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(proxy.pool())
    .await?;

    Ok(rows.iter().map(map_row).collect())
}

fn map_row(row: &sqlx::sqlite::SqliteRow) -> MasterySnapshot {
    let last_updated = row
        .try_get::<String, _>("last_updated")
        .ok()
        .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);

    MasterySnapshot {
        user_id: row.try_get::<String, _>("user_id").unwrap_or_default(),
        concept_id: row.try_get::<String, _>("node_id").unwrap_or_default(),
        mastery_score: row.try_get::<f64, _>("mastery_score").unwrap_or(0.0),
        revisit_count: row.try_get::<i64, _>("revisit_count").unwrap_or(0).max(0) as u32,
        total_time_spent_seconds: row
            .try_get::<i64, _>("total_time_spent")
            .unwrap_or(0)
            .max(0) as u64,
        subtopics_explored: row
            .try_get::<i64, _>("subtopics_explored")
            .unwrap_or(0)
            .max(0) as u32,
        content_read_pct: row.try_get::<f64, _>("content_read_pct").unwrap_or(0.0),
        last_updated,
    }
}
