use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use tracing::warn;

use crate::mastery::aggregate::aggregate;
use crate::mastery::event::InteractionEvent;
use crate::mastery::score::{score_groups, MasterySnapshot};
use crate::store::interactions::{self, NewInteraction};
use crate::store::{scores, StoreError, WarehouseProxy};

/// Appends one interaction event. Validation failures surface to the caller;
/// everything else is a store fault the HTTP layer degrades on.
pub async fn log_interaction(
    proxy: &WarehouseProxy,
    timeout: Duration,
    interaction: NewInteraction,
) -> Result<InteractionEvent, StoreError> {
    bounded(timeout, interactions::record(proxy, interaction)).await
}

/// Recomputes the mastery snapshot for a (user, concept) pair from the full
/// interaction history and persists it. A failed persist is logged and
/// swallowed; the freshly computed snapshot is still returned so reads never
/// go stale because of a write fault.
pub async fn score_concept(
    proxy: &WarehouseProxy,
    timeout: Duration,
    user_id: &str,
    concept_id: &str,
) -> Result<MasterySnapshot, StoreError> {
    let events = bounded(timeout, interactions::list_for(proxy, user_id, concept_id)).await?;
    let groups = aggregate(&events);
    let snapshot = score_groups(user_id, concept_id, &groups, Utc::now());

    if let Err(err) = bounded(timeout, scores::upsert(proxy, &snapshot)).await {
        warn!(
            error = %err,
            user_id,
            concept_id,
            "snapshot upsert failed, returning computed score"
        );
    }

    Ok(snapshot)
}

/// Every persisted snapshot for a user, highest mastery first.
pub async fn all_scores(
    proxy: &WarehouseProxy,
    timeout: Duration,
    user_id: &str,
) -> Result<Vec<MasterySnapshot>, StoreError> {
    bounded(timeout, scores::list_for_user(proxy, user_id)).await
}

/// Caps a store call at the configured timeout so one slow warehouse query
/// never wedges a request handler.
async fn bounded<T, F>(timeout: Duration, fut: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout),
    }
}
