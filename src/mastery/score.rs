use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::mastery::aggregate::AggregatedGroup;
use crate::mastery::event::{Confidence, InteractionKind};

const REVISIT_CAP: u32 = 5;
const TIME_CAP_SECONDS: u64 = 3_600;
const SUBTOPIC_CAP: u32 = 5;
const COMPONENT_WEIGHT: f64 = 25.0;

/// Last-computed mastery score and its sub-metrics for one (user, concept)
/// pair. Replaced wholesale on every recompute; never deleted.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MasterySnapshot {
    pub user_id: String,
    #[serde(rename = "nodeId")]
    pub concept_id: String,
    pub mastery_score: f64,
    pub revisit_count: u32,
    pub total_time_spent_seconds: u64,
    pub subtopics_explored: u32,
    pub content_read_pct: f64,
    pub last_updated: DateTime<Utc>,
}

impl MasterySnapshot {
    /// Field-wise equality ignoring the recompute timestamp.
    pub fn same_metrics(&self, other: &MasterySnapshot) -> bool {
        self.user_id == other.user_id
            && self.concept_id == other.concept_id
            && self.mastery_score == other.mastery_score
            && self.revisit_count == other.revisit_count
            && self.total_time_spent_seconds == other.total_time_spent_seconds
            && self.subtopics_explored == other.subtopics_explored
            && self.content_read_pct == other.content_read_pct
    }
}

/// Reduces aggregated groups to a snapshot. Pure and order-independent: any
/// permutation of the same group set yields the same result, so callers may
/// feed groups in whatever order the store returns them.
///
/// `already_familiar` is a terminal override: one such event anywhere in the
/// history forces the score to 100 and floors the sub-metrics, no matter
/// what else was logged.
pub fn score_groups(
    user_id: &str,
    concept_id: &str,
    groups: &[AggregatedGroup],
    now: DateTime<Utc>,
) -> MasterySnapshot {
    let mut revisit_count: u32 = 0;
    let mut total_time: u64 = 0;
    let mut subtopics_explored: u32 = 0;
    let mut content_read_pct: f64 = 0.0;
    let mut already_familiar = false;

    for group in groups {
        let count = group.count;
        // Duration accumulates for every kind, recognized or not.
        total_time += count as u64 * group.duration_seconds as u64;

        match &group.kind {
            InteractionKind::Visit => {
                if count > 1 {
                    revisit_count = revisit_count.max(count);
                }
            }
            InteractionKind::ExploreSubtopic => {
                subtopics_explored += count;
            }
            InteractionKind::ReadArticle => {
                let boost = Confidence::read_boost(group.confidence);
                content_read_pct = (content_read_pct + boost * count as f64).min(100.0);
            }
            InteractionKind::WatchVideo => {
                let boost = Confidence::watch_boost(group.confidence);
                content_read_pct = (content_read_pct + boost * count as f64).min(100.0);
            }
            InteractionKind::AlreadyFamiliar => {
                already_familiar = true;
            }
            InteractionKind::ManualDecrease => {
                // Explicit downgrade signal; the score only drops through
                // absent positive signal, so no component is credited.
            }
            InteractionKind::Unknown(_) => {}
        }
    }

    let mastery_score;
    if already_familiar {
        mastery_score = 100.0;
        content_read_pct = 100.0;
        total_time = total_time.max(TIME_CAP_SECONDS);
        revisit_count = revisit_count.max(REVISIT_CAP);
    } else {
        let revisit_score =
            revisit_count.min(REVISIT_CAP) as f64 / REVISIT_CAP as f64 * COMPONENT_WEIGHT;
        let time_score =
            total_time.min(TIME_CAP_SECONDS) as f64 / TIME_CAP_SECONDS as f64 * COMPONENT_WEIGHT;
        let subtopic_score =
            subtopics_explored.min(SUBTOPIC_CAP) as f64 / SUBTOPIC_CAP as f64 * COMPONENT_WEIGHT;
        let content_score = content_read_pct.min(100.0) / 100.0 * COMPONENT_WEIGHT;
        mastery_score =
            (revisit_score + time_score + subtopic_score + content_score).clamp(0.0, 100.0);
    }

    MasterySnapshot {
        user_id: user_id.to_string(),
        concept_id: concept_id.to_string(),
        mastery_score,
        revisit_count,
        total_time_spent_seconds: total_time,
        subtopics_explored,
        content_read_pct,
        last_updated: now,
    }
}
