use std::collections::HashMap;

use crate::mastery::event::{Confidence, InteractionEvent, InteractionKind};

/// Summary of identical events sharing (kind, duration) for one
/// (user, concept) pair. Ephemeral: recomputed on every scoring request.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedGroup {
    pub kind: InteractionKind,
    pub duration_seconds: u32,
    pub count: u32,
    pub confidence: Option<Confidence>,
}

/// Groups events by exact (kind, duration) value. Duration is part of the
/// key on purpose: the scorer weights total time as `count * duration` per
/// group instead of walking raw events. The highest confidence seen in a
/// group wins, which keeps the result independent of event order.
pub fn aggregate(events: &[InteractionEvent]) -> Vec<AggregatedGroup> {
    let mut groups: HashMap<(InteractionKind, u32), (u32, Option<Confidence>)> = HashMap::new();

    for event in events {
        let entry = groups
            .entry((event.kind.clone(), event.duration_seconds))
            .or_insert((0, None));
        entry.0 += 1;
        entry.1 = entry.1.max(event.confidence());
    }

    let mut out: Vec<AggregatedGroup> = groups
        .into_iter()
        .map(|((kind, duration_seconds), (count, confidence))| AggregatedGroup {
            kind,
            duration_seconds,
            count,
            confidence,
        })
        .collect();
    out.sort_by(|a, b| (&a.kind, a.duration_seconds).cmp(&(&b.kind, b.duration_seconds)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn event(kind: &str, duration: u32) -> InteractionEvent {
        InteractionEvent {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: "u1".to_string(),
            concept_id: "calc".to_string(),
            kind: InteractionKind::parse(kind),
            duration_seconds: duration,
            metadata: None,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn group_counts_sum_to_event_count() {
        let events = vec![
            event("visit", 0),
            event("visit", 0),
            event("visit", 600),
            event("read_article", 0),
            event("scrolled_past", 30),
        ];
        let groups = aggregate(&events);
        let total: u32 = groups.iter().map(|g| g.count).sum();
        assert_eq!(total as usize, events.len());
    }

    #[test]
    fn same_kind_different_durations_split_groups() {
        let events = vec![event("visit", 0), event("visit", 0), event("visit", 600)];
        let groups = aggregate(&events);
        assert_eq!(groups.len(), 2);
        let short = groups.iter().find(|g| g.duration_seconds == 0).unwrap();
        let long = groups.iter().find(|g| g.duration_seconds == 600).unwrap();
        assert_eq!(short.count, 2);
        assert_eq!(long.count, 1);
    }

    #[test]
    fn permutations_aggregate_identically() {
        let mut events = vec![
            event("visit", 0),
            event("read_article", 0),
            event("visit", 600),
            event("explore_subtopic", 0),
            event("visit", 0),
        ];
        let forward = aggregate(&events);
        events.reverse();
        let backward = aggregate(&events);
        assert_eq!(forward, backward);
    }

    #[test]
    fn highest_confidence_in_group_wins_regardless_of_order() {
        let mut low = event("read_article", 0);
        low.metadata = Some(json!({"confidence": "low"}));
        let mut high = event("read_article", 0);
        high.metadata = Some(json!({"confidence": "high"}));

        let a = aggregate(&[low.clone(), high.clone()]);
        let b = aggregate(&[high, low]);
        assert_eq!(a, b);
        assert_eq!(a[0].confidence, Some(Confidence::High));
    }

    #[test]
    fn empty_input_yields_no_groups() {
        assert!(aggregate(&[]).is_empty());
    }
}
