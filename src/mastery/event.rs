use chrono::{DateTime, Utc};
use serde_json::Value;

/// One logged user activity against a concept node. Rows are append-only:
/// created once by the interaction store, never mutated or deleted.
#[derive(Debug, Clone)]
pub struct InteractionEvent {
    pub id: String,
    pub user_id: String,
    pub concept_id: String,
    pub kind: InteractionKind,
    pub duration_seconds: u32,
    pub metadata: Option<Value>,
    pub timestamp: DateTime<Utc>,
}

impl InteractionEvent {
    /// Reads `metadata.confidence` if present and well-formed. A missing or
    /// malformed value is simply `None`; it must never abort aggregation.
    pub fn confidence(&self) -> Option<Confidence> {
        let raw = self.metadata.as_ref()?.get("confidence")?.as_str()?;
        Confidence::parse(raw)
    }
}

/// The interaction kinds the scorer understands. The wire format is an open
/// string; anything unrecognized lands in `Unknown` and contributes to total
/// time only, which keeps old logs readable by newer code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InteractionKind {
    Visit,
    ExploreSubtopic,
    ReadArticle,
    WatchVideo,
    AlreadyFamiliar,
    ManualDecrease,
    Unknown(String),
}

impl InteractionKind {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "visit" => Self::Visit,
            "explore_subtopic" => Self::ExploreSubtopic,
            "read_article" => Self::ReadArticle,
            "watch_video" => Self::WatchVideo,
            "already_familiar" => Self::AlreadyFamiliar,
            "manual_decrease" => Self::ManualDecrease,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Visit => "visit",
            Self::ExploreSubtopic => "explore_subtopic",
            Self::ReadArticle => "read_article",
            Self::WatchVideo => "watch_video",
            Self::AlreadyFamiliar => "already_familiar",
            Self::ManualDecrease => "manual_decrease",
            Self::Unknown(other) => other.as_str(),
        }
    }
}

/// Self-reported confidence attached to `read_article` / `watch_video`
/// events. Scales the content boost; absent confidence uses the base boost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Confidence {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl Confidence {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "very_high" => Some(Self::VeryHigh),
            _ => None,
        }
    }

    /// Percentage-point boost one `read_article` event adds to content read.
    pub fn read_boost(confidence: Option<Self>) -> f64 {
        match confidence {
            Some(Self::Low) => 5.0,
            Some(Self::Medium) => 12.0,
            Some(Self::High) => 20.0,
            Some(Self::VeryHigh) | None => 25.0,
        }
    }

    /// Percentage-point boost one `watch_video` event adds to content read.
    pub fn watch_boost(confidence: Option<Self>) -> f64 {
        match confidence {
            Some(Self::Low) => 3.0,
            Some(Self::Medium) => 8.0,
            Some(Self::High) => 12.0,
            Some(Self::VeryHigh) | None => 15.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event_with_metadata(metadata: Option<Value>) -> InteractionEvent {
        InteractionEvent {
            id: "e1".to_string(),
            user_id: "u1".to_string(),
            concept_id: "calc".to_string(),
            kind: InteractionKind::ReadArticle,
            duration_seconds: 0,
            metadata,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn parses_known_kinds_and_preserves_unknown() {
        assert_eq!(InteractionKind::parse("visit"), InteractionKind::Visit);
        assert_eq!(
            InteractionKind::parse("already_familiar"),
            InteractionKind::AlreadyFamiliar
        );
        let unknown = InteractionKind::parse("scrolled_past");
        assert_eq!(unknown, InteractionKind::Unknown("scrolled_past".into()));
        assert_eq!(unknown.as_str(), "scrolled_past");
    }

    #[test]
    fn confidence_parses_defensively() {
        assert_eq!(Confidence::parse("very_high"), Some(Confidence::VeryHigh));
        assert_eq!(Confidence::parse(" HIGH "), Some(Confidence::High));
        assert_eq!(Confidence::parse("certain"), None);
        assert_eq!(Confidence::parse(""), None);
    }

    #[test]
    fn malformed_metadata_yields_no_confidence() {
        assert_eq!(event_with_metadata(None).confidence(), None);
        assert_eq!(
            event_with_metadata(Some(json!({"confidence": 7}))).confidence(),
            None
        );
        assert_eq!(
            event_with_metadata(Some(json!({"confidence": "bogus"}))).confidence(),
            None
        );
        assert_eq!(
            event_with_metadata(Some(json!({"confidence": "medium"}))).confidence(),
            Some(Confidence::Medium)
        );
    }
}
