pub mod aggregate;
pub mod event;
pub mod score;

pub use aggregate::{aggregate, AggregatedGroup};
pub use event::{Confidence, InteractionEvent, InteractionKind};
pub use score::{score_groups, MasterySnapshot};
