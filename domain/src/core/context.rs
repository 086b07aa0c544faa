//! Request context passed into every mutating entry point.

use super::ids::ParticipantId;
use chrono::{DateTime, Utc};

/// Who is asking, and when.
///
/// The engine never reads a clock or an ambient identity on its own: every
/// mutating operation receives the acting participant and the current time
/// through this value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorContext {
    pub actor: ParticipantId,
    pub now: DateTime<Utc>,
}

impl ActorContext {
    pub fn new(actor: impl Into<ParticipantId>, now: DateTime<Utc>) -> Self {
        Self {
            actor: actor.into(),
            now,
        }
    }

    /// Context stamped with the current wall-clock time.
    pub fn now(actor: impl Into<ParticipantId>) -> Self {
        Self::new(actor, Utc::now())
    }
}
