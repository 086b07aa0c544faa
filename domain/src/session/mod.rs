//! The session aggregate and its lobby features.
//!
//! - [`entities::Session`] - the shared, versioned session record
//! - [`topic::TopicSuggestion`] - lobby topic suggestions and votes

pub mod entities;
pub mod topic;

pub use entities::{GroupMode, HostRole, JoinOutcome, Session, SessionConfig, SessionStatus};
pub use topic::{TopicSuggestion, most_popular};
