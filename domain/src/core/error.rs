//! Domain error types

use crate::dialogue::phase::Phase;
use crate::participant::Role;
use thiserror::Error;

/// Kind of entity a lookup failed for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Session,
    Group,
    Participant,
    TopicSuggestion,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Session => "session",
            EntityKind::Group => "group",
            EntityKind::Participant => "participant",
            EntityKind::TopicSuggestion => "topic suggestion",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: EntityKind, id: String },

    #[error("participant {actor} is not permitted to {action}")]
    Permission { actor: String, action: &'static str },

    #[error("invalid configuration: {}", .0.join("; "))]
    InvalidConfiguration(Vec<String>),

    #[error("cannot {action} while in phase '{phase}'")]
    InvalidTransition { action: &'static str, phase: Phase },

    #[error("role '{0}' is not available")]
    RoleUnavailable(Role),
}

impl DomainError {
    pub fn not_found(entity: EntityKind, id: impl std::fmt::Display) -> Self {
        DomainError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        DomainError::InvalidConfiguration(vec![message.into()])
    }

    /// Check if this error is an authority rejection
    pub fn is_permission(&self) -> bool {
        matches!(self, DomainError::Permission { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DomainError::NotFound { .. })
    }
}
