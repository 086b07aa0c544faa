//! Errors surfaced by the session use cases.

use crate::ports::session_store::StoreError;
use dialogos_domain::{DomainError, EntityKind, SessionId};
use thiserror::Error;

/// Coarse error taxonomy surfaced to callers.
///
/// | Category | Raised when |
/// |----------|-------------|
/// | `NotFound` | session, group, participant or topic missing |
/// | `Permission` | a non-host attempts a host-only step, or a participant edits someone else's entry |
/// | `InvalidConfiguration` | roster or group configuration rejected |
/// | `InvalidTransition` | the current phase does not allow the action |
/// | `ConcurrentWriteConflict` | the record changed between read and write |
/// | `Transport` | the session store could not be reached |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    NotFound,
    Permission,
    InvalidConfiguration,
    InvalidTransition,
    ConcurrentWriteConflict,
    Transport,
}

impl ErrorCategory {
    pub fn code(&self) -> &'static str {
        match self {
            ErrorCategory::NotFound => "NOT_FOUND",
            ErrorCategory::Permission => "PERMISSION",
            ErrorCategory::InvalidConfiguration => "INVALID_CONFIGURATION",
            ErrorCategory::InvalidTransition => "INVALID_TRANSITION",
            ErrorCategory::ConcurrentWriteConflict => "CONCURRENT_WRITE_CONFLICT",
            ErrorCategory::Transport => "TRANSPORT",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors that can occur in session use cases
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("session {session_id} was modified concurrently (read version {expected}, stored {actual})")]
    ConcurrentWriteConflict {
        session_id: SessionId,
        expected: u64,
        actual: u64,
    },

    #[error("transport error: {0}")]
    Transport(String),
}

impl SessionServiceError {
    /// Translate a store failure for the given session.
    pub fn from_store(session_id: &SessionId, error: StoreError) -> Self {
        match error {
            StoreError::Conflict { expected, actual } => SessionServiceError::ConcurrentWriteConflict {
                session_id: session_id.clone(),
                expected,
                actual,
            },
            StoreError::NotFound(id) => DomainError::not_found(EntityKind::Session, id).into(),
            StoreError::AlreadyExists(id) => {
                DomainError::invalid_configuration(format!("Session {} already exists", id)).into()
            }
            StoreError::Unavailable(message) | StoreError::Serialization(message) => {
                SessionServiceError::Transport(message)
            }
        }
    }

    pub fn session_not_found(session_id: &SessionId) -> Self {
        DomainError::not_found(EntityKind::Session, session_id).into()
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            SessionServiceError::Domain(error) => match error {
                DomainError::NotFound { .. } => ErrorCategory::NotFound,
                DomainError::Permission { .. } => ErrorCategory::Permission,
                DomainError::InvalidConfiguration(_) | DomainError::RoleUnavailable(_) => {
                    ErrorCategory::InvalidConfiguration
                }
                DomainError::InvalidTransition { .. } => ErrorCategory::InvalidTransition,
            },
            SessionServiceError::ConcurrentWriteConflict { .. } => {
                ErrorCategory::ConcurrentWriteConflict
            }
            SessionServiceError::Transport(_) => ErrorCategory::Transport,
        }
    }

    /// Message suitable for end users.
    pub fn user_message(&self) -> String {
        match self {
            SessionServiceError::Domain(DomainError::NotFound {
                entity: EntityKind::Session,
                ..
            }) => "session not found".to_string(),
            SessionServiceError::ConcurrentWriteConflict { .. } => {
                "the session changed while you were editing it; please retry".to_string()
            }
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dialogos_domain::Role;

    #[test]
    fn test_categories() {
        let not_found = SessionServiceError::session_not_found(&SessionId::new("s1"));
        assert_eq!(not_found.category(), ErrorCategory::NotFound);

        let permission: SessionServiceError = DomainError::Permission {
            actor: "bob".to_string(),
            action: "complete the round",
        }
        .into();
        assert_eq!(permission.category(), ErrorCategory::Permission);

        let role: SessionServiceError = DomainError::RoleUnavailable(Role::Speaker).into();
        assert_eq!(role.category(), ErrorCategory::InvalidConfiguration);

        let transport = SessionServiceError::Transport("down".to_string());
        assert_eq!(transport.category(), ErrorCategory::Transport);
    }

    #[test]
    fn test_from_store() {
        let id = SessionId::new("s1");
        let conflict = SessionServiceError::from_store(
            &id,
            StoreError::Conflict {
                expected: 2,
                actual: 3,
            },
        );
        assert_eq!(
            conflict,
            SessionServiceError::ConcurrentWriteConflict {
                session_id: id.clone(),
                expected: 2,
                actual: 3,
            }
        );

        let unavailable = SessionServiceError::from_store(&id, StoreError::Unavailable("timeout".into()));
        assert_eq!(unavailable.category(), ErrorCategory::Transport);

        let missing = SessionServiceError::from_store(&id, StoreError::NotFound(id.clone()));
        assert_eq!(missing.category(), ErrorCategory::NotFound);
    }

    #[test]
    fn test_user_message() {
        let missing = SessionServiceError::session_not_found(&SessionId::new("s1"));
        assert_eq!(missing.user_message(), "session not found");

        let transport = SessionServiceError::Transport("connection reset".to_string());
        assert_eq!(transport.user_message(), "transport error: connection reset");
    }

    #[test]
    fn test_category_code() {
        assert_eq!(ErrorCategory::ConcurrentWriteConflict.to_string(), "CONCURRENT_WRITE_CONFLICT");
    }
}
