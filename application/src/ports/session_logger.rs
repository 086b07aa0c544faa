//! Port for structured session event logging.
//!
//! Defines the [`SessionEventLogger`] trait for recording what happened to a
//! session (joins, phase changes, rotations, write conflicts) to a structured
//! log.
//!
//! This is separate from `tracing`-based operation logs: tracing handles
//! human-readable diagnostic messages, while this port captures the session
//! history in a machine-readable format (JSONL).

use dialogos_domain::SessionId;
use serde_json::Value;

/// A structured session event for logging.
///
/// Each event has a type string, the session it concerns, and a JSON payload
/// containing event-specific fields. The adapter adds the timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionEvent {
    /// Event type identifier (e.g., "participant_joined", "phase_changed").
    pub event_type: &'static str,
    /// Session the event belongs to, if any.
    pub session_id: Option<SessionId>,
    /// JSON payload with event-specific data.
    pub payload: Value,
}

impl SessionEvent {
    pub fn new(event_type: &'static str, session_id: &SessionId, payload: Value) -> Self {
        Self {
            event_type,
            session_id: Some(session_id.clone()),
            payload,
        }
    }

    /// An event not tied to one session (e.g., a retention sweep).
    pub fn global(event_type: &'static str, payload: Value) -> Self {
        Self {
            event_type,
            session_id: None,
            payload,
        }
    }
}

/// Port for logging session events to a structured log.
///
/// `log` is synchronous and non-fallible; logging failures never disturb the
/// operation being logged.
pub trait SessionEventLogger: Send + Sync {
    /// Record a session event.
    fn log(&self, event: SessionEvent);
}

/// No-op implementation for tests and when logging is disabled.
pub struct NoSessionEventLogger;

impl SessionEventLogger for NoSessionEventLogger {
    fn log(&self, _event: SessionEvent) {}
}
