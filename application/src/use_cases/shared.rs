//! Shared record access for use cases.
//!
//! Every mutation follows the same shape: fetch the record (retrying
//! transport failures with backoff), run the domain operation on a copy,
//! and write it back under the configured [`WritePolicy`].

use crate::config::{EngineConfig, WritePolicy};
use crate::ports::session_logger::{NoSessionEventLogger, SessionEvent, SessionEventLogger};
use crate::ports::session_store::{SessionStore, StoreError};
use crate::use_cases::error::SessionServiceError;
use dialogos_domain::{DomainError, GroupId, PhaseAction, PhaseChange, Session, SessionId};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

/// Result of a read-modify-write.
#[derive(Debug, Clone)]
pub struct Mutation<T> {
    /// The record as stored after the write (or as read, if nothing changed).
    pub session: Session,
    pub outcome: T,
    /// `false` when the operation left the record untouched and no write was issued.
    pub written: bool,
}

#[derive(Clone)]
pub(crate) struct SessionRecords {
    store: Arc<dyn SessionStore>,
    config: EngineConfig,
    logger: Arc<dyn SessionEventLogger>,
}

impl SessionRecords {
    pub(crate) fn new(store: Arc<dyn SessionStore>, config: EngineConfig) -> Self {
        Self {
            store,
            config,
            logger: Arc::new(NoSessionEventLogger),
        }
    }

    pub(crate) fn set_logger(&mut self, logger: Arc<dyn SessionEventLogger>) {
        self.logger = logger;
    }

    pub(crate) fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub(crate) fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub(crate) fn log(&self, event: SessionEvent) {
        self.logger.log(event);
    }

    /// Read a record, retrying transport failures with exponential backoff.
    pub(crate) async fn find(&self, id: &SessionId) -> Result<Option<Session>, SessionServiceError> {
        let mut attempt = 0;
        loop {
            match self.store.get(id).await {
                Ok(found) => return Ok(found),
                Err(e) if e.is_transient() && attempt < self.config.transport_retries => {
                    attempt += 1;
                    let delay = self.config.backoff(attempt);
                    debug!(
                        "Read of session {} failed ({}), retry {}/{} in {:?}",
                        id, e, attempt, self.config.transport_retries, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(SessionServiceError::from_store(id, e)),
            }
        }
    }

    pub(crate) async fn fetch(&self, id: &SessionId) -> Result<Session, SessionServiceError> {
        self.find(id)
            .await?
            .ok_or_else(|| SessionServiceError::session_not_found(id))
    }

    /// Fetch, apply `op`, and write back if anything changed.
    ///
    /// A domain error leaves the stored record untouched.
    pub(crate) async fn mutate<T, F>(&self, id: &SessionId, op: F) -> Result<Mutation<T>, SessionServiceError>
    where
        F: FnOnce(&mut Session) -> Result<T, DomainError>,
    {
        let mut session = self.fetch(id).await?;
        let before = session.clone();
        let outcome = op(&mut session)?;
        if session == before {
            return Ok(Mutation {
                session,
                outcome,
                written: false,
            });
        }
        let session = self.write(session).await?;
        Ok(Mutation {
            session,
            outcome,
            written: true,
        })
    }

    async fn write(&self, session: Session) -> Result<Session, SessionServiceError> {
        let id = session.session_id.clone();
        let expected = session.version;
        match self.store.save(session.clone(), Some(expected)).await {
            Ok(stored) => Ok(stored),
            Err(StoreError::Conflict { expected, actual }) => {
                warn!(
                    "Concurrent write on session {}: read version {}, stored {} ({})",
                    id, expected, actual, self.config.write_policy
                );
                self.log(SessionEvent::new(
                    "write_conflict",
                    &id,
                    json!({
                        "expected": expected,
                        "actual": actual,
                        "policy": self.config.write_policy.as_str(),
                    }),
                ));
                match self.config.write_policy {
                    WritePolicy::CompareAndSwap => Err(SessionServiceError::ConcurrentWriteConflict {
                        session_id: id,
                        expected,
                        actual,
                    }),
                    WritePolicy::LastWriterWins => self
                        .store
                        .save(session, None)
                        .await
                        .map_err(|e| SessionServiceError::from_store(&id, e)),
                }
            }
            Err(e) => Err(SessionServiceError::from_store(&id, e)),
        }
    }

    /// Record the events implied by a phase step.
    pub(crate) fn log_phase_change(
        &self,
        session_id: &SessionId,
        group_id: Option<&GroupId>,
        action: Option<PhaseAction>,
        change: &PhaseChange,
    ) {
        if !change.applied {
            return;
        }
        let group = group_id.map(|g| g.to_string());
        if let Some(round) = change.flushed_round {
            self.log(SessionEvent::new(
                "notes_flushed",
                session_id,
                json!({ "group_id": group, "round": round }),
            ));
        }
        if action == Some(PhaseAction::CompleteRound) {
            let completed = if change.rotated {
                change.round.saturating_sub(1)
            } else {
                change.round
            };
            self.log(SessionEvent::new(
                "round_completed",
                session_id,
                json!({ "group_id": group, "round": completed }),
            ));
        }
        if change.rotated {
            self.log(SessionEvent::new(
                "roles_rotated",
                session_id,
                json!({ "group_id": group, "round": change.round }),
            ));
        }
        self.log(SessionEvent::new(
            "phase_changed",
            session_id,
            json!({
                "group_id": group,
                "from": change.from.as_str(),
                "to": change.to.as_str(),
                "round": change.round,
            }),
        ));
    }
}
