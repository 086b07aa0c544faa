//! Purge sessions use case
//!
//! Completed sessions are inert. Once they have been completed for longer
//! than the configured retention they are deleted from the store.

use crate::config::EngineConfig;
use crate::ports::session_logger::{SessionEvent, SessionEventLogger};
use crate::ports::session_store::SessionStore;
use crate::use_cases::error::SessionServiceError;
use crate::use_cases::shared::SessionRecords;
use chrono::{DateTime, Utc};
use dialogos_domain::SessionId;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

/// Use case for the retention sweep
pub struct PurgeSessionsUseCase {
    records: SessionRecords,
}

impl PurgeSessionsUseCase {
    pub fn new(store: Arc<dyn SessionStore>, config: EngineConfig) -> Self {
        Self {
            records: SessionRecords::new(store, config),
        }
    }

    pub fn with_event_logger(mut self, logger: Arc<dyn SessionEventLogger>) -> Self {
        self.records.set_logger(logger);
        self
    }

    /// Delete every expired session. Returns how many were removed.
    ///
    /// A failed delete is logged and skipped; the sweep carries on.
    pub async fn purge_completed(&self, now: DateTime<Utc>) -> Result<usize, SessionServiceError> {
        let store = self.records.store();
        let retention = self.records.config().retention_period();
        let expired: Vec<SessionId> = store
            .list()
            .await
            .map_err(|e| SessionServiceError::Transport(e.to_string()))?
            .into_iter()
            .filter(|s| s.is_expired(now, retention))
            .map(|s| s.session_id)
            .collect();

        let mut removed = Vec::new();
        for id in expired {
            match store.delete(&id).await {
                Ok(true) => removed.push(id),
                Ok(false) => {}
                Err(e) => warn!("Could not purge session {}: {}", id, e),
            }
        }

        if !removed.is_empty() {
            info!("Purged {} expired session(s)", removed.len());
            self.records.log(SessionEvent::global(
                "sessions_purged",
                json!({
                    "count": removed.len(),
                    "session_ids": removed.iter().map(|id| id.as_str()).collect::<Vec<_>>(),
                }),
            ));
        }
        Ok(removed.len())
    }
}
