//! Group dashboard use case
//!
//! Host controls for multi-group sessions: start, pause or end one group or
//! all of them, and per-group progress. Aggregate operations keep going past
//! a failing group and report which groups failed.

use crate::config::EngineConfig;
use crate::ports::session_logger::{SessionEvent, SessionEventLogger};
use crate::ports::session_store::SessionStore;
use crate::use_cases::error::SessionServiceError;
use crate::use_cases::shared::{Mutation, SessionRecords};
use dialogos_domain::{
    ActorContext, AggregateOutcome, DomainError, GroupId, GroupProgress, GroupStatusChange, Session,
    SessionId,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

/// Use case for the multi-group host dashboard
pub struct GroupDashboardUseCase {
    records: SessionRecords,
}

impl GroupDashboardUseCase {
    pub fn new(store: Arc<dyn SessionStore>, config: EngineConfig) -> Self {
        Self {
            records: SessionRecords::new(store, config),
        }
    }

    pub fn with_event_logger(mut self, logger: Arc<dyn SessionEventLogger>) -> Self {
        self.records.set_logger(logger);
        self
    }

    // ==================== Single group ====================

    /// Start a waiting group, or resume a paused one.
    pub async fn start_group(
        &self,
        id: &SessionId,
        ctx: &ActorContext,
        group_id: &GroupId,
    ) -> Result<Mutation<GroupStatusChange>, SessionServiceError> {
        self.single(id, |s| s.start_group(ctx, group_id)).await
    }

    pub async fn pause_group(
        &self,
        id: &SessionId,
        ctx: &ActorContext,
        group_id: &GroupId,
    ) -> Result<Mutation<GroupStatusChange>, SessionServiceError> {
        self.single(id, |s| s.pause_group(ctx, group_id)).await
    }

    pub async fn end_group(
        &self,
        id: &SessionId,
        ctx: &ActorContext,
        group_id: &GroupId,
    ) -> Result<Mutation<GroupStatusChange>, SessionServiceError> {
        self.single(id, |s| s.end_group(ctx, group_id)).await
    }

    // ==================== All groups ====================

    pub async fn start_all_groups(
        &self,
        id: &SessionId,
        ctx: &ActorContext,
    ) -> Result<Mutation<AggregateOutcome>, SessionServiceError> {
        self.aggregate(id, "start", |s| s.start_all_groups(ctx)).await
    }

    pub async fn pause_all_groups(
        &self,
        id: &SessionId,
        ctx: &ActorContext,
    ) -> Result<Mutation<AggregateOutcome>, SessionServiceError> {
        self.aggregate(id, "pause", |s| s.pause_all_groups(ctx)).await
    }

    pub async fn end_all_groups(
        &self,
        id: &SessionId,
        ctx: &ActorContext,
    ) -> Result<Mutation<AggregateOutcome>, SessionServiceError> {
        self.aggregate(id, "end", |s| s.end_all_groups(ctx)).await
    }

    /// Per-group progress for the dashboard.
    pub async fn progress(&self, id: &SessionId) -> Result<Vec<GroupProgress>, SessionServiceError> {
        Ok(self.records.fetch(id).await?.progress())
    }

    // ==================== Internals ====================

    async fn single<F>(&self, id: &SessionId, op: F) -> Result<Mutation<GroupStatusChange>, SessionServiceError>
    where
        F: FnOnce(&mut Session) -> Result<GroupStatusChange, DomainError>,
    {
        let mutation = self.records.mutate(id, op).await?;
        self.log_change(id, &mutation.outcome);
        Ok(mutation)
    }

    async fn aggregate<F>(
        &self,
        id: &SessionId,
        verb: &str,
        op: F,
    ) -> Result<Mutation<AggregateOutcome>, SessionServiceError>
    where
        F: FnOnce(&mut Session) -> Result<AggregateOutcome, DomainError>,
    {
        let mutation = self.records.mutate(id, op).await?;
        let outcome = &mutation.outcome;
        for change in &outcome.succeeded {
            self.log_change(id, change);
        }
        for (group_id, error) in &outcome.failed {
            warn!("Could not {} group {} in session {}: {}", verb, group_id, id, error);
        }
        info!(
            "{} all groups in session {}: {} changed, {} failed",
            verb,
            id,
            outcome.changed(),
            outcome.failed.len()
        );
        Ok(mutation)
    }

    fn log_change(&self, id: &SessionId, change: &GroupStatusChange) {
        if !change.applied {
            return;
        }
        info!("Group {} in session {}: {} -> {}", change.group_id, id, change.from, change.to);
        self.records.log(SessionEvent::new(
            "group_status_changed",
            id,
            json!({
                "group_id": change.group_id.as_str(),
                "from": change.from.as_str(),
                "to": change.to.as_str(),
            }),
        ));
    }
}
