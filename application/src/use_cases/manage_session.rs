//! Manage session use case
//!
//! Creating, reading and deleting session records, plus the participant-scoped
//! edits (join, leave, ready state, role choice, scribe notes, raised hand,
//! topic suggestions) and the host's whole-roster replacements.

use crate::config::EngineConfig;
use crate::ports::session_logger::{SessionEvent, SessionEventLogger};
use crate::ports::session_store::SessionStore;
use crate::use_cases::error::SessionServiceError;
use crate::use_cases::shared::{Mutation, SessionRecords};
use dialogos_domain::{
    ActorContext, DomainError, Group, GroupConfiguration, GroupMode, JoinOutcome, Participant, Role,
    Session, SessionConfig, SessionId, TopicSuggestion,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Use case for session records and participant-scoped edits
pub struct ManageSessionUseCase {
    records: SessionRecords,
}

impl ManageSessionUseCase {
    pub fn new(store: Arc<dyn SessionStore>, config: EngineConfig) -> Self {
        Self {
            records: SessionRecords::new(store, config),
        }
    }

    pub fn with_event_logger(mut self, logger: Arc<dyn SessionEventLogger>) -> Self {
        self.records.set_logger(logger);
        self
    }

    // ==================== Records ====================

    /// Create a single-group session hosted by `ctx.actor`.
    pub async fn create_session(
        &self,
        ctx: &ActorContext,
        host_name: &str,
        config: SessionConfig,
    ) -> Result<Session, SessionServiceError> {
        let session = Session::create(SessionId::new(Uuid::new_v4().to_string()), host_name, config, ctx)?;
        let id = session.session_id.clone();
        let stored = self
            .records
            .store()
            .insert(session)
            .await
            .map_err(|e| SessionServiceError::from_store(&id, e))?;

        info!("Created session {} ({}) hosted by {}", stored.session_id, stored.name, ctx.actor);
        self.records.log(SessionEvent::new(
            "session_created",
            &stored.session_id,
            json!({
                "host_id": ctx.actor.as_str(),
                "name": stored.name,
                "group_mode": stored.group_mode,
                "variant": stored.variant.as_str(),
            }),
        ));
        Ok(stored)
    }

    /// Create a multi-group session. Without an explicit configuration the
    /// engine's default group configuration applies.
    pub async fn create_group_session(
        &self,
        ctx: &ActorContext,
        host_name: &str,
        mut config: SessionConfig,
        groups: Option<GroupConfiguration>,
    ) -> Result<Session, SessionServiceError> {
        config.group_mode = GroupMode::Multi;
        config.group_configuration = groups.unwrap_or_else(|| self.records.config().default_groups.clone());
        self.create_session(ctx, host_name, config).await
    }

    pub async fn get_session(&self, id: &SessionId) -> Result<Option<Session>, SessionServiceError> {
        self.records.find(id).await
    }

    /// Like [`get_session`](Self::get_session), but a missing record is an error.
    pub async fn require_session(&self, id: &SessionId) -> Result<Session, SessionServiceError> {
        self.records.fetch(id).await
    }

    /// Host-only. Returns `false` if the record was already gone.
    pub async fn delete_session(&self, id: &SessionId, ctx: &ActorContext) -> Result<bool, SessionServiceError> {
        let Some(session) = self.records.find(id).await? else {
            return Ok(false);
        };
        if !session.is_host(&ctx.actor) {
            return Err(DomainError::Permission {
                actor: ctx.actor.to_string(),
                action: "delete the session",
            }
            .into());
        }
        let removed = self
            .records
            .store()
            .delete(id)
            .await
            .map_err(|e| SessionServiceError::from_store(id, e))?;
        if removed {
            info!("Deleted session {}", id);
        }
        Ok(removed)
    }

    // ==================== Membership ====================

    pub async fn join_session(
        &self,
        id: &SessionId,
        ctx: &ActorContext,
        name: &str,
        role: Role,
    ) -> Result<Mutation<JoinOutcome>, SessionServiceError> {
        let mutation = self.records.mutate(id, |s| s.join(ctx, name, role)).await?;
        if mutation.written {
            info!("Participant {} {:?} session {}", ctx.actor, mutation.outcome, id);
            self.records.log(SessionEvent::new(
                "participant_joined",
                id,
                json!({
                    "participant_id": ctx.actor.as_str(),
                    "name": name,
                    "role": role.as_str(),
                    "rejoined": mutation.outcome == JoinOutcome::Rejoined,
                }),
            ));
        }
        Ok(mutation)
    }

    pub async fn leave_session(&self, id: &SessionId, ctx: &ActorContext) -> Result<Mutation<bool>, SessionServiceError> {
        let mutation = self.records.mutate(id, |s| s.leave(ctx)).await?;
        if mutation.outcome {
            info!("Participant {} left session {}", ctx.actor, id);
            self.records.log(SessionEvent::new(
                "participant_left",
                id,
                json!({ "participant_id": ctx.actor.as_str() }),
            ));
        }
        Ok(mutation)
    }

    // ==================== Own entry ====================

    pub async fn update_ready_state(
        &self,
        id: &SessionId,
        ctx: &ActorContext,
        ready: bool,
    ) -> Result<Mutation<bool>, SessionServiceError> {
        debug!("Participant {} ready={} in session {}", ctx.actor, ready, id);
        self.records.mutate(id, |s| s.set_ready(ctx, ready)).await
    }

    pub async fn choose_role(
        &self,
        id: &SessionId,
        ctx: &ActorContext,
        role: Role,
    ) -> Result<Mutation<bool>, SessionServiceError> {
        self.records.mutate(id, |s| s.choose_role(ctx, role)).await
    }

    pub async fn signal_raised_hand(
        &self,
        id: &SessionId,
        ctx: &ActorContext,
        raised: bool,
    ) -> Result<Mutation<bool>, SessionServiceError> {
        self.records.mutate(id, |s| s.raise_hand(ctx, raised)).await
    }

    /// Replace the current round's notes. Only the actor's scribe may write.
    pub async fn update_scribe_notes(
        &self,
        id: &SessionId,
        ctx: &ActorContext,
        text: &str,
    ) -> Result<Mutation<()>, SessionServiceError> {
        self.records.mutate(id, |s| s.write_notes(ctx, text)).await
    }

    // ==================== Topics ====================

    pub async fn suggest_topic(
        &self,
        id: &SessionId,
        ctx: &ActorContext,
        topic: &str,
    ) -> Result<TopicSuggestion, SessionServiceError> {
        let suggestion_id = Uuid::new_v4().to_string();
        let mutation = self
            .records
            .mutate(id, |s| s.add_topic_suggestion(ctx, suggestion_id, topic).cloned())
            .await?;
        Ok(mutation.outcome)
    }

    /// Toggle the actor's vote. Returns `true` if the vote now counts.
    pub async fn vote_for_topic(
        &self,
        id: &SessionId,
        ctx: &ActorContext,
        suggestion_id: &str,
    ) -> Result<bool, SessionServiceError> {
        let mutation = self
            .records
            .mutate(id, |s| s.vote_for_topic(ctx, suggestion_id))
            .await?;
        Ok(mutation.outcome)
    }

    pub async fn popular_topics(&self, id: &SessionId, limit: usize) -> Result<Vec<TopicSuggestion>, SessionServiceError> {
        let session = self.records.fetch(id).await?;
        Ok(session.popular_topics(limit).into_iter().cloned().collect())
    }

    // ==================== Host: whole-record edits ====================

    pub async fn update_participants(
        &self,
        id: &SessionId,
        ctx: &ActorContext,
        participants: Vec<Participant>,
    ) -> Result<Mutation<()>, SessionServiceError> {
        self.records
            .mutate(id, |s| s.replace_participants(ctx, participants))
            .await
    }

    pub async fn update_groups(
        &self,
        id: &SessionId,
        ctx: &ActorContext,
        groups: Vec<Group>,
    ) -> Result<Mutation<()>, SessionServiceError> {
        self.records.mutate(id, |s| s.replace_groups(ctx, groups)).await
    }
}
