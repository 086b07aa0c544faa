//! Run session use case
//!
//! Host-only control of the phase machine: starting a session (which runs
//! group assignment once), stepping the session or one group through its
//! phases, setting a phase directly, and reshuffling groups.

use crate::config::EngineConfig;
use crate::ports::session_logger::{SessionEvent, SessionEventLogger};
use crate::ports::session_store::SessionStore;
use crate::use_cases::error::SessionServiceError;
use crate::use_cases::shared::{Mutation, SessionRecords};
use dialogos_domain::{
    ActorContext, FivePersonChoice, GroupId, Phase, PhaseAction, PhaseChange, SessionId,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::json;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Use case for host-driven phase and round control
pub struct RunSessionUseCase {
    records: SessionRecords,
    rng: Mutex<StdRng>,
}

impl RunSessionUseCase {
    pub fn new(store: Arc<dyn SessionStore>, config: EngineConfig) -> Self {
        Self {
            records: SessionRecords::new(store, config),
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn with_event_logger(mut self, logger: Arc<dyn SessionEventLogger>) -> Self {
        self.records.set_logger(logger);
        self
    }

    /// Make shuffles reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    /// Run assignment and enter the opening phase.
    ///
    /// Starting an already running session is a no-op.
    pub async fn start_session(
        &self,
        id: &SessionId,
        ctx: &ActorContext,
        five: Option<FivePersonChoice>,
    ) -> Result<Mutation<PhaseChange>, SessionServiceError> {
        let mutation = self.records.mutate(id, |s| s.start(ctx, five)).await?;
        if mutation.written {
            let session = &mutation.session;
            info!(
                "Started session {} with {} participants in {} group(s)",
                id,
                session.participants.len(),
                session.groups.len().max(1)
            );
            self.records.log(SessionEvent::new(
                "session_started",
                id,
                json!({
                    "participants": session.participants.len(),
                    "group_sizes": session.groups.iter().map(|g| g.len()).collect::<Vec<_>>(),
                    "five_person_choice": session.five_person_choice,
                }),
            ));
            self.records.log_phase_change(id, None, None, &mutation.outcome);
        }
        Ok(mutation)
    }

    /// Apply a host step to the session, or to one group in multi mode.
    pub async fn apply(
        &self,
        id: &SessionId,
        ctx: &ActorContext,
        group_id: Option<&GroupId>,
        action: PhaseAction,
    ) -> Result<Mutation<PhaseChange>, SessionServiceError> {
        let mutation = self
            .records
            .mutate(id, |s| s.apply(ctx, group_id, action))
            .await?;
        let change = &mutation.outcome;
        if change.applied {
            info!(
                "Session {}{}: {} ({} -> {}, round {})",
                id,
                group_id.map(|g| format!(" [{}]", g)).unwrap_or_default(),
                action,
                change.from,
                change.to,
                change.round
            );
        } else {
            debug!("Session {}: {} left the phase unchanged", id, action);
        }
        self.records.log_phase_change(id, group_id, Some(action), change);
        Ok(mutation)
    }

    pub async fn complete_check_in(
        &self,
        id: &SessionId,
        ctx: &ActorContext,
        group_id: Option<&GroupId>,
    ) -> Result<Mutation<PhaseChange>, SessionServiceError> {
        self.apply(id, ctx, group_id, PhaseAction::CompleteCheckIn).await
    }

    pub async fn complete_round(
        &self,
        id: &SessionId,
        ctx: &ActorContext,
        group_id: Option<&GroupId>,
    ) -> Result<Mutation<PhaseChange>, SessionServiceError> {
        self.apply(id, ctx, group_id, PhaseAction::CompleteRound).await
    }

    pub async fn complete_transition(
        &self,
        id: &SessionId,
        ctx: &ActorContext,
        group_id: Option<&GroupId>,
    ) -> Result<Mutation<PhaseChange>, SessionServiceError> {
        self.apply(id, ctx, group_id, PhaseAction::CompleteTransition).await
    }

    pub async fn continue_rounds(
        &self,
        id: &SessionId,
        ctx: &ActorContext,
        group_id: Option<&GroupId>,
    ) -> Result<Mutation<PhaseChange>, SessionServiceError> {
        self.apply(id, ctx, group_id, PhaseAction::ContinueRounds).await
    }

    pub async fn start_free_dialogue(
        &self,
        id: &SessionId,
        ctx: &ActorContext,
        group_id: Option<&GroupId>,
    ) -> Result<Mutation<PhaseChange>, SessionServiceError> {
        self.apply(id, ctx, group_id, PhaseAction::StartFreeDialogue).await
    }

    pub async fn end_session(
        &self,
        id: &SessionId,
        ctx: &ActorContext,
        group_id: Option<&GroupId>,
    ) -> Result<Mutation<PhaseChange>, SessionServiceError> {
        self.apply(id, ctx, group_id, PhaseAction::EndSession).await
    }

    pub async fn complete_reflection(
        &self,
        id: &SessionId,
        ctx: &ActorContext,
        group_id: Option<&GroupId>,
    ) -> Result<Mutation<PhaseChange>, SessionServiceError> {
        self.apply(id, ctx, group_id, PhaseAction::CompleteReflection).await
    }

    /// Set a phase (and optionally round) directly.
    pub async fn update_phase(
        &self,
        id: &SessionId,
        ctx: &ActorContext,
        group_id: Option<&GroupId>,
        phase: Phase,
        round: Option<u32>,
    ) -> Result<Mutation<PhaseChange>, SessionServiceError> {
        let mutation = self
            .records
            .mutate(id, |s| s.set_phase(ctx, group_id, phase, round))
            .await?;
        self.records.log_phase_change(id, group_id, None, &mutation.outcome);
        Ok(mutation)
    }

    /// Reshuffle group membership before any group has started.
    pub async fn shuffle_groups(&self, id: &SessionId, ctx: &ActorContext) -> Result<Mutation<()>, SessionServiceError> {
        let mutation = self
            .records
            .mutate(id, |s| {
                let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                s.shuffle_groups(ctx, &mut *rng)
            })
            .await?;
        info!("Shuffled {} groups in session {}", mutation.session.groups.len(), id);
        Ok(mutation)
    }
}
