//! Session aggregate
//!
//! One record per session. Every mutation goes through a method that takes an
//! [`ActorContext`], checks authority first, and only then touches state, so
//! a rejected request leaves the record exactly as it was.

use super::topic::{TopicSuggestion, most_popular};
use crate::assignment::{
    FivePersonChoice, GroupConfiguration, GroupRotation, assign, balance_roles, fill_open_seats,
    is_partition, seat_group, shuffle_groups, validate_configuration,
};
use crate::core::context::ActorContext;
use crate::core::error::{DomainError, EntityKind};
use crate::core::ids::{GroupId, ParticipantId, SessionId};
use crate::dialogue::{Dialogue, Phase, PhaseAction, PhaseChange, PhaseMachine, ScribeNotebook, SessionVariant};
use crate::group::{AggregateOutcome, Group, GroupProgress, GroupStatus, GroupStatusChange};
use crate::participant::{Participant, ParticipantStatus, Role};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Overall session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Waiting,
    Active,
    Completed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Waiting => "waiting",
            SessionStatus::Active => "active",
            SessionStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One dialogue for everyone, or independent groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupMode {
    #[default]
    Single,
    Multi,
}

impl GroupMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupMode::Single => "single",
            GroupMode::Multi => "multi",
        }
    }
}

impl std::str::FromStr for GroupMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "single" => Ok(GroupMode::Single),
            "multi" | "multiple" => Ok(GroupMode::Multi),
            other => Err(format!("Unknown group mode: {}", other)),
        }
    }
}

/// Whether the host practices or only watches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HostRole {
    #[default]
    Participant,
    ObserverPermanent,
}

/// Settings chosen by the host when creating a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    pub duration_minutes: u32,
    pub min_participants: usize,
    pub max_participants: usize,
    #[serde(default)]
    pub host_role: HostRole,
    #[serde(default)]
    pub variant: SessionVariant,
    #[serde(default)]
    pub group_mode: GroupMode,
    #[serde(default)]
    pub group_configuration: GroupConfiguration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            name: "Dialogue practice".to_string(),
            topic: None,
            duration_minutes: 30,
            min_participants: 2,
            max_participants: 20,
            host_role: HostRole::default(),
            variant: SessionVariant::default(),
            group_mode: GroupMode::default(),
            group_configuration: GroupConfiguration::default(),
        }
    }
}

impl SessionConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    pub fn with_variant(mut self, variant: SessionVariant) -> Self {
        self.variant = variant;
        self
    }

    pub fn with_host_role(mut self, role: HostRole) -> Self {
        self.host_role = role;
        self
    }

    pub fn with_participant_limits(mut self, min: usize, max: usize) -> Self {
        self.min_participants = min;
        self.max_participants = max;
        self
    }

    /// Switch to multi-group mode with the given configuration.
    pub fn with_groups(mut self, configuration: GroupConfiguration) -> Self {
        self.group_mode = GroupMode::Multi;
        self.group_configuration = configuration;
        self
    }

    /// Every problem with this configuration, empty when valid.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.name.trim().is_empty() {
            problems.push("Session name must not be empty".to_string());
        }
        if self.duration_minutes == 0 {
            problems.push("Duration must be at least 1 minute".to_string());
        }
        if self.min_participants < 2 {
            problems.push("Minimum participants must be at least 2".to_string());
        }
        if self.max_participants < self.min_participants {
            problems.push(format!(
                "Maximum participants ({}) is below the minimum ({})",
                self.max_participants, self.min_participants
            ));
        }
        if self.group_configuration.max_groups == Some(0) {
            problems.push("Maximum groups must be at least 1".to_string());
        }
        problems
    }
}

/// Whether a join added someone new or refreshed an existing entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined,
    Rejoined,
}

/// The shared session record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub session_id: SessionId,
    pub host_id: ParticipantId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    pub duration_minutes: u32,
    pub min_participants: usize,
    pub max_participants: usize,
    #[serde(default)]
    pub host_role: HostRole,
    #[serde(default)]
    pub variant: SessionVariant,
    pub participants: Vec<Participant>,
    pub status: SessionStatus,
    pub current_phase: Phase,
    pub current_round: u32,
    pub group_mode: GroupMode,
    #[serde(default)]
    pub groups: Vec<Group>,
    pub group_configuration: GroupConfiguration,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub five_person_choice: Option<FivePersonChoice>,
    #[serde(default)]
    pub notebook: ScribeNotebook,
    #[serde(default)]
    pub topic_suggestions: Vec<TopicSuggestion>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase_started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Optimistic-concurrency version, bumped by the store on every write
    #[serde(default)]
    pub version: u64,
}

impl Session {
    /// Create a session hosted by `ctx.actor`, who joins immediately as ready.
    pub fn create(
        session_id: SessionId,
        host_name: impl Into<String>,
        config: SessionConfig,
        ctx: &ActorContext,
    ) -> Result<Self, DomainError> {
        let problems = config.problems();
        if !problems.is_empty() {
            return Err(DomainError::InvalidConfiguration(problems));
        }

        let host_seat = match config.host_role {
            HostRole::Participant => Role::Unassigned,
            HostRole::ObserverPermanent => Role::ObserverPermanent,
        };
        let host = Participant::new(ctx.actor.clone(), host_name)
            .with_role(host_seat)
            .with_status(ParticipantStatus::Ready);

        Ok(Self {
            session_id,
            host_id: ctx.actor.clone(),
            name: config.name,
            topic: config.topic,
            duration_minutes: config.duration_minutes,
            min_participants: config.min_participants,
            max_participants: config.max_participants,
            host_role: config.host_role,
            variant: config.variant,
            participants: vec![host],
            status: SessionStatus::Waiting,
            current_phase: config.variant.lobby(),
            current_round: 1,
            group_mode: config.group_mode,
            groups: Vec::new(),
            group_configuration: config.group_configuration,
            five_person_choice: None,
            notebook: ScribeNotebook::new(),
            topic_suggestions: Vec::new(),
            created_at: ctx.now,
            phase_started_at: None,
            completed_at: None,
            version: 0,
        })
    }

    pub fn machine(&self) -> PhaseMachine {
        PhaseMachine::new(self.variant)
    }

    pub fn is_host(&self, id: &ParticipantId) -> bool {
        &self.host_id == id
    }

    pub fn is_multi_group(&self) -> bool {
        self.group_mode == GroupMode::Multi
    }

    pub fn participant(&self, id: &ParticipantId) -> Option<&Participant> {
        self.participants.iter().find(|p| &p.id == id)
    }

    pub fn group(&self, id: &GroupId) -> Option<&Group> {
        self.groups.iter().find(|g| &g.group_id == id)
    }

    pub fn group_of(&self, participant: &ParticipantId) -> Option<&Group> {
        self.groups.iter().find(|g| g.contains(participant))
    }

    /// Current round's scribe notes.
    pub fn scribe_notes(&self) -> &str {
        &self.notebook.current
    }

    /// Transcript of every flushed round.
    pub fn accumulated_scribe_notes(&self) -> &str {
        &self.notebook.accumulated
    }

    /// Roles a newcomer may still pick. Active roles are single-seat.
    pub fn available_roles(&self) -> Vec<Role> {
        Role::CANONICAL
            .iter()
            .copied()
            .filter(|role| !role.is_active() || !self.participants.iter().any(|p| p.role == *role))
            .collect()
    }

    // ==================== Participant-scoped ====================

    /// Join as `ctx.actor`. Joining again refreshes name and role and marks
    /// the participant ready.
    pub fn join(
        &mut self,
        ctx: &ActorContext,
        name: impl Into<String>,
        role: Role,
    ) -> Result<JoinOutcome, DomainError> {
        if self.status == SessionStatus::Completed {
            return Err(DomainError::InvalidTransition {
                action: "join",
                phase: self.current_phase,
            });
        }
        let name = name.into();
        if role.is_active()
            && self
                .participants
                .iter()
                .any(|p| p.role == role && p.id != ctx.actor)
        {
            return Err(DomainError::RoleUnavailable(role));
        }

        if let Some(existing) = self.participants.iter_mut().find(|p| p.id == ctx.actor) {
            existing.name = name;
            if role.is_assigned() {
                existing.role = role;
            }
            existing.status = ParticipantStatus::Ready;
            let updated = existing.clone();
            self.update_group_copy(&updated.id, |member| {
                member.name = updated.name.clone();
                member.role = updated.role;
                member.status = updated.status;
            });
            return Ok(JoinOutcome::Rejoined);
        }

        if !self.current_phase.is_lobby() {
            return Err(DomainError::InvalidTransition {
                action: "join",
                phase: self.current_phase,
            });
        }
        if self.participants.len() >= self.max_participants {
            return Err(DomainError::invalid_configuration(format!(
                "Session is full ({} participants maximum)",
                self.max_participants
            )));
        }

        self.participants
            .push(Participant::new(ctx.actor.clone(), name).with_role(role));
        Ok(JoinOutcome::Joined)
    }

    /// Leave the session. The participant is removed from every group and
    /// groups left empty are dropped. Returns `false` if they were not here.
    pub fn leave(&mut self, ctx: &ActorContext) -> Result<bool, DomainError> {
        if self.is_host(&ctx.actor) {
            return Err(DomainError::Permission {
                actor: ctx.actor.to_string(),
                action: "leave a session they host",
            });
        }
        let before = self.participants.len();
        self.participants.retain(|p| p.id != ctx.actor);
        if self.participants.len() == before {
            return Ok(false);
        }
        for group in &mut self.groups {
            group.participants.retain(|p| p.id != ctx.actor);
        }
        self.groups.retain(|g| !g.is_empty());
        Ok(true)
    }

    /// Returns `true` when the status actually changed.
    pub fn set_ready(&mut self, ctx: &ActorContext, ready: bool) -> Result<bool, DomainError> {
        let status = if ready {
            ParticipantStatus::Ready
        } else {
            ParticipantStatus::NotReady
        };
        let participant = self.own_entry(ctx)?;
        if participant.status == status {
            return Ok(false);
        }
        participant.status = status;
        self.update_group_copy(&ctx.actor, |member| member.status = status);
        Ok(true)
    }

    /// Pick a role while the session is still in the lobby.
    pub fn choose_role(&mut self, ctx: &ActorContext, role: Role) -> Result<bool, DomainError> {
        if !self.current_phase.is_lobby() {
            return Err(DomainError::InvalidTransition {
                action: "choose a role",
                phase: self.current_phase,
            });
        }
        if role.is_active()
            && self
                .participants
                .iter()
                .any(|p| p.role == role && p.id != ctx.actor)
        {
            return Err(DomainError::RoleUnavailable(role));
        }
        let participant = self.own_entry(ctx)?;
        if participant.role == role {
            return Ok(false);
        }
        participant.role = role;
        Ok(true)
    }

    pub fn raise_hand(&mut self, ctx: &ActorContext, raised: bool) -> Result<bool, DomainError> {
        let participant = self.own_entry(ctx)?;
        if participant.hand_raised == raised {
            return Ok(false);
        }
        participant.hand_raised = raised;
        self.update_group_copy(&ctx.actor, |member| member.hand_raised = raised);
        Ok(true)
    }

    /// Replace the current round's notes. Only the scribe of the actor's
    /// dialogue (the session, or their group) may write.
    pub fn write_notes(&mut self, ctx: &ActorContext, text: impl Into<String>) -> Result<(), DomainError> {
        let denied = || DomainError::Permission {
            actor: ctx.actor.to_string(),
            action: "write scribe notes",
        };

        if self.is_multi_group() {
            let group = self
                .groups
                .iter_mut()
                .find(|g| g.contains(&ctx.actor))
                .ok_or_else(denied)?;
            if !is_scribe(&group.participants, &ctx.actor) {
                return Err(denied());
            }
            group.scribe_notes.write(text);
        } else {
            if !is_scribe(&self.participants, &ctx.actor) {
                return Err(denied());
            }
            self.notebook.write(text);
        }
        Ok(())
    }

    // ==================== Topic suggestions ====================

    pub fn add_topic_suggestion(
        &mut self,
        ctx: &ActorContext,
        suggestion_id: impl Into<String>,
        topic: &str,
    ) -> Result<&TopicSuggestion, DomainError> {
        self.require_lobby("suggest a topic")?;
        let name = self
            .participant(&ctx.actor)
            .map(|p| p.name.clone())
            .ok_or_else(|| DomainError::not_found(EntityKind::Participant, &ctx.actor))?;
        if topic.trim().is_empty() {
            return Err(DomainError::invalid_configuration("Topic must not be empty"));
        }

        self.topic_suggestions.push(TopicSuggestion::new(
            suggestion_id,
            topic,
            name,
            ctx.actor.clone(),
            ctx.now,
        ));
        let index = self.topic_suggestions.len() - 1;
        Ok(&self.topic_suggestions[index])
    }

    /// Toggle the actor's vote. Returns `true` if the vote now counts.
    pub fn vote_for_topic(&mut self, ctx: &ActorContext, suggestion_id: &str) -> Result<bool, DomainError> {
        self.require_lobby("vote for a topic")?;
        if self.participant(&ctx.actor).is_none() {
            return Err(DomainError::not_found(EntityKind::Participant, &ctx.actor));
        }
        let suggestion = self
            .topic_suggestions
            .iter_mut()
            .find(|s| s.id == suggestion_id)
            .ok_or_else(|| DomainError::not_found(EntityKind::TopicSuggestion, suggestion_id))?;
        Ok(suggestion.toggle_vote(&ctx.actor))
    }

    pub fn popular_topics(&self, limit: usize) -> Vec<&TopicSuggestion> {
        most_popular(&self.topic_suggestions, limit)
    }

    // ==================== Host-only: phases ====================

    /// Run assignment once and enter the opening phase.
    ///
    /// Single mode seats unassigned participants into the open roles. Multi
    /// mode partitions the roster into groups, which then wait to be started
    /// individually.
    pub fn start(
        &mut self,
        ctx: &ActorContext,
        five: Option<FivePersonChoice>,
    ) -> Result<PhaseChange, DomainError> {
        self.require_host(ctx, "start the session")?;
        let machine = self.machine();
        if !self.current_phase.is_lobby() {
            return machine.start(self, ctx.now);
        }

        let count = self.participants.len();
        if count < self.min_participants.max(2) {
            return Err(DomainError::invalid_configuration(format!(
                "At least {} participants are required to start, {} present",
                self.min_participants.max(2),
                count
            )));
        }
        let choice = five.unwrap_or_default();

        match self.group_mode {
            GroupMode::Single => {
                if self.group_configuration.auto_assign_roles {
                    fill_open_seats(&mut self.participants);
                }
            }
            GroupMode::Multi => {
                validate_configuration(count, &self.group_configuration).into_result()?;
                self.groups = assign(&self.participants, &self.group_configuration, choice)?;
                self.sync_roles_from_groups();
            }
        }
        if count == 5 || five.is_some() {
            self.five_person_choice = Some(choice);
        }

        machine.start(self, ctx.now)
    }

    /// Apply a host step to the session, or to one group in multi mode.
    ///
    /// In multi mode the round cycle only runs per group; only ending the
    /// session and completing its reflection apply to the whole record.
    pub fn apply(
        &mut self,
        ctx: &ActorContext,
        group_id: Option<&GroupId>,
        action: PhaseAction,
    ) -> Result<PhaseChange, DomainError> {
        self.require_host(ctx, action.description())?;
        let machine = self.machine();

        let Some(group_id) = group_id else {
            if self.is_multi_group() && action.is_round_cycle() {
                return Err(DomainError::InvalidTransition {
                    action: action.description(),
                    phase: self.current_phase,
                });
            }
            return action.apply(&machine, self, ctx.now);
        };

        let index = self.group_index(group_id)?;
        let group = &mut self.groups[index];
        if group.status != GroupStatus::Active && action != PhaseAction::EndSession {
            return Err(DomainError::InvalidTransition {
                action: action.description(),
                phase: group.current_phase,
            });
        }
        let change = action.apply(&machine, group, ctx.now)?;
        self.sync_roles_from_group(index);
        self.complete_if_all_groups_done(ctx.now);
        Ok(change)
    }

    /// Set a phase directly. The round may only move backwards to restart a
    /// cycle at round 1.
    pub fn set_phase(
        &mut self,
        ctx: &ActorContext,
        group_id: Option<&GroupId>,
        phase: Phase,
        round: Option<u32>,
    ) -> Result<PhaseChange, DomainError> {
        self.require_host(ctx, "change the phase")?;
        let restart = self.variant.active_round();

        let apply = |dialogue: &mut dyn Dialogue| -> Result<PhaseChange, DomainError> {
            let from = dialogue.phase();
            let current_round = dialogue.round();
            let target_round = round.unwrap_or(current_round);
            if target_round == 0 {
                return Err(DomainError::invalid_configuration("Round numbers start at 1"));
            }
            if target_round < current_round && !(target_round == 1 && phase == restart) {
                return Err(DomainError::InvalidTransition {
                    action: "move the round backwards",
                    phase: from,
                });
            }
            if from == phase && current_round == target_round {
                return Ok(PhaseChange::unchanged(from, current_round));
            }
            dialogue.set_round(target_round);
            dialogue.enter_phase(phase, ctx.now);
            Ok(PhaseChange::moved(from, phase, target_round))
        };

        match group_id {
            // Groups own their phases; the session record only follows them
            None if self.is_multi_group() => Err(DomainError::InvalidTransition {
                action: "change the phase",
                phase: self.current_phase,
            }),
            None => apply(self),
            Some(group_id) => {
                let index = self.group_index(group_id)?;
                let change = apply(&mut self.groups[index])?;
                self.complete_if_all_groups_done(ctx.now);
                Ok(change)
            }
        }
    }

    // ==================== Host-only: groups ====================

    /// Reshuffle group membership before any group has started.
    pub fn shuffle_groups<R: Rng + ?Sized>(
        &mut self,
        ctx: &ActorContext,
        rng: &mut R,
    ) -> Result<(), DomainError> {
        self.require_host(ctx, "shuffle groups")?;
        if self.group_configuration.group_rotation == GroupRotation::Manual {
            return Err(DomainError::invalid_configuration(
                "Group rotation is manual; shuffling is disabled",
            ));
        }
        if self.groups.is_empty() {
            return Err(DomainError::InvalidTransition {
                action: "shuffle groups",
                phase: self.current_phase,
            });
        }
        if let Some(started) = self
            .groups
            .iter()
            .find(|g| g.status != GroupStatus::Waiting)
        {
            return Err(DomainError::InvalidTransition {
                action: "shuffle groups",
                phase: started.current_phase,
            });
        }

        shuffle_groups(&mut self.groups, rng);
        if self.group_configuration.auto_assign_roles {
            self.groups.iter_mut().for_each(seat_group);
        }
        if self.group_configuration.group_rotation == GroupRotation::Balanced {
            balance_roles(&mut self.groups);
        }
        self.sync_roles_from_groups();
        Ok(())
    }

    /// Start a waiting group, or resume a paused one.
    pub fn start_group(&mut self, ctx: &ActorContext, group_id: &GroupId) -> Result<GroupStatusChange, DomainError> {
        self.require_host(ctx, "start a group")?;
        let machine = self.machine();
        let index = self.group_index(group_id)?;
        self.groups[index].start(&machine, ctx.now)
    }

    pub fn pause_group(&mut self, ctx: &ActorContext, group_id: &GroupId) -> Result<GroupStatusChange, DomainError> {
        self.require_host(ctx, "pause a group")?;
        let index = self.group_index(group_id)?;
        self.groups[index].pause()
    }

    pub fn end_group(&mut self, ctx: &ActorContext, group_id: &GroupId) -> Result<GroupStatusChange, DomainError> {
        self.require_host(ctx, "end a group")?;
        let index = self.group_index(group_id)?;
        let change = self.groups[index].end(ctx.now);
        self.complete_if_all_groups_done(ctx.now);
        Ok(change)
    }

    pub fn start_all_groups(&mut self, ctx: &ActorContext) -> Result<AggregateOutcome, DomainError> {
        self.require_host(ctx, "start all groups")?;
        let machine = self.machine();
        Ok(self.for_each_group(|group| group.start(&machine, ctx.now)))
    }

    pub fn pause_all_groups(&mut self, ctx: &ActorContext) -> Result<AggregateOutcome, DomainError> {
        self.require_host(ctx, "pause all groups")?;
        Ok(self.for_each_group(Group::pause))
    }

    pub fn end_all_groups(&mut self, ctx: &ActorContext) -> Result<AggregateOutcome, DomainError> {
        self.require_host(ctx, "end all groups")?;
        let outcome = self.for_each_group(|group| Ok(group.end(ctx.now)));
        self.complete_if_all_groups_done(ctx.now);
        Ok(outcome)
    }

    pub fn progress(&self) -> Vec<GroupProgress> {
        self.groups.iter().map(|g| g.progress(self.variant)).collect()
    }

    // ==================== Host-only: whole-record edits ====================

    /// Replace the roster. The host must appear exactly once and ids must be
    /// unique; existing groups must still partition the new roster.
    pub fn replace_participants(
        &mut self,
        ctx: &ActorContext,
        participants: Vec<Participant>,
    ) -> Result<(), DomainError> {
        self.require_host(ctx, "replace the participant list")?;
        let mut problems = Vec::new();
        let mut seen = HashSet::new();
        if participants.iter().any(|p| !seen.insert(p.id.clone())) {
            problems.push("Participant ids must be unique".to_string());
        }
        if !seen.contains(&self.host_id) {
            problems.push("The host must remain a participant".to_string());
        }
        if !self.groups.is_empty() {
            let roster: Vec<ParticipantId> = participants.iter().map(|p| p.id.clone()).collect();
            if !is_partition(&roster, &self.groups) {
                problems.push("Existing groups no longer cover the participant list".to_string());
            }
        }
        if !problems.is_empty() {
            return Err(DomainError::InvalidConfiguration(problems));
        }
        self.participants = participants;
        Ok(())
    }

    /// Replace the groups. They must partition the roster exactly.
    pub fn replace_groups(&mut self, ctx: &ActorContext, groups: Vec<Group>) -> Result<(), DomainError> {
        self.require_host(ctx, "replace the groups")?;
        let roster: Vec<ParticipantId> = self.participants.iter().map(|p| p.id.clone()).collect();
        if !groups.is_empty() && !is_partition(&roster, &groups) {
            return Err(DomainError::invalid_configuration(
                "Groups must contain every participant exactly once",
            ));
        }
        self.groups = groups;
        self.sync_roles_from_groups();
        Ok(())
    }

    // ==================== Retention ====================

    /// Completed at least `retention` ago.
    pub fn is_expired(&self, now: DateTime<Utc>, retention: Duration) -> bool {
        self.status == SessionStatus::Completed
            && self.completed_at.unwrap_or(self.created_at) + retention <= now
    }

    // ==================== Internals ====================

    fn require_host(&self, ctx: &ActorContext, action: &'static str) -> Result<(), DomainError> {
        if self.is_host(&ctx.actor) {
            Ok(())
        } else {
            Err(DomainError::Permission {
                actor: ctx.actor.to_string(),
                action,
            })
        }
    }

    fn require_lobby(&self, action: &'static str) -> Result<(), DomainError> {
        if self.current_phase.is_lobby() {
            Ok(())
        } else {
            Err(DomainError::InvalidTransition {
                action,
                phase: self.current_phase,
            })
        }
    }

    fn own_entry(&mut self, ctx: &ActorContext) -> Result<&mut Participant, DomainError> {
        self.participants
            .iter_mut()
            .find(|p| p.id == ctx.actor)
            .ok_or_else(|| DomainError::not_found(EntityKind::Participant, &ctx.actor))
    }

    fn group_index(&self, group_id: &GroupId) -> Result<usize, DomainError> {
        self.groups
            .iter()
            .position(|g| &g.group_id == group_id)
            .ok_or_else(|| DomainError::not_found(EntityKind::Group, group_id))
    }

    fn update_group_copy(&mut self, id: &ParticipantId, update: impl Fn(&mut Participant)) {
        for group in &mut self.groups {
            if let Some(member) = group.participant_mut(id) {
                update(member);
            }
        }
    }

    fn sync_roles_from_group(&mut self, index: usize) {
        let Some(group) = self.groups.get(index) else {
            return;
        };
        for member in &group.participants {
            if let Some(entry) = self.participants.iter_mut().find(|p| p.id == member.id) {
                entry.role = member.role;
            }
        }
    }

    fn sync_roles_from_groups(&mut self) {
        for index in 0..self.groups.len() {
            self.sync_roles_from_group(index);
        }
    }

    fn for_each_group(
        &mut self,
        mut op: impl FnMut(&mut Group) -> Result<GroupStatusChange, DomainError>,
    ) -> AggregateOutcome {
        let mut outcome = AggregateOutcome::default();
        for group in &mut self.groups {
            match op(group) {
                Ok(change) => outcome.succeeded.push(change),
                Err(error) => outcome.failed.push((group.group_id.clone(), error)),
            }
        }
        outcome
    }

    /// Multi mode: the session completes once every group has.
    fn complete_if_all_groups_done(&mut self, now: DateTime<Utc>) {
        if !self.groups.is_empty()
            && self.status != SessionStatus::Completed
            && self
                .groups
                .iter()
                .all(|g| g.status == GroupStatus::Completed)
        {
            self.enter_phase(Phase::Completed, now);
        }
    }
}

fn is_scribe(participants: &[Participant], id: &ParticipantId) -> bool {
    participants
        .iter()
        .any(|p| &p.id == id && p.role == Role::Scribe)
}

impl Dialogue for Session {
    fn phase(&self) -> Phase {
        self.current_phase
    }

    fn round(&self) -> u32 {
        self.current_round
    }

    fn participants(&self) -> &[Participant] {
        &self.participants
    }

    fn participants_mut(&mut self) -> &mut [Participant] {
        &mut self.participants
    }

    fn notebook(&self) -> &ScribeNotebook {
        &self.notebook
    }

    fn notebook_mut(&mut self) -> &mut ScribeNotebook {
        &mut self.notebook
    }

    fn enter_phase(&mut self, phase: Phase, now: DateTime<Utc>) {
        self.current_phase = phase;
        self.phase_started_at = Some(now);
        if phase.is_terminal() {
            self.status = SessionStatus::Completed;
            self.completed_at = Some(now);
        } else if !phase.is_lobby() && self.status == SessionStatus::Waiting {
            self.status = SessionStatus::Active;
        }
    }

    fn set_round(&mut self, round: u32) {
        self.current_round = round;
    }
}
