//! Group entity for multi-group sessions

use crate::core::error::DomainError;
use crate::core::ids::{GroupId, ParticipantId};
use crate::dialogue::{Dialogue, Phase, PhaseMachine, ScribeNotebook, SessionVariant};
use crate::participant::Participant;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of one group, independent of its phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupStatus {
    #[default]
    Waiting,
    Active,
    Paused,
    Completed,
}

impl GroupStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupStatus::Waiting => "waiting",
            GroupStatus::Active => "active",
            GroupStatus::Paused => "paused",
            GroupStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for GroupStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A sub-group of a session running its own round-cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub group_id: GroupId,
    pub participants: Vec<Participant>,
    #[serde(default)]
    pub status: GroupStatus,
    pub current_phase: Phase,
    pub round_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase_started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub scribe_notes: ScribeNotebook,
}

/// Status change produced by a group control action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupStatusChange {
    pub group_id: GroupId,
    pub from: GroupStatus,
    pub to: GroupStatus,
    pub applied: bool,
}

/// Dashboard view of one group's progress
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupProgress {
    pub group_id: GroupId,
    pub status: GroupStatus,
    pub phase: Phase,
    pub round: u32,
    pub completed_rounds: u32,
    pub total_rounds: u32,
    pub participant_count: usize,
}

impl Group {
    pub fn new(group_id: GroupId, participants: Vec<Participant>) -> Self {
        Self {
            group_id,
            participants,
            status: GroupStatus::Waiting,
            current_phase: Phase::Waiting,
            round_number: 1,
            start_time: None,
            phase_started_at: None,
            scribe_notes: ScribeNotebook::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn contains(&self, id: &ParticipantId) -> bool {
        self.participants.iter().any(|p| &p.id == id)
    }

    pub fn participant_mut(&mut self, id: &ParticipantId) -> Option<&mut Participant> {
        self.participants.iter_mut().find(|p| &p.id == id)
    }

    /// Start the group, or resume it from pause without touching its phase.
    pub fn start(
        &mut self,
        machine: &PhaseMachine,
        now: DateTime<Utc>,
    ) -> Result<GroupStatusChange, DomainError> {
        let from = self.status;
        match from {
            GroupStatus::Active => return Ok(self.status_change(from, false)),
            GroupStatus::Completed => {
                return Err(DomainError::InvalidTransition {
                    action: "start the group",
                    phase: self.current_phase,
                });
            }
            GroupStatus::Paused => {}
            GroupStatus::Waiting => {
                self.start_time = Some(now);
                machine.start(self, now)?;
            }
        }
        self.status = GroupStatus::Active;
        Ok(self.status_change(from, true))
    }

    pub fn pause(&mut self) -> Result<GroupStatusChange, DomainError> {
        let from = self.status;
        match from {
            GroupStatus::Paused => Ok(self.status_change(from, false)),
            GroupStatus::Active => {
                self.status = GroupStatus::Paused;
                Ok(self.status_change(from, true))
            }
            GroupStatus::Waiting | GroupStatus::Completed => Err(DomainError::InvalidTransition {
                action: "pause the group",
                phase: self.current_phase,
            }),
        }
    }

    /// End the group from any status. Notes and roles are left as they are.
    pub fn end(&mut self, now: DateTime<Utc>) -> GroupStatusChange {
        let from = self.status;
        if from == GroupStatus::Completed {
            return self.status_change(from, false);
        }
        self.enter_phase(Phase::Completed, now);
        self.status_change(from, true)
    }

    pub fn progress(&self, variant: SessionVariant) -> GroupProgress {
        let total_rounds = self.total_rounds();
        let phase = self.current_phase;
        let completed_rounds = if phase == variant.cycle_complete()
            || phase == Phase::FreeDialogue
            || phase == Phase::Reflection
            || phase.is_terminal()
        {
            total_rounds
        } else if phase.is_lobby() {
            0
        } else {
            self.round_number.saturating_sub(1).min(total_rounds)
        };

        GroupProgress {
            group_id: self.group_id.clone(),
            status: self.status,
            phase,
            round: self.round_number,
            completed_rounds,
            total_rounds,
            participant_count: self.participants.len(),
        }
    }

    fn status_change(&self, from: GroupStatus, applied: bool) -> GroupStatusChange {
        GroupStatusChange {
            group_id: self.group_id.clone(),
            from,
            to: self.status,
            applied,
        }
    }
}

impl Dialogue for Group {
    fn phase(&self) -> Phase {
        self.current_phase
    }

    fn round(&self) -> u32 {
        self.round_number
    }

    fn participants(&self) -> &[Participant] {
        &self.participants
    }

    fn participants_mut(&mut self) -> &mut [Participant] {
        &mut self.participants
    }

    fn notebook(&self) -> &ScribeNotebook {
        &self.scribe_notes
    }

    fn notebook_mut(&mut self) -> &mut ScribeNotebook {
        &mut self.scribe_notes
    }

    fn enter_phase(&mut self, phase: Phase, now: DateTime<Utc>) {
        self.current_phase = phase;
        self.phase_started_at = Some(now);
        if phase.is_terminal() {
            self.status = GroupStatus::Completed;
        }
    }

    fn set_round(&mut self, round: u32) {
        self.round_number = round;
    }
}

/// Combined result of a "for every group" host action
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateOutcome {
    pub succeeded: Vec<GroupStatusChange>,
    pub failed: Vec<(GroupId, DomainError)>,
}

impl AggregateOutcome {
    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn changed(&self) -> usize {
        self.succeeded.iter().filter(|c| c.applied).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::participant::Role;

    fn trio() -> Group {
        let participants = [Role::Speaker, Role::Listener, Role::Scribe]
            .iter()
            .enumerate()
            .map(|(i, r)| Participant::new(format!("p{}", i), format!("P{}", i)).with_role(*r))
            .collect();
        Group::new(GroupId::numbered(1), participants)
    }

    #[test]
    fn test_start_pause_resume_keeps_phase() {
        let machine = PhaseMachine::new(SessionVariant::Online);
        let mut group = trio();
        let now = Utc::now();

        let change = group.start(&machine, now).unwrap();
        assert!(change.applied);
        assert_eq!(group.status, GroupStatus::Active);
        assert_eq!(group.current_phase, Phase::HelloCheckin);
        assert_eq!(group.start_time, Some(now));

        machine.complete_check_in(&mut group, now).unwrap();
        group.pause().unwrap();
        assert_eq!(group.status, GroupStatus::Paused);

        group.start(&machine, now).unwrap();
        assert_eq!(group.status, GroupStatus::Active);
        assert_eq!(group.current_phase, Phase::Listening);
    }

    #[test]
    fn test_start_is_idempotent_and_completed_refuses() {
        let machine = PhaseMachine::new(SessionVariant::Online);
        let mut group = trio();
        group.start(&machine, Utc::now()).unwrap();
        assert!(!group.start(&machine, Utc::now()).unwrap().applied);

        group.end(Utc::now());
        assert_eq!(group.status, GroupStatus::Completed);
        assert!(group.start(&machine, Utc::now()).is_err());
        assert!(!group.end(Utc::now()).applied);
    }

    #[test]
    fn test_pause_waiting_group_is_rejected() {
        let mut group = trio();
        assert!(matches!(
            group.pause(),
            Err(DomainError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_progress_counts_finished_rounds() {
        let machine = PhaseMachine::new(SessionVariant::Online);
        let mut group = trio();
        assert_eq!(group.progress(SessionVariant::Online).completed_rounds, 0);

        let now = Utc::now();
        group.start(&machine, now).unwrap();
        machine.complete_check_in(&mut group, now).unwrap();
        machine.complete_round(&mut group, now).unwrap();

        let progress = group.progress(SessionVariant::Online);
        assert_eq!(progress.completed_rounds, 1);
        assert_eq!(progress.total_rounds, 3);
        assert_eq!(progress.round, 2);
    }
}
