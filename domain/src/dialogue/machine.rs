//! Phase state machine shared by single-mode sessions and individual groups.
//!
//! The machine never checks authority: callers (the session aggregate) verify
//! the actor first so a rejected request cannot touch the record.

use super::notebook::ScribeNotebook;
use super::phase::{Phase, SessionVariant};
use crate::core::error::DomainError;
use crate::participant::{Participant, rotate_roles, rotating_count, total_rounds};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Anything that runs through phases and rounds with a roster and a notebook.
pub trait Dialogue {
    fn phase(&self) -> Phase;
    fn round(&self) -> u32;
    fn participants(&self) -> &[Participant];
    fn participants_mut(&mut self) -> &mut [Participant];
    fn notebook(&self) -> &ScribeNotebook;
    fn notebook_mut(&mut self) -> &mut ScribeNotebook;
    /// Set the phase and stamp its start time.
    fn enter_phase(&mut self, phase: Phase, now: DateTime<Utc>);
    fn set_round(&mut self, round: u32);

    /// Rounds in one cycle, from the current rotating head count.
    fn total_rounds(&self) -> u32 {
        total_rounds(rotating_count(self.participants()))
    }
}

/// Result of one machine step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseChange {
    pub from: Phase,
    pub to: Phase,
    pub round: u32,
    pub rotated: bool,
    pub notes_flushed: bool,
    /// Round whose notes went into the transcript on this step
    pub flushed_round: Option<u32>,
    /// `false` when the target state already held and nothing changed
    pub applied: bool,
}

impl PhaseChange {
    pub(crate) fn unchanged(phase: Phase, round: u32) -> Self {
        Self {
            from: phase,
            to: phase,
            round,
            rotated: false,
            notes_flushed: false,
            flushed_round: None,
            applied: false,
        }
    }

    pub(crate) fn moved(from: Phase, to: Phase, round: u32) -> Self {
        Self {
            from,
            to,
            round,
            rotated: false,
            notes_flushed: false,
            flushed_round: None,
            applied: true,
        }
    }
}

/// Transition rules for one [`SessionVariant`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseMachine {
    variant: SessionVariant,
}

impl PhaseMachine {
    pub fn new(variant: SessionVariant) -> Self {
        Self { variant }
    }

    pub fn variant(&self) -> SessionVariant {
        self.variant
    }

    /// Lobby → opening phase, round 1.
    pub fn start<D: Dialogue + ?Sized>(
        &self,
        dialogue: &mut D,
        now: DateTime<Utc>,
    ) -> Result<PhaseChange, DomainError> {
        let from = dialogue.phase();
        let target = self.variant.opening();
        if from == target {
            return Ok(PhaseChange::unchanged(from, dialogue.round()));
        }
        if !from.is_lobby() {
            return Err(invalid("start the session", from));
        }
        dialogue.set_round(1);
        dialogue.enter_phase(target, now);
        Ok(PhaseChange::moved(from, target, 1))
    }

    /// Hello check-in → first listening round (online only).
    pub fn complete_check_in<D: Dialogue + ?Sized>(
        &self,
        dialogue: &mut D,
        now: DateTime<Utc>,
    ) -> Result<PhaseChange, DomainError> {
        let from = dialogue.phase();
        let target = self.variant.active_round();
        if from == target {
            return Ok(PhaseChange::unchanged(from, dialogue.round()));
        }
        if from != Phase::HelloCheckin {
            return Err(invalid("complete the check-in", from));
        }
        dialogue.enter_phase(target, now);
        Ok(PhaseChange::moved(from, target, dialogue.round()))
    }

    /// Finish the running round.
    ///
    /// On the final round of the cycle the dialogue moves to the
    /// cycle-complete phase without rotating. Otherwise the scribe's notes are
    /// flushed, roles rotate one step and the round number increments.
    pub fn complete_round<D: Dialogue + ?Sized>(
        &self,
        dialogue: &mut D,
        now: DateTime<Utc>,
    ) -> Result<PhaseChange, DomainError> {
        let from = dialogue.phase();
        let round = dialogue.round();
        if from == self.variant.between_rounds() || from == self.variant.cycle_complete() {
            return Ok(PhaseChange::unchanged(from, round));
        }
        if from != self.variant.active_round() {
            return Err(invalid("complete the round", from));
        }

        if round >= dialogue.total_rounds() {
            let target = self.variant.cycle_complete();
            dialogue.enter_phase(target, now);
            return Ok(PhaseChange::moved(from, target, round));
        }

        let notes_flushed = dialogue.notebook_mut().flush(round);
        let rotated = rotate_roles(dialogue.participants_mut());
        let next = round + 1;
        dialogue.set_round(next);
        let target = self.variant.between_rounds();
        dialogue.enter_phase(target, now);
        Ok(PhaseChange {
            rotated,
            notes_flushed,
            flushed_round: notes_flushed.then_some(round),
            ..PhaseChange::moved(from, target, next)
        })
    }

    /// Between-rounds phase → next active round.
    pub fn complete_transition<D: Dialogue + ?Sized>(
        &self,
        dialogue: &mut D,
        now: DateTime<Utc>,
    ) -> Result<PhaseChange, DomainError> {
        let from = dialogue.phase();
        let target = self.variant.active_round();
        if from == target {
            return Ok(PhaseChange::unchanged(from, dialogue.round()));
        }
        if from != self.variant.between_rounds() {
            return Err(invalid("complete the transition", from));
        }
        dialogue.enter_phase(target, now);
        Ok(PhaseChange::moved(from, target, dialogue.round()))
    }

    /// Repeat the cycle: final flush, one more rotation, back to round 1.
    pub fn continue_rounds<D: Dialogue + ?Sized>(
        &self,
        dialogue: &mut D,
        now: DateTime<Utc>,
    ) -> Result<PhaseChange, DomainError> {
        let from = dialogue.phase();
        let round = dialogue.round();
        let target = self.variant.active_round();
        if from == target && round == 1 {
            return Ok(PhaseChange::unchanged(from, round));
        }
        if from != self.variant.cycle_complete() {
            return Err(invalid("continue with another round cycle", from));
        }

        let notebook = dialogue.notebook_mut();
        let notes_flushed = notebook.flush(round);
        notebook.start_cycle();
        let rotated = rotate_roles(dialogue.participants_mut());
        dialogue.set_round(1);
        dialogue.enter_phase(target, now);
        Ok(PhaseChange {
            rotated,
            notes_flushed,
            flushed_round: notes_flushed.then_some(round),
            ..PhaseChange::moved(from, target, 1)
        })
    }

    /// Leave the structured rounds for open conversation.
    pub fn start_free_dialogue<D: Dialogue + ?Sized>(
        &self,
        dialogue: &mut D,
        now: DateTime<Utc>,
    ) -> Result<PhaseChange, DomainError> {
        let from = dialogue.phase();
        if from == Phase::FreeDialogue {
            return Ok(PhaseChange::unchanged(from, dialogue.round()));
        }
        if from.is_lobby() || from.is_terminal() || from == Phase::Reflection {
            return Err(invalid("start free dialogue", from));
        }
        dialogue.enter_phase(Phase::FreeDialogue, now);
        Ok(PhaseChange::moved(from, Phase::FreeDialogue, dialogue.round()))
    }

    /// End the dialogue: reflection for online sessions, completed otherwise.
    pub fn end<D: Dialogue + ?Sized>(
        &self,
        dialogue: &mut D,
        now: DateTime<Utc>,
    ) -> Result<PhaseChange, DomainError> {
        let from = dialogue.phase();
        let target = self.variant.closing();
        if from == target || from.is_terminal() {
            return Ok(PhaseChange::unchanged(from, dialogue.round()));
        }
        dialogue.enter_phase(target, now);
        Ok(PhaseChange::moved(from, target, dialogue.round()))
    }

    /// Reflection → completed.
    pub fn complete_reflection<D: Dialogue + ?Sized>(
        &self,
        dialogue: &mut D,
        now: DateTime<Utc>,
    ) -> Result<PhaseChange, DomainError> {
        let from = dialogue.phase();
        if from.is_terminal() {
            return Ok(PhaseChange::unchanged(from, dialogue.round()));
        }
        if from != Phase::Reflection {
            return Err(invalid("complete the reflection", from));
        }
        dialogue.enter_phase(Phase::Completed, now);
        Ok(PhaseChange::moved(from, Phase::Completed, dialogue.round()))
    }
}

/// Host-only step on a running dialogue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PhaseAction {
    CompleteCheckIn,
    CompleteRound,
    CompleteTransition,
    ContinueRounds,
    StartFreeDialogue,
    EndSession,
    CompleteReflection,
}

impl PhaseAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseAction::CompleteCheckIn => "complete-check-in",
            PhaseAction::CompleteRound => "complete-round",
            PhaseAction::CompleteTransition => "complete-transition",
            PhaseAction::ContinueRounds => "continue-rounds",
            PhaseAction::StartFreeDialogue => "start-free-dialogue",
            PhaseAction::EndSession => "end-session",
            PhaseAction::CompleteReflection => "complete-reflection",
        }
    }

    /// Verb phrase used in permission errors.
    pub fn description(&self) -> &'static str {
        match self {
            PhaseAction::CompleteCheckIn => "complete the check-in",
            PhaseAction::CompleteRound => "complete the round",
            PhaseAction::CompleteTransition => "complete the transition",
            PhaseAction::ContinueRounds => "continue with another round cycle",
            PhaseAction::StartFreeDialogue => "start free dialogue",
            PhaseAction::EndSession => "end the session",
            PhaseAction::CompleteReflection => "complete the reflection",
        }
    }

    /// Steps that belong to a running dialogue rather than the whole session.
    pub fn is_round_cycle(&self) -> bool {
        !matches!(self, PhaseAction::EndSession | PhaseAction::CompleteReflection)
    }

    pub fn apply<D: Dialogue + ?Sized>(
        &self,
        machine: &PhaseMachine,
        dialogue: &mut D,
        now: DateTime<Utc>,
    ) -> Result<PhaseChange, DomainError> {
        match self {
            PhaseAction::CompleteCheckIn => machine.complete_check_in(dialogue, now),
            PhaseAction::CompleteRound => machine.complete_round(dialogue, now),
            PhaseAction::CompleteTransition => machine.complete_transition(dialogue, now),
            PhaseAction::ContinueRounds => machine.continue_rounds(dialogue, now),
            PhaseAction::StartFreeDialogue => machine.start_free_dialogue(dialogue, now),
            PhaseAction::EndSession => machine.end(dialogue, now),
            PhaseAction::CompleteReflection => machine.complete_reflection(dialogue, now),
        }
    }
}

impl std::fmt::Display for PhaseAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PhaseAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "complete-check-in" | "check-in" => Ok(PhaseAction::CompleteCheckIn),
            "complete-round" | "round" => Ok(PhaseAction::CompleteRound),
            "complete-transition" | "transition" => Ok(PhaseAction::CompleteTransition),
            "continue-rounds" | "continue" => Ok(PhaseAction::ContinueRounds),
            "start-free-dialogue" | "free-dialogue" => Ok(PhaseAction::StartFreeDialogue),
            "end-session" | "end" => Ok(PhaseAction::EndSession),
            "complete-reflection" | "reflection" => Ok(PhaseAction::CompleteReflection),
            other => Err(format!("Unknown phase action: {}", other)),
        }
    }
}

fn invalid(action: &'static str, phase: Phase) -> DomainError {
    DomainError::InvalidTransition { action, phase }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::participant::Role;

    // ==================== Test Dialogue ====================

    struct Board {
        phase: Phase,
        round: u32,
        participants: Vec<Participant>,
        notebook: ScribeNotebook,
        entered: Vec<Phase>,
    }

    impl Board {
        fn new(variant: SessionVariant, roles: &[Role]) -> Self {
            Self {
                phase: variant.lobby(),
                round: 1,
                participants: roles
                    .iter()
                    .enumerate()
                    .map(|(i, r)| Participant::new(format!("p{}", i), format!("P{}", i)).with_role(*r))
                    .collect(),
                notebook: ScribeNotebook::new(),
                entered: Vec::new(),
            }
        }

        fn role_of(&self, index: usize) -> Role {
            self.participants[index].role
        }
    }

    impl Dialogue for Board {
        fn phase(&self) -> Phase {
            self.phase
        }
        fn round(&self) -> u32 {
            self.round
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
        fn enter_phase(&mut self, phase: Phase, _now: DateTime<Utc>) {
            self.phase = phase;
            self.entered.push(phase);
        }
        fn set_round(&mut self, round: u32) {
            self.round = round;
        }
    }

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    // ==================== Online Variant ====================

    #[test]
    fn test_online_pair_runs_two_rounds() {
        let machine = PhaseMachine::new(SessionVariant::Online);
        let mut board = Board::new(SessionVariant::Online, &[Role::Speaker, Role::Listener]);

        machine.start(&mut board, now()).unwrap();
        assert_eq!(board.phase, Phase::HelloCheckin);
        machine.complete_check_in(&mut board, now()).unwrap();
        assert_eq!(board.phase, Phase::Listening);

        let change = machine.complete_round(&mut board, now()).unwrap();
        assert!(change.rotated);
        assert_eq!(board.phase, Phase::Transition);
        assert_eq!(board.round, 2);
        assert_eq!(board.role_of(0), Role::Listener);
        assert_eq!(board.role_of(1), Role::Speaker);

        machine.complete_transition(&mut board, now()).unwrap();
        let change = machine.complete_round(&mut board, now()).unwrap();
        assert!(!change.rotated);
        assert_eq!(board.phase, Phase::Completion);
        assert_eq!(board.round, 2);
        // No rotation on the final round.
        assert_eq!(board.role_of(0), Role::Listener);
    }

    #[test]
    fn test_complete_round_twice_is_noop() {
        let machine = PhaseMachine::new(SessionVariant::Online);
        let mut board = Board::new(
            SessionVariant::Online,
            &[Role::Speaker, Role::Listener, Role::Scribe],
        );
        machine.start(&mut board, now()).unwrap();
        machine.complete_check_in(&mut board, now()).unwrap();

        machine.complete_round(&mut board, now()).unwrap();
        let roles: Vec<Role> = board.participants.iter().map(|p| p.role).collect();
        let again = machine.complete_round(&mut board, now()).unwrap();

        assert!(!again.applied);
        assert_eq!(board.round, 2);
        let after: Vec<Role> = board.participants.iter().map(|p| p.role).collect();
        assert_eq!(roles, after);
    }

    #[test]
    fn test_complete_round_from_lobby_is_rejected() {
        let machine = PhaseMachine::new(SessionVariant::Online);
        let mut board = Board::new(SessionVariant::Online, &[Role::Speaker, Role::Listener]);
        let err = machine.complete_round(&mut board, now()).unwrap_err();
        assert!(matches!(
            err,
            DomainError::InvalidTransition {
                phase: Phase::TopicSelection,
                ..
            }
        ));
        assert!(board.entered.is_empty());
    }

    #[test]
    fn test_notes_accumulate_across_repeat_cycle() {
        let machine = PhaseMachine::new(SessionVariant::Online);
        let mut board = Board::new(SessionVariant::Online, &[Role::Speaker, Role::Listener]);
        machine.start(&mut board, now()).unwrap();
        machine.complete_check_in(&mut board, now()).unwrap();

        board.notebook.write("r1");
        let first = machine.complete_round(&mut board, now()).unwrap();
        assert_eq!(first.round, 2);
        assert_eq!(first.flushed_round, Some(1));
        machine.complete_transition(&mut board, now()).unwrap();
        board.notebook.write("r2");
        machine.complete_round(&mut board, now()).unwrap();
        assert_eq!(board.phase, Phase::Completion);

        let change = machine.continue_rounds(&mut board, now()).unwrap();
        assert!(change.rotated);
        assert!(change.notes_flushed);
        assert_eq!(change.flushed_round, Some(2));
        assert_eq!(board.round, 1);
        assert_eq!(board.phase, Phase::Listening);
        assert_eq!(board.role_of(0), Role::Speaker);

        board.notebook.write("r1 again");
        machine.complete_round(&mut board, now()).unwrap();

        assert_eq!(
            board.notebook.accumulated,
            "--- Round 1 ---\nr1\n\n--- Round 2 ---\nr2\n\n--- Round 1 ---\nr1 again"
        );
    }

    #[test]
    fn test_end_then_reflection() {
        let machine = PhaseMachine::new(SessionVariant::Online);
        let mut board = Board::new(SessionVariant::Online, &[Role::Speaker, Role::Listener]);
        machine.start(&mut board, now()).unwrap();
        machine.start_free_dialogue(&mut board, now()).unwrap();
        assert_eq!(board.phase, Phase::FreeDialogue);

        machine.end(&mut board, now()).unwrap();
        assert_eq!(board.phase, Phase::Reflection);
        assert!(machine.start_free_dialogue(&mut board, now()).is_err());

        machine.complete_reflection(&mut board, now()).unwrap();
        assert_eq!(board.phase, Phase::Completed);
        assert!(!machine.end(&mut board, now()).unwrap().applied);
    }

    // ==================== In-person Variant ====================

    #[test]
    fn test_in_person_cycle() {
        let machine = PhaseMachine::new(SessionVariant::InPerson);
        let mut board = Board::new(
            SessionVariant::InPerson,
            &[Role::Speaker, Role::Listener, Role::Scribe],
        );
        machine.start(&mut board, now()).unwrap();
        assert_eq!(board.phase, Phase::Round);

        for expected_round in 2..=3 {
            machine.complete_round(&mut board, now()).unwrap();
            assert_eq!(board.phase, Phase::ScribeFeedback);
            assert_eq!(board.round, expected_round);
            machine.complete_transition(&mut board, now()).unwrap();
        }
        machine.complete_round(&mut board, now()).unwrap();
        assert_eq!(board.phase, Phase::RoundComplete);

        machine.end(&mut board, now()).unwrap();
        assert_eq!(board.phase, Phase::Completed);
    }
}
