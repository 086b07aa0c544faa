//! Domain layer for dialogos
//!
//! This crate contains the core business logic, entities, and value objects.
//! It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Roles and rotation
//!
//! Participants hold one of a closed set of roles (speaker, listener, scribe,
//! observer). Between rounds every rotating participant moves one seat down
//! the seat ladder for their group size.
//!
//! ## Group assignment
//!
//! A roster is partitioned into groups of two to four. Initial roles come
//! from each member's seat; shuffling keeps the size sequence.
//!
//! ## Phase machine
//!
//! A session (single mode) or each group (multi mode) moves through the
//! phases of its variant. Only the host may advance phases; participants
//! edit only their own entry, and the scribe the current notes.

pub mod assignment;
pub mod core;
pub mod dialogue;
pub mod group;
pub mod participant;
pub mod session;

// Re-export commonly used types
pub use assignment::{
    FivePersonChoice, GroupConfiguration, GroupRotation, GroupSize, ObserverStrategy,
    ValidationReport, assign, balance_roles, group_sizes, seat_group, shuffle_groups,
    validate_configuration,
};
pub use core::{
    context::ActorContext,
    error::{DomainError, EntityKind},
    ids::{GroupId, ParticipantId, SessionId},
};
pub use dialogue::{Dialogue, Phase, PhaseAction, PhaseChange, PhaseMachine, ScribeNotebook, SessionVariant};
pub use group::{AggregateOutcome, Group, GroupProgress, GroupStatus, GroupStatusChange};
pub use participant::{Participant, ParticipantStatus, Role, rotate_roles, seat_roles, total_rounds};
pub use session::{
    GroupMode, HostRole, JoinOutcome, Session, SessionConfig, SessionStatus, TopicSuggestion,
};
