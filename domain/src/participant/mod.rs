//! Participants, their roles, and how roles rotate between rounds.
//!
//! - [`entities::Participant`] - a person in a session
//! - [`entities::Role`] - closed role set
//! - [`rotation`] - seat ladder, `total_rounds` table, one-step rotation

pub mod entities;
pub mod rotation;

pub use entities::{Participant, ParticipantStatus, Role};
pub use rotation::{rotate_roles, rotating_count, seat_roles, total_rounds};
