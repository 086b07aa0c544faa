//! Dialogue phases, the round state machine, and scribe notes.
//!
//! - [`phase`] - phase vocabulary and the online / in-person variants
//! - [`machine`] - [`machine::Dialogue`] trait and [`machine::PhaseMachine`]
//! - [`notebook`] - per-round notes and the append-only transcript

pub mod machine;
pub mod notebook;
pub mod phase;

pub use machine::{Dialogue, PhaseAction, PhaseChange, PhaseMachine};
pub use notebook::ScribeNotebook;
pub use phase::{Phase, SessionVariant};
