//! Groups of a multi-group session.

pub mod entities;

pub use entities::{AggregateOutcome, Group, GroupProgress, GroupStatus, GroupStatusChange};
