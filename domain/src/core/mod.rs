//! Core domain concepts shared across all subdomains.
//!
//! - [`ids`] - session, group and participant identifiers
//! - [`context::ActorContext`] - acting participant and clock for a request
//! - [`error::DomainError`] - domain-level errors

pub mod context;
pub mod error;
pub mod ids;
