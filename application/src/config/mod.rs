//! Application-level configuration.
//!
//! - [`EngineConfig`] - polling, write policy, transport retries, retention

pub mod engine_config;

pub use engine_config::{EngineConfig, WritePolicy};
