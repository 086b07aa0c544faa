//! Application layer for dialogos
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::{EngineConfig, WritePolicy};
pub use ports::{
    session_logger::{NoSessionEventLogger, SessionEvent, SessionEventLogger},
    session_store::{SessionStore, StoreError},
};
pub use use_cases::{
    ErrorCategory, GroupDashboardUseCase, ManageSessionUseCase, Mutation, PurgeSessionsUseCase,
    RunSessionUseCase, SessionServiceError, WatchHandle, WatchSessionUseCase,
};
