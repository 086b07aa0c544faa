//! Use cases (application services)
//!
//! Each use case wraps the session store port and runs domain operations
//! as fetch, mutate, write-back.

pub mod error;
pub mod group_dashboard;
pub mod manage_session;
pub mod purge_sessions;
pub mod run_session;
pub mod shared;
pub mod watch_session;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{ErrorCategory, SessionServiceError};
pub use group_dashboard::GroupDashboardUseCase;
pub use manage_session::ManageSessionUseCase;
pub use purge_sessions::PurgeSessionsUseCase;
pub use run_session::RunSessionUseCase;
pub use shared::Mutation;
pub use watch_session::{WatchHandle, WatchSessionUseCase};
