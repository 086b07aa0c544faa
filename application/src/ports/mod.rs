//! Ports (interfaces) for external adapters
//!
//! These traits define the boundaries between the application layer
//! and the infrastructure layer.

pub mod session_logger;
pub mod session_store;

pub use session_logger::{NoSessionEventLogger, SessionEvent, SessionEventLogger};
pub use session_store::{SessionStore, StoreError};
