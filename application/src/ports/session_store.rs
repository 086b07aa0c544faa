//! Session store port
//!
//! The shared session record lives in an external document store. Adapters
//! implement [`SessionStore`]; use cases never see storage details.

use async_trait::async_trait;
use dialogos_domain::{Session, SessionId};
use thiserror::Error;
use tokio::sync::broadcast;

/// Errors that can occur in a session store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The stored version moved on since the caller read the record
    #[error("version conflict: expected {expected}, stored {actual}")]
    Conflict { expected: u64, actual: u64 },

    /// The backing store could not be reached
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("session not found: {0}")]
    NotFound(SessionId),

    #[error("session already exists: {0}")]
    AlreadyExists(SessionId),
}

impl StoreError {
    /// Transient failures worth retrying on reads.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

/// Versioned key-value store of session records.
///
/// Every successful write bumps `Session::version` by one and publishes the
/// stored record to that session's subscribers.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Store a new record. Fails with `AlreadyExists` if the id is taken.
    async fn insert(&self, session: Session) -> Result<Session, StoreError>;

    async fn get(&self, id: &SessionId) -> Result<Option<Session>, StoreError>;

    /// Write a record back.
    ///
    /// With `Some(expected)` the write only succeeds if the stored version
    /// still equals `expected` (compare-and-swap). With `None` it overwrites
    /// unconditionally. Returns the stored record with its new version.
    async fn save(&self, session: Session, expected_version: Option<u64>) -> Result<Session, StoreError>;

    /// Returns `true` if a record was removed.
    async fn delete(&self, id: &SessionId) -> Result<bool, StoreError>;

    async fn list(&self) -> Result<Vec<Session>, StoreError>;

    /// Push channel delivering the full record after every write.
    fn subscribe(&self, id: &SessionId) -> broadcast::Receiver<Session>;
}
