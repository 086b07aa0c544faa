//! In-memory session store

use super::channels::UpdateChannels;
use async_trait::async_trait;
use dialogos_application::ports::session_store::{SessionStore, StoreError};
use dialogos_domain::{Session, SessionId};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{RwLock, broadcast};
use tracing::debug;

/// In-memory store for the simulator and tests.
///
/// Writes are serialized through one `RwLock`, so the version check and the
/// write happen atomically.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<SessionId, Session>>>,
    channels: UpdateChannels,
    unavailable: AtomicBool,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an outage: every call fails with `Unavailable` until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("in-memory store is offline".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn insert(&self, mut session: Session) -> Result<Session, StoreError> {
        self.check_available()?;
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&session.session_id) {
            return Err(StoreError::AlreadyExists(session.session_id));
        }
        session.version = 1;
        sessions.insert(session.session_id.clone(), session.clone());
        debug!("Inserted session {}", session.session_id);
        Ok(session)
    }

    async fn get(&self, id: &SessionId) -> Result<Option<Session>, StoreError> {
        self.check_available()?;
        let sessions = self.sessions.read().await;
        Ok(sessions.get(id).cloned())
    }

    async fn save(&self, mut session: Session, expected_version: Option<u64>) -> Result<Session, StoreError> {
        self.check_available()?;
        let mut sessions = self.sessions.write().await;
        let current = sessions
            .get_mut(&session.session_id)
            .ok_or_else(|| StoreError::NotFound(session.session_id.clone()))?;

        if let Some(expected) = expected_version
            && expected != current.version
        {
            return Err(StoreError::Conflict {
                expected,
                actual: current.version,
            });
        }

        session.version = current.version + 1;
        *current = session.clone();
        drop(sessions);

        self.channels.publish(&session);
        Ok(session)
    }

    async fn delete(&self, id: &SessionId) -> Result<bool, StoreError> {
        self.check_available()?;
        let removed = self.sessions.write().await.remove(id).is_some();
        if removed {
            self.channels.close(id);
        }
        Ok(removed)
    }

    async fn list(&self) -> Result<Vec<Session>, StoreError> {
        self.check_available()?;
        let sessions = self.sessions.read().await;
        Ok(sessions.values().cloned().collect())
    }

    fn subscribe(&self, id: &SessionId) -> broadcast::Receiver<Session> {
        self.channels.subscribe(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dialogos_domain::{ActorContext, SessionConfig};

    fn session(id: &str) -> Session {
        Session::create(
            SessionId::new(id),
            "Hana",
            SessionConfig::new("Practice"),
            &ActorContext::now("host"),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = InMemorySessionStore::new();
        let stored = store.insert(session("s1")).await.unwrap();
        assert_eq!(stored.version, 1);

        let fetched = store.get(&SessionId::new("s1")).await.unwrap().unwrap();
        assert_eq!(fetched, stored);
        assert!(store.get(&SessionId::new("s2")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_duplicate_fails() {
        let store = InMemorySessionStore::new();
        store.insert(session("s1")).await.unwrap();
        let err = store.insert(session("s1")).await.unwrap_err();
        assert_eq!(err, StoreError::AlreadyExists(SessionId::new("s1")));
    }

    #[tokio::test]
    async fn test_save_compare_and_swap() {
        let store = InMemorySessionStore::new();
        let stored = store.insert(session("s1")).await.unwrap();

        let mut first = stored.clone();
        first.name = "First".to_string();
        let saved = store.save(first, Some(1)).await.unwrap();
        assert_eq!(saved.version, 2);

        let mut stale = stored;
        stale.name = "Stale".to_string();
        let err = store.save(stale.clone(), Some(1)).await.unwrap_err();
        assert_eq!(err, StoreError::Conflict { expected: 1, actual: 2 });

        let forced = store.save(stale, None).await.unwrap();
        assert_eq!(forced.version, 3);
        assert_eq!(store.get(&SessionId::new("s1")).await.unwrap().unwrap().name, "Stale");
    }

    #[tokio::test]
    async fn test_save_missing_session() {
        let store = InMemorySessionStore::new();
        let err = store.save(session("ghost"), None).await.unwrap_err();
        assert_eq!(err, StoreError::NotFound(SessionId::new("ghost")));
    }

    #[tokio::test]
    async fn test_subscribers_receive_writes() {
        let store = InMemorySessionStore::new();
        let stored = store.insert(session("s1")).await.unwrap();
        let mut updates = store.subscribe(&stored.session_id);

        store.save(stored, Some(1)).await.unwrap();
        let pushed = updates.recv().await.unwrap();
        assert_eq!(pushed.version, 2);

        store.delete(&SessionId::new("s1")).await.unwrap();
        assert!(updates.recv().await.is_err());
    }

    #[tokio::test]
    async fn test_unavailable() {
        let store = InMemorySessionStore::new();
        store.insert(session("s1")).await.unwrap();
        store.set_unavailable(true);
        assert!(store.get(&SessionId::new("s1")).await.unwrap_err().is_transient());

        store.set_unavailable(false);
        assert_eq!(store.list().await.unwrap().len(), 1);
    }
}
