//! Test doubles shared by the use case tests.

use crate::ports::session_logger::{SessionEvent, SessionEventLogger};
use crate::ports::session_store::{SessionStore, StoreError};
use async_trait::async_trait;
use dialogos_domain::{Session, SessionId};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::broadcast;

/// In-process store with failure injection.
pub(crate) struct MockStore {
    sessions: Mutex<HashMap<SessionId, Session>>,
    channels: Mutex<HashMap<SessionId, broadcast::Sender<Session>>>,
    /// Errors returned by the next `get` calls, front first.
    get_failures: Mutex<VecDeque<StoreError>>,
    /// When set, the next conditional save sees a foreign write first.
    interleave_write: AtomicBool,
    pub(crate) saves: AtomicUsize,
    pub(crate) gets: AtomicUsize,
}

impl MockStore {
    pub(crate) fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            channels: Mutex::new(HashMap::new()),
            get_failures: Mutex::new(VecDeque::new()),
            interleave_write: AtomicBool::new(false),
            saves: AtomicUsize::new(0),
            gets: AtomicUsize::new(0),
        }
    }

    pub(crate) fn fail_next_gets(&self, errors: Vec<StoreError>) {
        self.get_failures.lock().unwrap().extend(errors);
    }

    pub(crate) fn interleave_next_write(&self) {
        self.interleave_write.store(true, Ordering::SeqCst);
    }

    pub(crate) fn stored(&self, id: &SessionId) -> Option<Session> {
        self.sessions.lock().unwrap().get(id).cloned()
    }

    fn publish(&self, session: &Session) {
        if let Some(sender) = self.channels.lock().unwrap().get(&session.session_id) {
            let _ = sender.send(session.clone());
        }
    }
}

#[async_trait]
impl SessionStore for MockStore {
    async fn insert(&self, mut session: Session) -> Result<Session, StoreError> {
        let mut sessions = self.sessions.lock().unwrap();
        if sessions.contains_key(&session.session_id) {
            return Err(StoreError::AlreadyExists(session.session_id));
        }
        session.version = 1;
        sessions.insert(session.session_id.clone(), session.clone());
        Ok(session)
    }

    async fn get(&self, id: &SessionId) -> Result<Option<Session>, StoreError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.get_failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        Ok(self.stored(id))
    }

    async fn save(&self, mut session: Session, expected_version: Option<u64>) -> Result<Session, StoreError> {
        let stored = {
            let mut sessions = self.sessions.lock().unwrap();
            let current = sessions
                .get_mut(&session.session_id)
                .ok_or_else(|| StoreError::NotFound(session.session_id.clone()))?;
            if expected_version.is_some() && self.interleave_write.swap(false, Ordering::SeqCst) {
                current.version += 1;
            }
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
            session
        };
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.publish(&stored);
        Ok(stored)
    }

    async fn delete(&self, id: &SessionId) -> Result<bool, StoreError> {
        Ok(self.sessions.lock().unwrap().remove(id).is_some())
    }

    async fn list(&self) -> Result<Vec<Session>, StoreError> {
        Ok(self.sessions.lock().unwrap().values().cloned().collect())
    }

    fn subscribe(&self, id: &SessionId) -> broadcast::Receiver<Session> {
        self.channels
            .lock()
            .unwrap()
            .entry(id.clone())
            .or_insert_with(|| broadcast::channel(16).0)
            .subscribe()
    }
}

/// Logger that keeps every event for inspection.
#[derive(Default)]
pub(crate) struct RecordingLogger {
    events: Mutex<Vec<SessionEvent>>,
}

impl RecordingLogger {
    pub(crate) fn event_types(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().iter().map(|e| e.event_type).collect()
    }

    pub(crate) fn payloads(&self, event_type: &str) -> Vec<serde_json::Value> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.event_type == event_type)
            .map(|e| e.payload.clone())
            .collect()
    }

    pub(crate) fn count(&self, event_type: &str) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.event_type == event_type)
            .count()
    }
}

impl SessionEventLogger for RecordingLogger {
    fn log(&self, event: SessionEvent) {
        self.events.lock().unwrap().push(event);
    }
}
