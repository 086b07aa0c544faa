//! JSON-file session store
//!
//! One `<session-id>.json` document per session under a root directory.
//! Writes go to a temporary file first and are renamed into place.

use super::channels::UpdateChannels;
use async_trait::async_trait;
use dialogos_application::ports::session_store::{SessionStore, StoreError};
use dialogos_domain::{Session, SessionId};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, warn};

/// Session store persisting each record as a JSON document.
///
/// Writers in this process are serialized so that the version check and the
/// write are atomic. Other processes sharing the directory are not guarded.
pub struct FileSessionStore {
    root: PathBuf,
    write_lock: Mutex<()>,
    channels: UpdateChannels,
}

impl FileSessionStore {
    /// Open (and create if needed) a store rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| StoreError::Unavailable(format!("{}: {}", root.display(), e)))?;
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
            channels: UpdateChannels::default(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File holding one session. Ids are used verbatim as file names, so
    /// anything outside `[A-Za-z0-9_-]` is refused rather than rewritten.
    fn path_for(&self, id: &SessionId) -> Result<PathBuf, StoreError> {
        let raw = id.as_str();
        if raw.is_empty()
            || !raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(StoreError::Serialization(format!(
                "session id {:?} cannot be used as a file name",
                raw
            )));
        }
        Ok(self.root.join(format!("{}.json", raw)))
    }

    async fn read(&self, id: &SessionId) -> Result<Option<Session>, StoreError> {
        let path = self.path_for(id)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| StoreError::Serialization(format!("{}: {}", path.display(), e))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Unavailable(format!("{}: {}", path.display(), e))),
        }
    }

    async fn write(&self, session: &Session) -> Result<(), StoreError> {
        let path = self.path_for(&session.session_id)?;
        let tmp = path.with_extension("json.tmp");
        let bytes =
            serde_json::to_vec_pretty(session).map_err(|e| StoreError::Serialization(e.to_string()))?;
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| StoreError::Unavailable(format!("{}: {}", tmp.display(), e)))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| StoreError::Unavailable(format!("{}: {}", path.display(), e)))
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn insert(&self, mut session: Session) -> Result<Session, StoreError> {
        let _guard = self.write_lock.lock().await;
        if self.read(&session.session_id).await?.is_some() {
            return Err(StoreError::AlreadyExists(session.session_id));
        }
        session.version = 1;
        self.write(&session).await?;
        debug!("Inserted session {} at {}", session.session_id, self.root.display());
        Ok(session)
    }

    async fn get(&self, id: &SessionId) -> Result<Option<Session>, StoreError> {
        self.read(id).await
    }

    async fn save(&self, mut session: Session, expected_version: Option<u64>) -> Result<Session, StoreError> {
        let guard = self.write_lock.lock().await;
        let current = self
            .read(&session.session_id)
            .await?
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
        self.write(&session).await?;
        drop(guard);

        self.channels.publish(&session);
        Ok(session)
    }

    async fn delete(&self, id: &SessionId) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().await;
        let path = self.path_for(id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                self.channels.close(id);
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::Unavailable(format!("{}: {}", path.display(), e))),
        }
    }

    async fn list(&self) -> Result<Vec<Session>, StoreError> {
        let mut entries = tokio::fs::read_dir(&self.root)
            .await
            .map_err(|e| StoreError::Unavailable(format!("{}: {}", self.root.display(), e)))?;

        let mut sessions = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let bytes = match tokio::fs::read(&path).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!("Skipping unreadable session file {}: {}", path.display(), e);
                    continue;
                }
            };
            match serde_json::from_slice::<Session>(&bytes) {
                Ok(session) => sessions.push(session),
                Err(e) => warn!("Skipping malformed session file {}: {}", path.display(), e),
            }
        }
        Ok(sessions)
    }

    fn subscribe(&self, id: &SessionId) -> broadcast::Receiver<Session> {
        self.channels.subscribe(id)
    }
}
