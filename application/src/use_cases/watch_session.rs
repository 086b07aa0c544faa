//! Watch session use case
//!
//! Read-only observers follow a session either by polling the store on a
//! fixed interval or through the store's push subscription. Both run as
//! background tasks stopped through a [`WatchHandle`].
//!
//! Transport errors during a background poll are logged and swallowed; the
//! observer keeps the last record it saw.

use crate::config::EngineConfig;
use crate::ports::session_store::SessionStore;
use dialogos_domain::{Session, SessionId};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Handle to a running watch. Dropping it does not stop the watch.
pub struct WatchHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl WatchHandle {
    /// Stop delivering updates.
    pub fn unsubscribe(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop and wait for the background task to exit.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            warn!("Watch task ended abnormally: {}", e);
        }
    }
}

/// Use case for following a session record
pub struct WatchSessionUseCase {
    store: Arc<dyn SessionStore>,
    config: EngineConfig,
}

impl WatchSessionUseCase {
    pub fn new(store: Arc<dyn SessionStore>, config: EngineConfig) -> Self {
        Self { store, config }
    }

    /// Poll the record every `poll_interval` and call `on_update` whenever
    /// its version changes. Ends when cancelled or when the record is deleted
    /// after having been seen.
    pub async fn poll<F>(&self, id: &SessionId, cancel: CancellationToken, mut on_update: F)
    where
        F: FnMut(Session),
    {
        poll_loop(self.store.clone(), self.config.poll_interval, id.clone(), cancel, &mut on_update).await;
    }

    /// Background version of [`poll`](Self::poll).
    pub fn spawn_poller<F>(&self, id: &SessionId, mut on_update: F) -> WatchHandle
    where
        F: FnMut(Session) + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let store = self.store.clone();
        let interval = self.config.poll_interval;
        let id = id.clone();
        let token = cancel.clone();
        let task = tokio::spawn(async move {
            poll_loop(store, interval, id, token, &mut on_update).await;
        });
        WatchHandle { cancel, task }
    }

    /// Deliver every record the store publishes for this session.
    pub fn spawn_subscription<F>(&self, id: &SessionId, mut on_update: F) -> WatchHandle
    where
        F: FnMut(Session) + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let mut updates = self.store.subscribe(id);
        let id = id.clone();
        let token = cancel.clone();
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    received = updates.recv() => match received {
                        Ok(session) => on_update(session),
                        Err(RecvError::Lagged(skipped)) => {
                            warn!("Subscriber for session {} skipped {} updates", id, skipped);
                        }
                        Err(RecvError::Closed) => {
                            debug!("Update channel for session {} closed", id);
                            break;
                        }
                    },
                }
            }
        });
        WatchHandle { cancel, task }
    }
}

async fn poll_loop<F>(
    store: Arc<dyn SessionStore>,
    interval: std::time::Duration,
    id: SessionId,
    cancel: CancellationToken,
    on_update: &mut F,
) where
    F: FnMut(Session),
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_version: Option<u64> = None;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        match store.get(&id).await {
            Ok(Some(session)) => {
                if last_version != Some(session.version) {
                    last_version = Some(session.version);
                    on_update(session);
                }
            }
            Ok(None) if last_version.is_some() => {
                debug!("Session {} was deleted, stopping poll", id);
                break;
            }
            Ok(None) => debug!("Session {} not found yet", id),
            Err(e) => warn!("Background poll of session {} failed: {}", id, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::session_store::StoreError;
    use crate::use_cases::manage_session::ManageSessionUseCase;
    use crate::use_cases::testing::MockStore;
    use dialogos_domain::{ActorContext, Role, SessionConfig};
    use std::sync::Mutex;
    use std::time::Duration;

    fn engine() -> EngineConfig {
        EngineConfig::default().with_poll_interval(Duration::from_secs(3))
    }

    async fn created(store: &Arc<MockStore>) -> SessionId {
        ManageSessionUseCase::new(store.clone(), engine())
            .create_session(&ActorContext::now("host"), "Hana", SessionConfig::new("Watched"))
            .await
            .unwrap()
            .session_id
    }

    #[tokio::test(start_paused = true)]
    async fn test_poller_reports_only_new_versions() {
        let store = Arc::new(MockStore::new());
        let id = created(&store).await;
        let watch = WatchSessionUseCase::new(store.clone(), engine());

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let handle = watch.spawn_poller(&id, move |s| sink.lock().unwrap().push(s.version));

        tokio::time::sleep(Duration::from_secs(7)).await;
        assert_eq!(*seen.lock().unwrap(), vec![1]);

        ManageSessionUseCase::new(store.clone(), engine())
            .join_session(&id, &ActorContext::now("guest"), "Gil", Role::Unassigned)
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(3)).await;

        handle.shutdown().await;
        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_swallows_transport_errors() {
        let store = Arc::new(MockStore::new());
        let id = created(&store).await;
        store.fail_next_gets(vec![
            StoreError::Unavailable("down".into()),
            StoreError::Unavailable("down".into()),
        ]);
        let watch = WatchSessionUseCase::new(store.clone(), engine());

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let handle = watch.spawn_poller(&id, move |s| sink.lock().unwrap().push(s.version));

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(!handle.is_finished());
        handle.shutdown().await;
        assert_eq!(*seen.lock().unwrap(), vec![1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_stops_when_session_deleted() {
        let store = Arc::new(MockStore::new());
        let id = created(&store).await;
        let watch = WatchSessionUseCase::new(store.clone(), engine());
        let cancel = CancellationToken::new();

        let polling = {
            let store = store.clone();
            let id = id.clone();
            async move {
                tokio::time::sleep(Duration::from_secs(4)).await;
                store.delete(&id).await.unwrap();
            }
        };
        let mut count = 0;
        let watching = watch.poll(&id, cancel.clone(), |_| count += 1);
        tokio::join!(polling, watching);

        assert_eq!(count, 1);
        assert!(!cancel.is_cancelled());
    }

    #[tokio::test]
    async fn test_subscription_delivers_pushed_records() {
        let store = Arc::new(MockStore::new());
        let id = created(&store).await;
        let watch = WatchSessionUseCase::new(store.clone(), engine());

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let handle = watch.spawn_subscription(&id, move |s| {
            let _ = tx.send(s.participants.len());
        });

        ManageSessionUseCase::new(store.clone(), engine())
            .join_session(&id, &ActorContext::now("guest"), "Gil", Role::Unassigned)
            .await
            .unwrap();

        assert_eq!(rx.recv().await, Some(2));
        handle.unsubscribe();
        handle.shutdown().await;
    }
}
