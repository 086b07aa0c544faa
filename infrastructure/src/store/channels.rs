//! Per-session broadcast channels backing `SessionStore::subscribe`.

use dialogos_domain::{Session, SessionId};
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::broadcast;
use tracing::trace;

/// Updates buffered per subscriber before it starts lagging.
const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Default)]
pub(crate) struct UpdateChannels {
    senders: Mutex<HashMap<SessionId, broadcast::Sender<Session>>>,
}

impl UpdateChannels {
    pub(crate) fn subscribe(&self, id: &SessionId) -> broadcast::Receiver<Session> {
        let mut senders = self.senders.lock().unwrap_or_else(|p| p.into_inner());
        senders
            .entry(id.clone())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    pub(crate) fn publish(&self, session: &Session) {
        let senders = self.senders.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(sender) = senders.get(&session.session_id) {
            // No receivers left is not an error for the writer
            let delivered = sender.send(session.clone()).unwrap_or(0);
            trace!("Published session {} v{} to {} subscriber(s)", session.session_id, session.version, delivered);
        }
    }

    /// Drop the channel so subscribers see it close.
    pub(crate) fn close(&self, id: &SessionId) {
        let mut senders = self.senders.lock().unwrap_or_else(|p| p.into_inner());
        senders.remove(id);
    }
}
