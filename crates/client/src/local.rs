//! Same-device fallback channel.
//!
//! The agenda and its monitors may share one device (a front-desk machine
//! driving a waiting-room screen). Alongside the push transport, calls are
//! mirrored over an in-process key/value broadcast so co-located monitors
//! announce without a network round trip. Best-effort only: lagging or
//! closed receivers are dropped, never fatal, and the push transport stays
//! the authoritative path.

use llamador_types::{CallEvent, LOCAL_CHANNEL_KEY};
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 64;

/// One keyed payload on the local bus.
#[derive(Debug, Clone)]
pub struct LocalMessage {
    pub key: String,
    pub value: String,
}

/// Process-local key/value broadcast primitive.
///
/// Clones share the same underlying channel; hand one instance to every
/// component that should see the same device-local traffic.
#[derive(Debug, Clone)]
pub struct LocalBus {
    tx: broadcast::Sender<LocalMessage>,
}

impl LocalBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Publishes a payload under `key`. Having no listeners is not an
    /// error.
    pub fn publish(&self, key: impl Into<String>, value: impl Into<String>) {
        let _ = self.tx.send(LocalMessage {
            key: key.into(),
            value: value.into(),
        });
    }

    /// Publishes a call event under the fixed channel key.
    pub fn publish_call(&self, event: &CallEvent) {
        match event.to_json() {
            Ok(payload) => self.publish(LOCAL_CHANNEL_KEY, payload),
            Err(err) => tracing::warn!(error = %err, "failed to encode local call payload"),
        }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<LocalMessage> {
        self.tx.subscribe()
    }
}

impl Default for LocalBus {
    fn default() -> Self {
        Self::new()
    }
}
