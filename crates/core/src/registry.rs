//! Process-wide registry of live monitor subscriptions.
//!
//! The registry is the only shared mutable state in the bridge. It is
//! mutated from two sides: the transport layer on connect/disconnect, and
//! the broadcaster when a write to a sink fails. Iteration always runs over
//! a snapshot, so a disconnect firing mid-dispatch can never skip or
//! double-visit unrelated live entries.

use llamador_types::{CallEvent, MonitorId};
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Writable handle to one subscriber's transport stream.
///
/// Sends never block; a send error means the receiving stream is gone and
/// the entry should be dropped from the registry.
pub type EventSink = mpsc::UnboundedSender<CallEvent>;

/// A live connection from one monitor display.
///
/// Created when a monitor opens a streaming connection and destroyed when
/// that connection closes. A reconnecting monitor gets a brand-new
/// `Subscriber` with a fresh connection id.
#[derive(Debug, Clone)]
pub struct Subscriber {
    connection_id: Uuid,
    monitor_id: MonitorId,
    sink: EventSink,
}

impl Subscriber {
    /// Creates a subscriber for `monitor_id` writing into `sink`, with a
    /// newly generated connection id.
    pub fn new(monitor_id: MonitorId, sink: EventSink) -> Self {
        Self {
            connection_id: Uuid::new_v4(),
            monitor_id,
            sink,
        }
    }

    pub fn connection_id(&self) -> Uuid {
        self.connection_id
    }

    pub fn monitor_id(&self) -> &MonitorId {
        &self.monitor_id
    }

    /// Writes one event to the subscriber's stream. Fails only when the
    /// other end has already gone away.
    pub fn send(&self, event: CallEvent) -> Result<(), mpsc::error::SendError<CallEvent>> {
        self.sink.send(event)
    }
}

/// In-memory set of active subscribers, keyed by connection id.
///
/// Constructed once at process start and injected into both the transport
/// handler and the broadcaster. Empty at startup, no persistence; a process
/// restart drops all subscribers and clients reconnect.
#[derive(Debug, Default)]
pub struct SubscriberRegistry {
    inner: Mutex<HashMap<Uuid, Subscriber>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a subscriber, replacing any entry with the same connection id.
    pub fn add(&self, subscriber: Subscriber) {
        self.lock().insert(subscriber.connection_id(), subscriber);
    }

    /// Removes a subscriber. Removing an absent id is a no-op; returns
    /// whether an entry was actually dropped, so disconnect paths that race
    /// (stream teardown vs. broadcaster write failure) log only once.
    pub fn remove(&self, connection_id: &Uuid) -> bool {
        self.lock().remove(connection_id).is_some()
    }

    /// Number of live subscriptions.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Visits a snapshot of the current subscribers.
    ///
    /// The lock is released before `visit` runs, so visitors may call
    /// [`SubscriberRegistry::remove`] freely.
    pub fn for_each(&self, mut visit: impl FnMut(&Subscriber)) {
        for subscriber in self.snapshot() {
            visit(&subscriber);
        }
    }

    fn snapshot(&self) -> Vec<Subscriber> {
        self.lock().values().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, Subscriber>> {
        // The map stays usable after a panic in another holder; recover it.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subscriber(monitor: &str) -> (Subscriber, mpsc::UnboundedReceiver<CallEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Subscriber::new(MonitorId::new(monitor), tx), rx)
    }

    #[test]
    fn test_add_and_remove() {
        let registry = SubscriberRegistry::new();
        let (sub, _rx) = subscriber("SALA_A");
        let id = sub.connection_id();

        registry.add(sub);
        assert_eq!(registry.len(), 1);

        assert!(registry.remove(&id));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_remove_absent_id_is_noop() {
        let registry = SubscriberRegistry::new();
        assert!(!registry.remove(&Uuid::new_v4()));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_each_connection_gets_a_distinct_id() {
        let (a, _rx_a) = subscriber("SALA_A");
        let (b, _rx_b) = subscriber("SALA_A");
        assert_ne!(a.connection_id(), b.connection_id());
    }

    #[test]
    fn test_removal_during_iteration_is_safe() {
        let registry = SubscriberRegistry::new();
        let (a, _rx_a) = subscriber("SALA_A");
        let (b, _rx_b) = subscriber("SALA_B");
        let id_a = a.connection_id();
        let id_b = b.connection_id();
        registry.add(a);
        registry.add(b);

        let mut visited = Vec::new();
        registry.for_each(|sub| {
            // Simulate a disconnect callback firing mid-iteration.
            registry.remove(&id_a);
            visited.push(sub.connection_id());
        });

        assert_eq!(visited.len(), 2);
        assert!(visited.contains(&id_a));
        assert!(visited.contains(&id_b));
        assert_eq!(registry.len(), 1);
    }
}
