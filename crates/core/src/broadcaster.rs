//! Fan-out of call events to matching subscribers.

use crate::registry::SubscriberRegistry;
use llamador_types::{CallEvent, CallEventInput};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Outcome of one dispatch: the constructed event plus how many subscribers
/// it was actually written to.
#[derive(Debug, Clone)]
pub struct DispatchReceipt {
    pub event: CallEvent,
    pub delivered: usize,
}

/// Accepts call requests, stamps them, and writes them to every matching
/// registry entry.
///
/// Delivery is fire-and-forget and at-most-once per subscriber: a failed
/// write is logged, treated as a disconnect, and never aborts delivery to
/// the remaining subscribers. The caller gets the constructed event back
/// without waiting for any acknowledgement.
pub struct CallBroadcaster {
    registry: Arc<SubscriberRegistry>,
    // Serializes fan-outs so concurrent producers cannot interleave
    // partial deliveries into one sink.
    dispatch_lock: Mutex<()>,
    last_timestamp: AtomicI64,
}

impl CallBroadcaster {
    pub fn new(registry: Arc<SubscriberRegistry>) -> Self {
        Self {
            registry,
            dispatch_lock: Mutex::new(()),
            last_timestamp: AtomicI64::new(0),
        }
    }

    pub fn registry(&self) -> &Arc<SubscriberRegistry> {
        &self.registry
    }

    /// Stamps `input` with a timestamp and fans the resulting event out to
    /// every subscriber whose monitor id matches.
    ///
    /// The timestamp is assigned exactly once, here, and is non-decreasing
    /// across dispatches even if the wall clock steps backwards.
    pub fn dispatch(&self, input: CallEventInput) -> DispatchReceipt {
        let _guard = self
            .dispatch_lock
            .lock()
            .unwrap_or_else(|e| e.into_inner());

        let event = input.into_event(self.next_timestamp());

        let mut delivered = 0usize;
        let mut dead: Vec<Uuid> = Vec::new();

        self.registry.for_each(|subscriber| {
            if !subscriber.monitor_id().matches(&event.monitor_id) {
                return;
            }
            match subscriber.send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(_) => {
                    tracing::warn!(
                        connection_id = %subscriber.connection_id(),
                        monitor_id = %subscriber.monitor_id(),
                        "dropping subscriber with closed sink"
                    );
                    dead.push(subscriber.connection_id());
                }
            }
        });

        for connection_id in dead {
            self.registry.remove(&connection_id);
        }

        tracing::debug!(
            monitor_id = %event.monitor_id,
            timestamp = event.timestamp,
            delivered,
            "dispatched call"
        );

        DispatchReceipt { event, delivered }
    }

    fn next_timestamp(&self) -> i64 {
        // Only called under the dispatch lock, so load/store need not be a
        // single atomic operation.
        let now = chrono::Utc::now().timestamp_millis();
        let stamped = now.max(self.last_timestamp.load(Ordering::Acquire));
        self.last_timestamp.store(stamped, Ordering::Release);
        stamped
    }
}
