//! Per-connection SSE plumbing for the push transport.
//!
//! Each subscribing monitor gets one long-lived event stream backed by an
//! unbounded channel sink registered with the [`SubscriberRegistry`]. The
//! registry entry lives exactly as long as the stream: dropping the response
//! body (client disconnect, network drop) drops the guard, which removes the
//! entry.

use axum::response::sse::Event;
use llamador_core::{Subscriber, SubscriberRegistry};
use llamador_types::{CallEvent, MonitorId, CALL_EVENT_NAME};
use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::{Stream, StreamExt};
use uuid::Uuid;

/// Removes the registry entry when the stream is dropped.
struct ConnectionGuard {
    registry: Arc<SubscriberRegistry>,
    connection_id: Uuid,
    monitor_id: MonitorId,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        // remove() is idempotent; the broadcaster may already have dropped
        // the entry after a failed write.
        if self.registry.remove(&self.connection_id) {
            tracing::info!(
                connection_id = %self.connection_id,
                monitor_id = %self.monitor_id,
                "monitor disconnected"
            );
        }
    }
}

/// The frame stream for one subscribed monitor.
pub(crate) struct SubscriberStream {
    frames: Pin<Box<dyn Stream<Item = Result<Event, Infallible>> + Send>>,
    _guard: ConnectionGuard,
}

impl Stream for SubscriberStream {
    type Item = Result<Event, Infallible>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().frames.as_mut().poll_next(cx)
    }
}

/// Registers a new subscriber for `monitor_id` and returns its stream.
///
/// The first frame is a `: connected` comment written immediately so
/// buffering proxies flush the response and the client sees the
/// subscription as live.
pub(crate) fn subscribe(registry: Arc<SubscriberRegistry>, monitor_id: MonitorId) -> SubscriberStream {
    let (tx, rx) = mpsc::unbounded_channel();
    let subscriber = Subscriber::new(monitor_id.clone(), tx);
    let connection_id = subscriber.connection_id();
    registry.add(subscriber);

    tracing::info!(
        %connection_id,
        monitor_id = %monitor_id,
        subscribers = registry.len(),
        "monitor subscribed"
    );

    let guard = ConnectionGuard {
        registry,
        connection_id,
        monitor_id,
    };

    let hello = tokio_stream::iter([Ok::<_, Infallible>(Event::default().comment("connected"))]);
    let calls = UnboundedReceiverStream::new(rx).map(|event| Ok::<_, Infallible>(call_frame(event)));

    SubscriberStream {
        frames: Box::pin(hello.chain(calls)),
        _guard: guard,
    }
}

/// Encodes one delivered call as a named SSE frame
/// (`event: call` + JSON data line).
fn call_frame(event: CallEvent) -> Event {
    match Event::default().event(CALL_EVENT_NAME).json_data(&event) {
        Ok(frame) => frame,
        Err(err) => {
            tracing::error!(error = %err, "failed to encode call frame");
            Event::default().comment("undeliverable frame")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use llamador_core::CallBroadcaster;
    use llamador_types::CallEventInput;

    #[tokio::test]
    async fn test_stream_registers_and_drop_unregisters() {
        let registry = Arc::new(SubscriberRegistry::new());
        let stream = subscribe(registry.clone(), MonitorId::new("SALA_A"));
        assert_eq!(registry.len(), 1);

        drop(stream);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_first_frame_is_the_connected_comment() {
        let registry = Arc::new(SubscriberRegistry::new());
        let mut stream = subscribe(registry, MonitorId::general());

        let frame = stream.next().await.unwrap().unwrap();
        // Event has no public accessors; compare the rendered form.
        assert_eq!(format!("{frame:?}"), format!("{:?}", Event::default().comment("connected")));
    }

    #[tokio::test]
    async fn test_dispatched_call_arrives_as_a_call_frame() {
        let registry = Arc::new(SubscriberRegistry::new());
        let broadcaster = CallBroadcaster::new(registry.clone());
        let mut stream = subscribe(registry, MonitorId::new("SALA_B"));
        let _hello = stream.next().await;

        let receipt = broadcaster.dispatch(CallEventInput {
            patient_id: "1".into(),
            patient_name: "Juan Perez".into(),
            room_label: "CONSULTORIO 101".into(),
            monitor_id: MonitorId::new("SALA_B"),
        });
        assert_eq!(receipt.delivered, 1);

        let frame = stream.next().await.unwrap().unwrap();
        let expected = Event::default()
            .event(CALL_EVENT_NAME)
            .json_data(&receipt.event)
            .unwrap();
        assert_eq!(format!("{frame:?}"), format!("{expected:?}"));
    }
}
