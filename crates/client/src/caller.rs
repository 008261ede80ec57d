//! Agenda-side facade over the bridge endpoint.
//!
//! `call_patient` is best-effort: the agenda UI gives optimistic local
//! feedback, so a failed dispatch is logged and swallowed rather than
//! surfaced. Subscriptions run on background tasks and survive connection
//! drops through [`Backoff`]-paced reconnects.

use crate::backoff::Backoff;
use crate::error::{ClientError, ClientResult};
use crate::local::LocalBus;
use crate::sse::FrameParser;
use futures::StreamExt;
use llamador_types::{
    CallEvent, CallEventInput, DispatchCallRes, MonitorId, CALL_EVENT_NAME, LOCAL_CHANNEL_KEY,
};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

const RECONNECT_BASE: Duration = Duration::from_millis(500);
const RECONNECT_MAX: Duration = Duration::from_secs(30);

/// Handle to a running subscription task. Dropping it (or calling
/// [`CallSubscription::unsubscribe`]) closes the underlying connection.
#[derive(Debug)]
pub struct CallSubscription {
    handle: JoinHandle<()>,
}

impl CallSubscription {
    pub fn unsubscribe(self) {
        // Drop does the work.
    }
}

impl Drop for CallSubscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Client facade for both sides of the bridge: the agenda dispatches calls
/// through it and monitors subscribe through it.
#[derive(Debug, Clone)]
pub struct CallerClient {
    http: reqwest::Client,
    endpoint: String,
    local: LocalBus,
}

impl CallerClient {
    /// Creates a client for the given bridge endpoint URL with its own
    /// local bus.
    pub fn new(endpoint: impl Into<String>) -> ClientResult<Self> {
        Self::with_local_bus(endpoint, LocalBus::new())
    }

    /// Creates a client sharing an existing device-local bus.
    pub fn with_local_bus(endpoint: impl Into<String>, local: LocalBus) -> ClientResult<Self> {
        let endpoint = endpoint.into().trim().trim_end_matches('/').to_string();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(ClientError::InvalidEndpoint(endpoint));
        }

        Ok(Self {
            http: reqwest::Client::new(),
            endpoint,
            local,
        })
    }

    /// The device-local bus this client mirrors confirmed calls onto.
    pub fn local_bus(&self) -> &LocalBus {
        &self.local
    }

    /// Dispatches a call. Best-effort: on success the confirmed event (with
    /// its server-assigned timestamp) is returned and mirrored on the local
    /// bus; on failure the error is logged and `None` returned.
    pub async fn call_patient(&self, input: CallEventInput) -> Option<CallEvent> {
        match self.try_call(input).await {
            Ok(event) => {
                self.local.publish_call(&event);
                Some(event)
            }
            Err(err) => {
                tracing::warn!(error = %err, "call dispatch failed; remote monitors will miss it");
                None
            }
        }
    }

    async fn try_call(&self, input: CallEventInput) -> ClientResult<CallEvent> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(&input)
            .send()
            .await
            .map_err(ClientError::Request)?;

        if !response.status().is_success() {
            return Err(ClientError::Rejected(response.status().to_string()));
        }

        let ack: DispatchCallRes = response.json().await.map_err(ClientError::Decode)?;
        if !ack.success {
            return Err(ClientError::Rejected("bridge reported failure".into()));
        }
        Ok(ack.data)
    }

    /// Opens a push subscription for `monitor_id` and invokes `on_call` for
    /// every delivered call frame. Malformed frames are logged and skipped.
    /// The subscription reconnects on its own until the returned handle is
    /// dropped.
    pub fn subscribe_to_calls(
        &self,
        monitor_id: MonitorId,
        on_call: impl Fn(CallEvent) + Send + Sync + 'static,
    ) -> CallSubscription {
        let http = self.http.clone();
        let url = format!("{}?monitorId={}", self.endpoint, monitor_id);

        let handle = tokio::spawn(async move {
            let mut backoff = Backoff::new(RECONNECT_BASE, RECONNECT_MAX);
            loop {
                let request = http
                    .get(&url)
                    .header(reqwest::header::ACCEPT, "text/event-stream");

                match request.send().await {
                    Ok(response) if response.status().is_success() => {
                        tracing::info!(%url, "subscribed to call stream");
                        backoff.reset();
                        read_stream(response, &on_call).await;
                        tracing::info!(%url, "call stream closed, reconnecting");
                    }
                    Ok(response) => {
                        tracing::warn!(%url, status = %response.status(), "call stream refused");
                    }
                    Err(err) => {
                        tracing::warn!(%url, error = %err, "call stream connect failed");
                    }
                }
                tokio::time::sleep(backoff.next_delay()).await;
            }
        });

        CallSubscription { handle }
    }

    /// Invokes `on_call` for every call mirrored on the device-local bus.
    /// Runs in parallel with the push subscription; the display controller
    /// dedups whatever arrives twice.
    pub fn on_local_call_received(
        &self,
        on_call: impl Fn(CallEvent) + Send + Sync + 'static,
    ) -> CallSubscription {
        let mut rx = self.local.subscribe();

        let handle = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(message) if message.key == LOCAL_CHANNEL_KEY => {
                        match CallEvent::from_json(&message.value) {
                            Ok(event) => on_call(event),
                            Err(err) => {
                                tracing::warn!(error = %err, "ignoring malformed local call payload");
                            }
                        }
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "local call channel lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        CallSubscription { handle }
    }
}

/// Drains one open stream, forwarding parsed call frames, until the
/// connection drops.
async fn read_stream(response: reqwest::Response, on_call: &(impl Fn(CallEvent) + Send + Sync)) {
    let mut parser = FrameParser::new();
    let mut chunks = response.bytes_stream();

    while let Some(chunk) = chunks.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(err) => {
                tracing::warn!(error = %err, "call stream read failed");
                return;
            }
        };

        for frame in parser.feed(&chunk) {
            if frame.event != CALL_EVENT_NAME {
                continue;
            }
            match CallEvent::from_json(&frame.data) {
                Ok(event) => on_call(event),
                Err(err) => tracing::warn!(error = %err, "ignoring malformed call frame"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn input() -> CallEventInput {
        CallEventInput {
            patient_id: "1".into(),
            patient_name: "Juan Perez".into(),
            room_label: "CONSULTORIO 101".into(),
            monitor_id: MonitorId::new("SALA_B"),
        }
    }

    #[test]
    fn test_endpoint_must_be_http() {
        assert!(CallerClient::new("ftp://bridge.local/api/calls").is_err());
        assert!(CallerClient::new("http://bridge.local/api/calls/").is_ok());
    }

    #[tokio::test]
    async fn test_call_patient_swallows_network_failure() {
        // Nothing listens on port 9; the dispatch must fail quietly.
        let client = CallerClient::new("http://127.0.0.1:9/api/calls").unwrap();
        assert!(client.call_patient(input()).await.is_none());
    }

    #[tokio::test]
    async fn test_local_subscription_delivers_published_calls() {
        let bus = LocalBus::new();
        let client =
            CallerClient::with_local_bus("http://127.0.0.1:9/api/calls", bus.clone()).unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let _subscription = client.on_local_call_received(move |event| {
            let _ = tx.send(event);
        });

        let event = input().into_event(99);
        bus.publish_call(&event);

        let seen = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(seen, event);
    }

    #[tokio::test]
    async fn test_local_subscription_ignores_other_keys() {
        let bus = LocalBus::new();
        let client =
            CallerClient::with_local_bus("http://127.0.0.1:9/api/calls", bus.clone()).unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let _subscription = client.on_local_call_received(move |event| {
            let _ = tx.send(event);
        });

        bus.publish("unrelated-key", "whatever");
        let event = input().into_event(7);
        bus.publish_call(&event);

        let seen = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(seen.timestamp, 7);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_the_task() {
        let bus = LocalBus::new();
        let client =
            CallerClient::with_local_bus("http://127.0.0.1:9/api/calls", bus.clone()).unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let subscription = client.on_local_call_received(move |event| {
            let _ = tx.send(event);
        });
        subscription.unsubscribe();
        // Give the abort a moment to land.
        tokio::time::sleep(Duration::from_millis(20)).await;

        bus.publish_call(&input().into_event(1));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(rx.try_recv().is_err());
    }
}
