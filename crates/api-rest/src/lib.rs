//! # API REST
//!
//! REST surface for the patient-calling bridge.
//!
//! Handles:
//! - the bridge endpoint: SSE push subscriptions and call dispatch
//! - the non-stream probe response for casual inspection
//! - health checks and OpenAPI/Swagger documentation
//!
//! Core semantics (registry, fan-out, timestamps) live in `llamador-core`;
//! this crate only adapts them to HTTP.

#![warn(rust_2018_idioms)]

mod stream;

use axum::{
    extract::rejection::JsonRejection,
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::sse::{KeepAlive, Sse},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use llamador_core::{CallBroadcaster, SubscriberRegistry};
use llamador_types::{
    CallEvent, CallEventInput, DispatchCallRes, DispatchErrorRes, HealthRes, MonitorId,
    StreamProbeRes,
};
use std::sync::Arc;
use std::time::Duration;
use utoipa::OpenApi;

/// Application state shared across bridge handlers.
///
/// One registry and one broadcaster per process, constructed together so
/// both the transport and dispatch paths mutate the same subscriber set.
#[derive(Clone)]
pub struct AppState {
    registry: Arc<SubscriberRegistry>,
    broadcaster: Arc<CallBroadcaster>,
}

impl AppState {
    pub fn new() -> Self {
        let registry = Arc::new(SubscriberRegistry::new());
        let broadcaster = Arc::new(CallBroadcaster::new(registry.clone()));
        Self {
            registry,
            broadcaster,
        }
    }

    pub fn registry(&self) -> &Arc<SubscriberRegistry> {
        &self.registry
    }

    pub fn broadcaster(&self) -> &Arc<CallBroadcaster> {
        &self.broadcaster
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(health, subscribe_calls, dispatch_call),
    components(schemas(
        HealthRes,
        StreamProbeRes,
        DispatchCallRes,
        DispatchErrorRes,
        CallEvent,
        CallEventInput,
        MonitorId
    ))
)]
pub struct ApiDoc;

/// Builds the bridge router over the given state.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/calls", get(subscribe_calls).post(dispatch_call))
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the bridge
///
/// Used for monitoring and load balancer health checks.
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: "llamador bridge is alive".into(),
    })
}

#[derive(Debug, serde::Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
struct SubscribeParams {
    /// Monitor identifier to subscribe as; defaults to GENERAL.
    #[serde(rename = "monitorId")]
    monitor_id: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/calls",
    params(SubscribeParams),
    responses(
        (status = 200, description = "SSE stream of call frames, or a probe message when the request does not accept text/event-stream", body = StreamProbeRes)
    )
)]
/// Opens a push subscription for a monitor
///
/// With `Accept: text/event-stream` this holds the connection open and
/// streams `call` frames for the requested monitor id (default `GENERAL`).
/// Without it, a small JSON acknowledgement is returned instead of a bare
/// 404, and no subscriber is registered.
async fn subscribe_calls(
    State(state): State<AppState>,
    Query(params): Query<SubscribeParams>,
    headers: HeaderMap,
) -> Response {
    let monitor_id = MonitorId::new(params.monitor_id.unwrap_or_default());

    if !accepts_event_stream(&headers) {
        return Json(StreamProbeRes {
            message: "call stream: subscribe with Accept: text/event-stream".into(),
            subscribers: state.registry.len(),
        })
        .into_response();
    }

    let frames = stream::subscribe(state.registry.clone(), monitor_id);
    let sse = Sse::new(frames).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    );

    // Make intermediaries deliver frames immediately: no caching, and the
    // X-Accel-Buffering marker disables reverse-proxy buffering.
    (
        [
            (header::CACHE_CONTROL.as_str(), "no-cache"),
            ("x-accel-buffering", "no"),
        ],
        sse,
    )
        .into_response()
}

fn accepts_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.contains("text/event-stream"))
        .unwrap_or(false)
}

#[utoipa::path(
    post,
    path = "/api/calls",
    request_body = CallEventInput,
    responses(
        (status = 200, description = "Call dispatched", body = DispatchCallRes),
        (status = 400, description = "Unreadable request body", body = DispatchErrorRes)
    )
)]
/// Dispatches a patient call to the matching monitors
///
/// Assigns the event timestamp and fans the call out to every subscribed
/// monitor matching the target id. Delivery is fire-and-forget; the
/// response confirms the constructed event, not subscriber receipt.
async fn dispatch_call(
    State(state): State<AppState>,
    payload: Result<Json<CallEventInput>, JsonRejection>,
) -> Response {
    let Ok(Json(input)) = payload else {
        return (
            StatusCode::BAD_REQUEST,
            Json(DispatchErrorRes {
                error: "Invalid request".into(),
            }),
        )
            .into_response();
    };

    let receipt = state.broadcaster.dispatch(input);
    tracing::info!(
        monitor_id = %receipt.event.monitor_id,
        patient_id = %receipt.event.patient_id,
        delivered = receipt.delivered,
        "call dispatched"
    );

    Json(DispatchCallRes {
        success: true,
        data: receipt.event,
    })
    .into_response()
}
