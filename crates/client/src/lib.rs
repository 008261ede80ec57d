//! # Llamador Client
//!
//! Caller/monitor side of the patient-calling bridge.
//!
//! The agenda dispatches calls through [`CallerClient::call_patient`];
//! waiting-room monitors subscribe with
//! [`CallerClient::subscribe_to_calls`] (push transport) and
//! [`CallerClient::on_local_call_received`] (same-device fallback), feeding
//! both into a [`MonitorController`] that dedups and drives the screen.

#![warn(rust_2018_idioms)]

pub mod backoff;
pub mod caller;
pub mod error;
pub mod local;
pub mod monitor;
mod sse;

pub use backoff::Backoff;
pub use caller::{CallSubscription, CallerClient};
pub use error::{ClientError, ClientResult};
pub use local::{LocalBus, LocalMessage};
pub use monitor::{MonitorController, HIGHLIGHT_WINDOW, HISTORY_LIMIT};
