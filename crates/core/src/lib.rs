//! # Llamador Core
//!
//! Core logic for the real-time patient-calling bridge.
//!
//! This crate contains the pieces the agenda and the waiting-room monitors
//! meet in the middle on:
//! - the subscription registry of live monitor connections
//! - the broadcaster that stamps and fans out call events
//! - startup configuration resolved once per process
//!
//! **No API concerns**: HTTP transport, SSE framing, and endpoint routing
//! belong in `api-rest`.

#![warn(rust_2018_idioms)]

pub mod broadcaster;
pub mod config;
pub mod error;
pub mod registry;

pub use broadcaster::{CallBroadcaster, DispatchReceipt};
pub use config::BridgeConfig;
pub use error::{BridgeError, BridgeResult};
pub use registry::{EventSink, Subscriber, SubscriberRegistry};
