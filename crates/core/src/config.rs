//! Bridge runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into the bridge services. The intent is to avoid reading process-wide environment
//! variables during request handling, which can lead to inconsistent behaviour in multi-threaded
//! runtimes and test harnesses.

use crate::{BridgeError, BridgeResult};
use std::net::SocketAddr;

/// Default REST listen address when `LLAMADOR_REST_ADDR` is unset.
pub const DEFAULT_REST_ADDR: &str = "0.0.0.0:3000";

/// Bridge configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct BridgeConfig {
    rest_addr: SocketAddr,
    backend_base_url: Option<String>,
}

impl BridgeConfig {
    /// Create a new `BridgeConfig`.
    pub fn new(rest_addr: SocketAddr, backend_base_url: Option<String>) -> Self {
        Self {
            rest_addr,
            backend_base_url,
        }
    }

    pub fn rest_addr(&self) -> SocketAddr {
        self.rest_addr
    }

    /// Base URL of the reverse-proxied agenda backend, when configured.
    ///
    /// The bridge itself never talks to the backend; the surrounding
    /// application does. It is carried here so both are configured in one
    /// place at startup.
    pub fn backend_base_url(&self) -> Option<&str> {
        self.backend_base_url.as_deref()
    }
}

/// Parse the REST listen address from an optional environment value.
///
/// If `value` is `None` or empty/whitespace, returns [`DEFAULT_REST_ADDR`].
pub fn rest_addr_from_env_value(value: Option<String>) -> BridgeResult<SocketAddr> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_REST_ADDR.to_string());

    value.parse().map_err(BridgeError::InvalidListenAddr)
}

/// Validate the backend base URL from an optional environment value.
///
/// `None` or an empty value means no backend is configured. A configured
/// value must carry an http(s) scheme; a trailing slash is dropped so path
/// joins stay predictable.
pub fn backend_base_url_from_env_value(value: Option<String>) -> BridgeResult<Option<String>> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    let Some(url) = value else {
        return Ok(None);
    };

    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(BridgeError::InvalidInput(
            "BACKEND_BASE_URL must start with http:// or https://".into(),
        ));
    }

    Ok(Some(url.trim_end_matches('/').to_string()))
}
