//! Wire-level types for the patient-calling bridge.
//!
//! Everything that crosses the bridge boundary lives here so the server
//! (`llamador-core`, `api-rest`) and the caller/monitor side
//! (`llamador-client`) agree on one data model. Field names are camelCase on
//! the wire (`patientId`, `roomLabel`, ...) to match the agenda frontend.

use serde::{Deserialize, Serialize};

/// Sentinel monitor identifier meaning "unscoped": a call addressed to
/// `GENERAL` reaches every monitor, and a monitor subscribed as `GENERAL`
/// receives every call.
pub const GENERAL_MONITOR: &str = "GENERAL";

/// SSE event name used for call frames (`event: call`).
pub const CALL_EVENT_NAME: &str = "call";

/// Fixed key of the same-device fallback channel.
pub const LOCAL_CHANNEL_KEY: &str = "llamador:ultima-llamada";

/// Errors that can occur when moving call events across the wire.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("failed to encode call event: {0}")]
    Encode(serde_json::Error),
    #[error("failed to decode call event: {0}")]
    Decode(serde_json::Error),
}

/// Identifier of a waiting-room monitor display.
///
/// Construction trims surrounding whitespace; an empty or missing identifier
/// collapses to [`GENERAL_MONITOR`], so a `MonitorId` is never blank.
#[derive(Debug, Clone, PartialEq, Eq, Hash, utoipa::ToSchema)]
pub struct MonitorId(String);

impl MonitorId {
    /// Creates a `MonitorId` from the given input, trimming whitespace.
    /// Empty input yields the `GENERAL` sentinel.
    pub fn new(input: impl AsRef<str>) -> Self {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Self::general();
        }
        Self(trimmed.to_owned())
    }

    /// The `GENERAL` sentinel.
    pub fn general() -> Self {
        Self(GENERAL_MONITOR.to_owned())
    }

    /// Whether this identifier is the `GENERAL` sentinel.
    pub fn is_general(&self) -> bool {
        self.0 == GENERAL_MONITOR
    }

    /// The fan-out predicate: a subscriber scoped to `self` receives an
    /// event addressed to `other` (and vice versa; the relation is
    /// symmetric). Exactly one of the identifiers being `GENERAL` is enough
    /// for a match, as is equality.
    pub fn matches(&self, other: &MonitorId) -> bool {
        self == other || self.is_general() || other.is_general()
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for MonitorId {
    fn default() -> Self {
        Self::general()
    }
}

impl std::fmt::Display for MonitorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for MonitorId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl Serialize for MonitorId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for MonitorId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(MonitorId::new(s))
    }
}

/// Deserializes an opaque patient identifier from either a JSON string or a
/// JSON number. The agenda backend sends numeric ids; the bridge treats them
/// as opaque text.
fn opaque_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(i64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}

/// A dispatched patient call, as delivered to monitors.
///
/// `timestamp` is assigned exactly once by the broadcaster and doubles as
/// the ordering/dedup key on the monitor side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CallEvent {
    #[serde(deserialize_with = "opaque_id")]
    pub patient_id: String,
    pub patient_name: String,
    pub room_label: String,
    pub monitor_id: MonitorId,
    /// Milliseconds since the Unix epoch, non-decreasing across dispatches.
    pub timestamp: i64,
}

impl CallEvent {
    /// Serializes the event to its wire JSON form.
    pub fn to_json(&self) -> Result<String, WireError> {
        serde_json::to_string(self).map_err(WireError::Encode)
    }

    /// Parses an event from its wire JSON form.
    pub fn from_json(raw: &str) -> Result<Self, WireError> {
        serde_json::from_str(raw).map_err(WireError::Decode)
    }
}

impl std::fmt::Display for CallEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.patient_name, self.room_label)
    }
}

/// A call request as submitted by the agenda side.
///
/// `monitor_id` is optional and defaults to `GENERAL`. Unknown fields are
/// ignored rather than forwarded. Empty `patient_name`/`room_label` are a
/// display concern and are not rejected here.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CallEventInput {
    #[serde(deserialize_with = "opaque_id")]
    pub patient_id: String,
    pub patient_name: String,
    pub room_label: String,
    #[serde(default)]
    pub monitor_id: MonitorId,
}

impl CallEventInput {
    /// Completes the input into a full [`CallEvent`] with the timestamp the
    /// broadcaster assigned.
    pub fn into_event(self, timestamp: i64) -> CallEvent {
        CallEvent {
            patient_id: self.patient_id,
            patient_name: self.patient_name,
            room_label: self.room_label,
            monitor_id: self.monitor_id,
            timestamp,
        }
    }
}

/// Health check response shared by the service binaries.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// Acknowledgement returned by a successful call dispatch.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct DispatchCallRes {
    pub success: bool,
    pub data: CallEvent,
}

/// Error body returned for an unreadable dispatch request.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct DispatchErrorRes {
    pub error: String,
}

/// Response for a subscription probe that did not ask for an event stream.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct StreamProbeRes {
    pub message: String,
    pub subscribers: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monitor_id_defaults_to_general() {
        assert!(MonitorId::default().is_general());
        assert!(MonitorId::new("").is_general());
        assert!(MonitorId::new("   ").is_general());
        assert_eq!(MonitorId::new(" SALA_A ").as_str(), "SALA_A");
    }

    #[test]
    fn test_monitor_id_match_quadrants() {
        let general = MonitorId::general();
        let sala_a = MonitorId::new("SALA_A");
        let sala_b = MonitorId::new("SALA_B");

        // specific x specific
        assert!(sala_a.matches(&sala_a));
        assert!(!sala_a.matches(&sala_b));
        // specific x general
        assert!(sala_a.matches(&general));
        // general x specific
        assert!(general.matches(&sala_b));
        // general x general
        assert!(general.matches(&general));
    }

    #[test]
    fn test_call_event_wire_names_are_camel_case() {
        let event = CallEvent {
            patient_id: "1".into(),
            patient_name: "Juan Perez".into(),
            room_label: "CONSULTORIO 101".into(),
            monitor_id: MonitorId::new("SALA_B"),
            timestamp: 1700000000000,
        };

        let json = event.to_json().unwrap();
        assert!(json.contains("\"patientId\":\"1\""));
        assert!(json.contains("\"patientName\":\"Juan Perez\""));
        assert!(json.contains("\"roomLabel\":\"CONSULTORIO 101\""));
        assert!(json.contains("\"monitorId\":\"SALA_B\""));

        let back = CallEvent::from_json(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_input_accepts_numeric_patient_id() {
        let input: CallEventInput = serde_json::from_str(
            r#"{"patientId":1,"patientName":"Juan Perez","roomLabel":"CONSULTORIO 101"}"#,
        )
        .unwrap();
        assert_eq!(input.patient_id, "1");
        assert!(input.monitor_id.is_general());
    }

    #[test]
    fn test_input_ignores_unknown_fields() {
        let input: CallEventInput = serde_json::from_str(
            r#"{"patientId":"7","patientName":"Ana","roomLabel":"101","monitorId":"SALA_A","extra":true}"#,
        )
        .unwrap();
        assert_eq!(input.monitor_id.as_str(), "SALA_A");
    }

    #[test]
    fn test_from_json_rejects_malformed_payload() {
        assert!(matches!(
            CallEvent::from_json("{not json"),
            Err(WireError::Decode(_))
        ));
    }

    #[test]
    fn test_into_event_keeps_fields_and_sets_timestamp() {
        let input = CallEventInput {
            patient_id: "9".into(),
            patient_name: "Maria Lopez".into(),
            room_label: "CONSULTORIO 2".into(),
            monitor_id: MonitorId::new("SALA_B"),
        };
        let event = input.into_event(42);
        assert_eq!(event.timestamp, 42);
        assert_eq!(event.patient_name, "Maria Lopez");
        assert_eq!(event.monitor_id.as_str(), "SALA_B");
    }
}
