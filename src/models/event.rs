//! Inbound realtime payloads: events and server-reported errors.

use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::collections::BTreeSet;

/// A realtime event broadcast by the server.
///
/// Delivered to every live subscription whose topic set intersects
/// `channels`. Transient: constructed per inbound frame, handed to matching
/// callbacks, then discarded.
#[derive(Debug, Clone, Deserialize)]
pub struct RealtimeEvent {
    /// Server-side event names that produced this broadcast
    /// (e.g. `"documents.*.create"`).
    #[serde(default)]
    pub events: Vec<String>,

    /// Topics this event was published on.
    pub channels: BTreeSet<String>,

    /// Server timestamp of the event, as reported on the wire.
    #[serde(default)]
    pub timestamp: String,

    /// Opaque event payload. Callers decode this into their own types.
    #[serde(default)]
    pub payload: JsonValue,
}

impl RealtimeEvent {
    /// Whether this event was published on `channel`.
    pub fn has_channel(&self, channel: &str) -> bool {
        self.channels.contains(channel)
    }
}

/// A server-reported protocol failure.
///
/// Surfaced to the caller through
/// [`EventHandlers::on_protocol_error`](crate::EventHandlers::on_protocol_error).
/// Receiving one does not close the connection or any subscription; transport
/// closure is detected independently by the receive loop.
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct ErrorSignal {
    /// Opaque failure description from the server.
    pub payload: JsonValue,
}

impl ErrorSignal {
    /// Best-effort extraction of a human-readable message from the payload.
    pub fn message(&self) -> Option<&str> {
        self.payload.get("message").and_then(JsonValue::as_str)
    }

    /// Best-effort extraction of a numeric error code from the payload.
    pub fn code(&self) -> Option<i64> {
        self.payload.get("code").and_then(JsonValue::as_i64)
    }
}

impl std::fmt::Display for ErrorSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.message() {
            Some(msg) => write!(f, "{}", msg),
            None => write!(f, "{}", self.payload),
        }
    }
}
