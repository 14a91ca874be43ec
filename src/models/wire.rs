//! Wire envelope for inbound realtime frames.
//!
//! Every frame is a JSON envelope `{"type": ..., "data": ...}`. Only `event`
//! and `error` envelopes are meaningful to the client; anything else
//! (connection acks, heartbeats added by newer servers) is skipped.

use serde::Deserialize;
use serde_json::Value as JsonValue;

use super::{ErrorSignal, RealtimeEvent};
use crate::error::Result;

const TYPE_EVENT: &str = "event";
const TYPE_ERROR: &str = "error";

/// A classified inbound message.
#[derive(Debug, Clone)]
pub enum RealtimeMessage {
    /// An event to fan out to matching subscriptions.
    Event(RealtimeEvent),
    /// A server-reported failure, surfaced but non-fatal.
    Error(ErrorSignal),
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: JsonValue,
}

/// Parse a raw text frame into a [`RealtimeMessage`].
///
/// Returns `Ok(None)` for well-formed envelopes of unknown type, so the
/// receive loop can skip them without treating them as failures.
pub fn parse_message(text: &str) -> Result<Option<RealtimeMessage>> {
    let envelope: Envelope = serde_json::from_str(text)?;
    match envelope.kind.as_str() {
        TYPE_EVENT => {
            let event: RealtimeEvent = serde_json::from_value(envelope.data)?;
            Ok(Some(RealtimeMessage::Event(event)))
        },
        TYPE_ERROR => {
            let signal: ErrorSignal = serde_json::from_value(envelope.data)?;
            Ok(Some(RealtimeMessage::Error(signal)))
        },
        other => {
            log::debug!("[pulse-link] Skipping unhandled frame type '{}'", other);
            Ok(None)
        },
    }
}
