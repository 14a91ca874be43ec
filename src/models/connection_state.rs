//! Connection lifecycle states for the shared realtime connection.

use std::fmt;

/// State of the single shared realtime connection.
///
/// Exactly one connection exists at a time; transitions are driven by the
/// background connection task and are never concurrent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection exists.
    Disconnected,
    /// Transport handshake in progress.
    Connecting,
    /// Connection established; receive loop running.
    Connected,
    /// Deliberate close in progress.
    Closing,
}

impl ConnectionState {
    /// Encode for storage in an `AtomicU8`.
    pub(crate) fn as_u8(self) -> u8 {
        match self {
            ConnectionState::Disconnected => 0,
            ConnectionState::Connecting => 1,
            ConnectionState::Connected => 2,
            ConnectionState::Closing => 3,
        }
    }

    /// Decode from an `AtomicU8` value. Unknown values map to `Disconnected`.
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Connected,
            3 => ConnectionState::Closing,
            _ => ConnectionState::Disconnected,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Closing => write!(f, "closing"),
        }
    }
}
