//! Connection lifecycle hooks for the realtime client.
//!
//! Callback-based hooks for observing the shared connection:
//!
//! - [`on_connect`](EventHandlers::on_connect): connection established
//! - [`on_disconnect`](EventHandlers::on_disconnect): connection closed
//! - [`on_error`](EventHandlers::on_error): transport-level failure
//! - [`on_protocol_error`](EventHandlers::on_protocol_error): server-reported
//!   failure frame ([`ErrorSignal`]); non-fatal, the connection stays up
//!
//! All hooks are optional and `Send + Sync` so they can fire from the
//! background connection task.

use std::fmt;
use std::sync::Arc;

use crate::models::ErrorSignal;

/// Reason for a disconnect event.
#[derive(Debug, Clone)]
pub struct DisconnectReason {
    /// Human-readable description of why the connection closed.
    pub message: String,
    /// WebSocket close code, if available (e.g. 1000 = normal, 1008 = policy).
    pub code: Option<u16>,
}

impl DisconnectReason {
    /// Create a disconnect reason with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    /// Create a disconnect reason with a message and close code.
    pub fn with_code(message: impl Into<String>, code: u16) -> Self {
        Self {
            message: message.into(),
            code: Some(code),
        }
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(code) = self.code {
            write!(f, "{} (code: {})", self.message, code)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

/// Error information passed to the `on_error` hook.
#[derive(Debug, Clone)]
pub struct ConnectionError {
    /// Human-readable error message.
    pub message: String,
    /// Whether this error is recoverable (auto-reconnect may succeed).
    pub recoverable: bool,
}

impl ConnectionError {
    /// Create a new connection error.
    pub fn new(message: impl Into<String>, recoverable: bool) -> Self {
        Self {
            message: message.into(),
            recoverable,
        }
    }
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

type OnConnectCallback = Arc<dyn Fn() + Send + Sync>;
type OnDisconnectCallback = Arc<dyn Fn(DisconnectReason) + Send + Sync>;
type OnErrorCallback = Arc<dyn Fn(ConnectionError) + Send + Sync>;
type OnProtocolErrorCallback = Arc<dyn Fn(ErrorSignal) + Send + Sync>;

/// Connection lifecycle event handlers.
///
/// All handlers are optional; register only the ones you need.
///
/// # Example
///
/// ```rust
/// use pulse_link::EventHandlers;
///
/// let handlers = EventHandlers::new()
///     .on_connect(|| println!("realtime up"))
///     .on_disconnect(|reason| println!("realtime down: {}", reason))
///     .on_protocol_error(|signal| eprintln!("server error: {}", signal));
/// ```
#[derive(Clone, Default)]
pub struct EventHandlers {
    pub(crate) on_connect: Option<OnConnectCallback>,
    pub(crate) on_disconnect: Option<OnDisconnectCallback>,
    pub(crate) on_error: Option<OnErrorCallback>,
    pub(crate) on_protocol_error: Option<OnProtocolErrorCallback>,
}

impl fmt::Debug for EventHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHandlers")
            .field("on_connect", &self.on_connect.is_some())
            .field("on_disconnect", &self.on_disconnect.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_protocol_error", &self.on_protocol_error.is_some())
            .finish()
    }
}

impl EventHandlers {
    /// Create an empty `EventHandlers` (no callbacks registered).
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback invoked when the connection is established.
    pub fn on_connect(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_connect = Some(Arc::new(f));
        self
    }

    /// Register a callback invoked when the connection is closed,
    /// deliberately or not.
    pub fn on_disconnect(mut self, f: impl Fn(DisconnectReason) + Send + Sync + 'static) -> Self {
        self.on_disconnect = Some(Arc::new(f));
        self
    }

    /// Register a callback invoked on transport-level failures.
    ///
    /// The [`ConnectionError`] indicates whether the failure is recoverable
    /// (auto-reconnect may help) or fatal.
    pub fn on_error(mut self, f: impl Fn(ConnectionError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }

    /// Register a callback invoked when the server sends an error frame.
    ///
    /// Protocol errors are informational: the connection and all
    /// subscriptions stay alive unless the server also closes the transport.
    pub fn on_protocol_error(mut self, f: impl Fn(ErrorSignal) + Send + Sync + 'static) -> Self {
        self.on_protocol_error = Some(Arc::new(f));
        self
    }

    pub(crate) fn emit_connect(&self) {
        if let Some(cb) = &self.on_connect {
            cb();
        }
    }

    pub(crate) fn emit_disconnect(&self, reason: DisconnectReason) {
        if let Some(cb) = &self.on_disconnect {
            cb(reason);
        }
    }

    pub(crate) fn emit_error(&self, error: ConnectionError) {
        if let Some(cb) = &self.on_error {
            cb(error);
        }
    }

    pub(crate) fn emit_protocol_error(&self, signal: ErrorSignal) {
        if let Some(cb) = &self.on_protocol_error {
            cb(signal);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_emit_with_no_handlers_is_a_noop() {
        let handlers = EventHandlers::new();
        handlers.emit_connect();
        handlers.emit_disconnect(DisconnectReason::new("bye"));
        handlers.emit_error(ConnectionError::new("oops", true));
    }

    #[test]
    fn test_registered_handler_fires() {
        let hits = Arc::new(AtomicU32::new(0));
        let hits_clone = hits.clone();
        let handlers = EventHandlers::new().on_connect(move || {
            hits_clone.fetch_add(1, Ordering::SeqCst);
        });
        handlers.emit_connect();
        handlers.emit_connect();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_disconnect_reason_display() {
        assert_eq!(DisconnectReason::new("gone").to_string(), "gone");
        assert_eq!(
            DisconnectReason::with_code("gone", 1008).to_string(),
            "gone (code: 1008)"
        );
    }
}
