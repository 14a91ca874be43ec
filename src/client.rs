//! Realtime client with builder pattern.
//!
//! [`RealtimeClient`] is the single owned instance that composes the
//! subscription table, the shared connection task, and the lifecycle hooks.
//! The underlying connection opens when the first subscription makes the
//! channel set non-empty and closes again when the last one is disposed.

use std::collections::BTreeSet;
use std::sync::{Arc, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::connection::{connection_task, Cmd, ConnectionConfig, Shared};
use crate::error::{PulseLinkError, Result};
use crate::event_handlers::EventHandlers;
use crate::models::{ConnectionState, RealtimeEvent};
use crate::policy::ReconnectPolicy;
use crate::subscription::RealtimeSubscription;
use crate::transport::{RealtimeTransport, WebSocketTransport};

/// Capacity of the command channel to the connection task. Rebuild commands
/// coalesce, so a small queue is enough.
const CMD_CHANNEL_CAPACITY: usize = 64;

/// Connection behavior knobs for the shared realtime connection.
#[derive(Debug, Clone)]
pub struct ConnectionOptions {
    /// Automatically reconnect after abnormal disconnects. Default: `true`.
    pub auto_reconnect: bool,

    /// Timeout for the transport handshake. Zero waits indefinitely.
    /// Default: 10 seconds.
    pub connection_timeout: Duration,

    /// Quiescence window for coalescing register/dispose bursts into one
    /// connection rebuild. Default: 5 milliseconds.
    pub debounce_window: Duration,

    /// Stop reconnecting after this many consecutive failed attempts.
    /// `None` keeps retrying forever. Default: `None`.
    pub max_reconnect_attempts: Option<u32>,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            auto_reconnect: true,
            connection_timeout: Duration::from_secs(10),
            debounce_window: Duration::from_millis(5),
            max_reconnect_attempts: None,
        }
    }
}

impl ConnectionOptions {
    /// Create options with the defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable automatic reconnection.
    pub fn with_auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = enabled;
        self
    }

    /// Set the transport handshake timeout.
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Set the debounce window for coalescing connection rebuilds.
    pub fn with_debounce_window(mut self, window: Duration) -> Self {
        self.debounce_window = window;
        self
    }

    /// Cap the number of consecutive reconnection attempts.
    pub fn with_max_reconnect_attempts(mut self, max: u32) -> Self {
        self.max_reconnect_attempts = Some(max);
        self
    }
}

/// Client for the Pulse realtime API.
///
/// All subscriptions share one connection; registering or disposing a
/// subscription never blocks on the network.
///
/// # Examples
///
/// ```rust,no_run
/// use pulse_link::RealtimeClient;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = RealtimeClient::builder()
///         .endpoint("https://pulse.example.com")
///         .project("my-project")
///         .build()?;
///
///     let subscription = client.subscribe(["orders"], |event| {
///         println!("order event: {}", event.payload);
///     });
///
///     // ... later
///     drop(subscription);
///     client.shutdown().await;
///     Ok(())
/// }
/// ```
pub struct RealtimeClient {
    shared: Arc<Shared>,
    cmd_tx: mpsc::Sender<Cmd>,
    _task: JoinHandle<()>,
}

impl RealtimeClient {
    /// Create a new builder for configuring the client.
    pub fn builder() -> RealtimeClientBuilder {
        RealtimeClientBuilder::new()
    }

    /// Register a subscription for `channels`, delivered through `callback`.
    ///
    /// Returns immediately; the connection (re)build is scheduled behind the
    /// debounce window, so a burst of `subscribe` calls produces a single
    /// connect cycle reflecting the final channel set.
    pub fn subscribe<I, S, F>(&self, channels: I, callback: F) -> RealtimeSubscription
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(RealtimeEvent) + Send + Sync + 'static,
    {
        let set: BTreeSet<String> = channels.into_iter().map(Into::into).collect();
        if set.is_empty() {
            log::warn!("[pulse-link] Subscription registered with no channels; it will never match");
        }

        let id = self
            .shared
            .table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .register(set, Arc::new(callback));
        log::debug!("[pulse-link] Subscription {} registered", id);

        if self.cmd_tx.try_send(Cmd::Rebuild).is_err() {
            // Full queue already carries a pending rebuild; a closed channel
            // means the task is gone and the client is shut down.
            log::debug!("[pulse-link] Rebuild nudge skipped for subscription {}", id);
        }

        RealtimeSubscription::new(id, self.shared.clone(), self.cmd_tx.clone())
    }

    /// Current state of the shared connection.
    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    /// Whether the shared connection is currently established.
    pub fn is_connected(&self) -> bool {
        self.shared.state() == ConnectionState::Connected
    }

    /// Topics currently required by at least one live subscription.
    pub fn active_channels(&self) -> Vec<String> {
        self.shared.channels().iter().map(str::to_owned).collect()
    }

    /// Number of live subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.shared.subscription_count()
    }

    /// Gracefully close the connection and stop the background task.
    pub async fn shutdown(&self) {
        let _ = self.cmd_tx.send(Cmd::Shutdown).await;
    }
}

impl Drop for RealtimeClient {
    fn drop(&mut self) {
        // Best-effort shutdown signal.
        let _ = self.cmd_tx.try_send(Cmd::Shutdown);
    }
}

/// Builder for [`RealtimeClient`] instances.
pub struct RealtimeClientBuilder {
    endpoint: Option<String>,
    project: Option<String>,
    handlers: EventHandlers,
    options: ConnectionOptions,
    transport: Option<Arc<dyn RealtimeTransport>>,
}

impl RealtimeClientBuilder {
    fn new() -> Self {
        Self {
            endpoint: None,
            project: None,
            handlers: EventHandlers::default(),
            options: ConnectionOptions::default(),
            transport: None,
        }
    }

    /// Set the HTTP(S) endpoint of the Pulse server (required).
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the project identifier sent on every connect URL (required).
    pub fn project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    /// Register connection lifecycle hooks.
    pub fn event_handlers(mut self, handlers: EventHandlers) -> Self {
        self.handlers = handlers;
        self
    }

    /// Set connection behavior options.
    pub fn connection_options(mut self, options: ConnectionOptions) -> Self {
        self.options = options;
        self
    }

    /// Replace the default WebSocket transport. Mainly useful for tests.
    pub fn transport(mut self, transport: Arc<dyn RealtimeTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Build the client and spawn its connection task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn build(self) -> Result<RealtimeClient> {
        let endpoint = self
            .endpoint
            .ok_or_else(|| PulseLinkError::ConfigurationError("endpoint is required".into()))?;
        let project = self
            .project
            .ok_or_else(|| PulseLinkError::ConfigurationError("project is required".into()))?;

        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(WebSocketTransport::new(self.options.connection_timeout)));

        let shared = Arc::new(Shared::new());
        let (cmd_tx, cmd_rx) = mpsc::channel(CMD_CHANNEL_CAPACITY);

        let config = ConnectionConfig {
            endpoint,
            project,
            transport,
            policy: ReconnectPolicy,
            options: self.options,
            handlers: self.handlers,
        };

        let task = tokio::spawn(connection_task(shared.clone(), cmd_rx, config));

        Ok(RealtimeClient {
            shared,
            cmd_tx,
            _task: task,
        })
    }
}
