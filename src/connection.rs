//! Shared realtime connection controller.
//!
//! One background task owns the single WebSocket-style connection for the
//! whole client and serializes every state transition:
//!
//! - register/dispose calls nudge the task over a command channel; the task
//!   coalesces bursts behind a single debounce deadline, so K registrations
//!   inside the window produce exactly one (re)connect reflecting the final
//!   channel set
//! - the interest set is fixed at connect time, so any channel-set change
//!   while connected forces a full close-then-reconnect with a fresh URL
//! - abnormal disconnects (peer close, network failure) schedule an automatic
//!   reconnect using [`ReconnectPolicy`]; deliberate closes never do
//! - the receive loop feeds the [`Dispatcher`] strictly in receipt order

use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant as TokioInstant};

use crate::client::ConnectionOptions;
use crate::dispatcher::Dispatcher;
use crate::error::Result;
use crate::event_handlers::{ConnectionError, DisconnectReason, EventHandlers};
use crate::models::ConnectionState;
use crate::policy::ReconnectPolicy;
use crate::topics::{ChannelSet, SubscriptionTable};
use crate::transport::{MessageStream, RealtimeTransport, CLOSE_POLICY_VIOLATION};
use crate::url::realtime_url;

/// Sleep target for deadlines that are currently inactive.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 3600);

/// Commands from the public API to the connection task.
pub(crate) enum Cmd {
    /// The channel set changed; schedule-or-reset the coalescing rebuild
    /// timer.
    Rebuild,
    /// Tear everything down and exit the task.
    Shutdown,
}

/// State shared between the public handles and the connection task.
///
/// The subscription table is mutated directly by `subscribe`/`close` on the
/// caller's task (never blocking on the network); the connection task reads
/// it when rebuilding and dispatching.
pub(crate) struct Shared {
    pub(crate) table: Mutex<SubscriptionTable>,
    state: AtomicU8,
    attempts: AtomicU32,
}

impl Shared {
    pub(crate) fn new() -> Self {
        Self {
            table: Mutex::new(SubscriptionTable::new()),
            state: AtomicU8::new(ConnectionState::Disconnected.as_u8()),
            attempts: AtomicU32::new(0),
        }
    }

    pub(crate) fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::SeqCst))
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.store(state.as_u8(), Ordering::SeqCst);
    }

    /// Snapshot of the current channel set.
    pub(crate) fn channels(&self) -> ChannelSet {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .channel_set()
            .clone()
    }

    pub(crate) fn subscription_count(&self) -> usize {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Immutable configuration handed to the connection task.
pub(crate) struct ConnectionConfig {
    pub(crate) endpoint: String,
    pub(crate) project: String,
    pub(crate) transport: Arc<dyn RealtimeTransport>,
    pub(crate) policy: ReconnectPolicy,
    pub(crate) options: ConnectionOptions,
    pub(crate) handlers: EventHandlers,
}

/// Read the next frame, or park forever while no stream exists.
async fn read_next(stream: &mut Option<Box<dyn MessageStream>>) -> Option<Result<String>> {
    match stream {
        Some(s) => s.next_message().await,
        None => std::future::pending().await,
    }
}

/// The background task owning the shared connection.
pub(crate) async fn connection_task(
    shared: Arc<Shared>,
    mut cmd_rx: mpsc::Receiver<Cmd>,
    config: ConnectionConfig,
) {
    let mut stream: Option<Box<dyn MessageStream>> = None;
    // Coalescing timer for debounced rebuilds; reset by every Rebuild command.
    let mut rebuild_at: Option<TokioInstant> = None;
    // Backoff deadline for automatic reconnection after abnormal disconnects.
    let mut retry_at: Option<TokioInstant> = None;

    loop {
        let rebuild_sleep =
            sleep_until(rebuild_at.unwrap_or_else(|| TokioInstant::now() + FAR_FUTURE));
        tokio::pin!(rebuild_sleep);
        let retry_sleep =
            sleep_until(retry_at.unwrap_or_else(|| TokioInstant::now() + FAR_FUTURE));
        tokio::pin!(retry_sleep);

        tokio::select! {
            biased;

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(Cmd::Rebuild) => {
                        rebuild_at =
                            Some(TokioInstant::now() + config.options.debounce_window);
                    },
                    Some(Cmd::Shutdown) | None => {
                        shutdown(&shared, &config, &mut stream).await;
                        return;
                    },
                }
            }

            _ = &mut rebuild_sleep, if rebuild_at.is_some() => {
                rebuild_at = None;
                // The cycle below reflects the freshest channel set, so any
                // pending backoff retry is superseded.
                retry_at = None;
                connect_cycle(&shared, &config, &mut stream, &mut retry_at).await;
            }

            _ = &mut retry_sleep, if retry_at.is_some() => {
                retry_at = None;
                connect_cycle(&shared, &config, &mut stream, &mut retry_at).await;
            }

            frame = read_next(&mut stream) => {
                match frame {
                    Some(Ok(text)) => {
                        Dispatcher::new(&shared.table, &config.handlers)
                            .handle_frame(&text);
                    },
                    Some(Err(e)) => {
                        let msg = e.to_string();
                        config.handlers.emit_error(ConnectionError::new(&msg, true));
                        config.handlers.emit_disconnect(
                            DisconnectReason::new(format!("Transport error: {}", msg)),
                        );
                        stream = None;
                        shared.set_state(ConnectionState::Disconnected);
                        schedule_retry(&shared, &config, &mut retry_at);
                    },
                    None => {
                        config.handlers.emit_disconnect(
                            DisconnectReason::new("Connection closed by server"),
                        );
                        stream = None;
                        shared.set_state(ConnectionState::Disconnected);
                        schedule_retry(&shared, &config, &mut retry_at);
                    },
                }
            }
        }
    }
}

/// One full (re)connect cycle: deliberately close any current stream, then
/// open a new one reflecting the current channel set — or stay down when the
/// set is empty.
async fn connect_cycle(
    shared: &Shared,
    config: &ConnectionConfig,
    stream: &mut Option<Box<dyn MessageStream>>,
    retry_at: &mut Option<TokioInstant>,
) {
    if let Some(mut old) = stream.take() {
        shared.set_state(ConnectionState::Closing);
        old.close(CLOSE_POLICY_VIOLATION).await;
    }
    shared.set_state(ConnectionState::Disconnected);

    let channels = shared.channels();
    if channels.is_empty() {
        log::debug!("[pulse-link] No live subscriptions; connection stays closed");
        *retry_at = None;
        return;
    }

    let url = match realtime_url(&config.endpoint, &config.project, &channels) {
        Ok(url) => url,
        Err(e) => {
            log::error!("[pulse-link] Cannot build realtime URL: {}", e);
            config
                .handlers
                .emit_error(ConnectionError::new(e.to_string(), false));
            return;
        },
    };

    shared.set_state(ConnectionState::Connecting);
    match config.transport.open(&url).await {
        Ok(new_stream) => {
            *stream = Some(new_stream);
            shared.set_state(ConnectionState::Connected);
            shared.attempts.store(0, Ordering::SeqCst);
            config.handlers.emit_connect();
            log::info!(
                "[pulse-link] Realtime connected ({} channel(s))",
                channels.len()
            );
        },
        Err(e) => {
            shared.set_state(ConnectionState::Disconnected);
            config
                .handlers
                .emit_error(ConnectionError::new(format!("Connection failed: {}", e), true));
            schedule_retry(shared, config, retry_at);
        },
    }
}

/// Arm the backoff deadline after an abnormal disconnect or a failed connect
/// attempt. No-op when reconnection is disabled, the channel set has emptied,
/// or the attempt cap is exhausted.
fn schedule_retry(
    shared: &Shared,
    config: &ConnectionConfig,
    retry_at: &mut Option<TokioInstant>,
) {
    if !config.options.auto_reconnect {
        return;
    }
    if shared.channels().is_empty() {
        return;
    }

    let attempts = shared.attempts.load(Ordering::SeqCst);
    if let Some(max) = config.options.max_reconnect_attempts {
        if attempts >= max {
            log::warn!("[pulse-link] Max reconnection attempts ({}) reached", max);
            config.handlers.emit_error(ConnectionError::new(
                format!("Max reconnection attempts ({}) reached", max),
                false,
            ));
            return;
        }
    }

    let delay = config.policy.delay(attempts);
    shared.attempts.store(attempts + 1, Ordering::SeqCst);
    log::info!(
        "[pulse-link] Realtime disconnected. Reconnecting in {:?} (attempt {})",
        delay,
        attempts + 1
    );
    *retry_at = Some(TokioInstant::now() + delay);
}

/// Deliberate teardown: close the stream with the client close code and exit
/// without consulting the reconnect policy.
async fn shutdown(
    shared: &Shared,
    config: &ConnectionConfig,
    stream: &mut Option<Box<dyn MessageStream>>,
) {
    if let Some(mut s) = stream.take() {
        shared.set_state(ConnectionState::Closing);
        s.close(CLOSE_POLICY_VIOLATION).await;
        config.handlers.emit_disconnect(DisconnectReason::with_code(
            "Client disconnected",
            CLOSE_POLICY_VIOLATION,
        ));
    }
    shared.set_state(ConnectionState::Disconnected);
    log::debug!("[pulse-link] Connection task stopped");
}
