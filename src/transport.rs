//! Streaming transport seam.
//!
//! The connection controller only needs "open a URL, read text frames, close
//! with a code" — expressed here as the [`RealtimeTransport`] and
//! [`MessageStream`] traits so tests can substitute a scripted transport.
//! [`WebSocketTransport`] is the production implementation over
//! `tokio-tungstenite`.
//!
//! Self-initiated closure is never observed through a stream: the controller
//! drops a stream it closed itself, so `None` / `Err` from
//! [`MessageStream::next_message`] always means peer-initiated closure or a
//! network failure.

use async_trait::async_trait;
use futures_util::StreamExt;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async,
    tungstenite::protocol::{frame::coding::CloseCode, CloseFrame, Message},
    MaybeTlsStream, WebSocketStream,
};

use crate::error::{PulseLinkError, Result};

/// Close code sent on deliberate teardown (RFC 6455 policy violation), as the
/// realtime server expects for client-initiated rebuilds.
pub const CLOSE_POLICY_VIOLATION: u16 = 1008;

/// Maximum accepted text frame size (64 MiB). Larger frames are dropped.
const MAX_TEXT_MESSAGE_BYTES: usize = 64 << 20;

/// An open bidirectional message stream.
#[async_trait]
pub trait MessageStream: Send {
    /// Next inbound text frame.
    ///
    /// - `Some(Ok(frame))`: a complete text payload
    /// - `Some(Err(_))`: transport failure; the stream is dead
    /// - `None`: the peer closed the stream
    async fn next_message(&mut self) -> Option<Result<String>>;

    /// Close the stream with the given close code. Best-effort; errors on an
    /// already-dead stream are swallowed.
    async fn close(&mut self, code: u16);
}

/// Capability to open a [`MessageStream`] to a realtime endpoint.
#[async_trait]
pub trait RealtimeTransport: Send + Sync {
    /// Open a stream to `url`, completing the handshake before returning.
    async fn open(&self, url: &str) -> Result<Box<dyn MessageStream>>;
}

/// Production transport over `tokio-tungstenite`.
pub struct WebSocketTransport {
    connect_timeout: Duration,
}

impl WebSocketTransport {
    /// Create a transport with the given handshake timeout.
    /// A zero timeout waits indefinitely.
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

#[async_trait]
impl RealtimeTransport for WebSocketTransport {
    async fn open(&self, url: &str) -> Result<Box<dyn MessageStream>> {
        log::debug!("[pulse-link] Opening WebSocket connection to {}", url);

        let connect = connect_async(url);
        let (stream, _response) = if self.connect_timeout.is_zero() {
            connect
                .await
                .map_err(|e| PulseLinkError::WebSocketError(format!("Connection failed: {}", e)))?
        } else {
            tokio::time::timeout(self.connect_timeout, connect)
                .await
                .map_err(|_| {
                    PulseLinkError::TimeoutError(format!(
                        "Connection timeout ({:?})",
                        self.connect_timeout
                    ))
                })?
                .map_err(|e| PulseLinkError::WebSocketError(format!("Connection failed: {}", e)))?
        };

        Ok(Box::new(WsMessageStream { inner: stream }))
    }
}

struct WsMessageStream {
    inner: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl MessageStream for WsMessageStream {
    async fn next_message(&mut self) -> Option<Result<String>> {
        loop {
            match self.inner.next().await? {
                Ok(Message::Text(text)) => {
                    if text.len() > MAX_TEXT_MESSAGE_BYTES {
                        log::warn!("[pulse-link] Dropping oversized frame ({} bytes)", text.len());
                        continue;
                    }
                    return Some(Ok(text.as_str().to_owned()));
                },
                Ok(Message::Binary(data)) => match String::from_utf8(data.to_vec()) {
                    Ok(text) => return Some(Ok(text)),
                    Err(e) => {
                        return Some(Err(PulseLinkError::WebSocketError(format!(
                            "Non-UTF8 binary frame: {}",
                            e
                        ))));
                    },
                },
                // tungstenite queues the Pong reply internally.
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) | Ok(Message::Frame(_)) => continue,
                Ok(Message::Close(_)) => return None,
                Err(e) => return Some(Err(PulseLinkError::WebSocketError(e.to_string()))),
            }
        }
    }

    async fn close(&mut self, code: u16) {
        let frame = CloseFrame {
            code: CloseCode::from(code),
            reason: "".into(),
        };
        if let Err(e) = self.inner.close(Some(frame)).await {
            log::debug!("[pulse-link] Close on dead stream: {}", e);
        }
    }
}
