//! Shared test fixtures: a scripted in-memory transport that stands in for
//! the WebSocket layer, so the connection controller can be driven
//! deterministically under a paused tokio clock.

#![allow(dead_code)]

use async_trait::async_trait;
use pulse_link::{MessageStream, PulseLinkError, RealtimeTransport, Result};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::time::Instant;

/// What a scripted stream yields to the receive loop.
enum StreamItem {
    Frame(String),
    Error(String),
    /// Peer-initiated close (abnormal from the client's point of view).
    End,
}

/// Record of one `open()` call, accepted or refused.
#[derive(Debug, Clone)]
pub struct OpenRecord {
    pub url: String,
    pub at: Instant,
}

/// Test-side handle to an accepted stream: injects frames, failures, or a
/// peer close.
#[derive(Clone)]
pub struct StreamHandle {
    tx: mpsc::UnboundedSender<StreamItem>,
}

impl StreamHandle {
    pub fn send_raw(&self, frame: impl Into<String>) {
        let _ = self.tx.send(StreamItem::Frame(frame.into()));
    }

    /// Inject an event frame on the given channels.
    pub fn send_event(&self, channels: &[&str], payload: serde_json::Value) {
        let data = serde_json::json!({
            "events": [],
            "channels": channels,
            "timestamp": "2024-01-01T00:00:00.000Z",
            "payload": payload,
        });
        self.send_raw(
            serde_json::json!({"type": "event", "data": data}).to_string(),
        );
    }

    /// Inject a server error frame.
    pub fn send_error(&self, code: i64, message: &str) {
        self.send_raw(
            serde_json::json!({
                "type": "error",
                "data": {"code": code, "message": message},
            })
            .to_string(),
        );
    }

    /// Simulate a transport failure.
    pub fn fail(&self, message: &str) {
        let _ = self.tx.send(StreamItem::Error(message.to_string()));
    }

    /// Simulate the peer closing the connection.
    pub fn end(&self) {
        let _ = self.tx.send(StreamItem::End);
    }
}

/// Scripted [`RealtimeTransport`]. Every `open()` call is recorded; attempts
/// are refused while the refusal script is non-empty, otherwise accepted with
/// a fresh controllable stream.
pub struct MockTransport {
    refusals: Mutex<VecDeque<()>>,
    opens: Mutex<Vec<OpenRecord>>,
    handles: Mutex<Vec<StreamHandle>>,
    close_codes: Arc<Mutex<Vec<u16>>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            refusals: Mutex::new(VecDeque::new()),
            opens: Mutex::new(Vec::new()),
            handles: Mutex::new(Vec::new()),
            close_codes: Arc::new(Mutex::new(Vec::new())),
        })
    }

    /// Refuse the next `n` handshake attempts.
    pub fn refuse_next(&self, n: usize) {
        let mut refusals = self.refusals.lock().unwrap();
        for _ in 0..n {
            refusals.push_back(());
        }
    }

    /// All `open()` calls so far, including refused ones.
    pub fn opens(&self) -> Vec<OpenRecord> {
        self.opens.lock().unwrap().clone()
    }

    pub fn open_count(&self) -> usize {
        self.opens.lock().unwrap().len()
    }

    pub fn last_url(&self) -> Option<String> {
        self.opens.lock().unwrap().last().map(|r| r.url.clone())
    }

    /// Handle to the `idx`-th accepted stream.
    pub fn handle(&self, idx: usize) -> StreamHandle {
        self.handles.lock().unwrap()[idx].clone()
    }

    /// Close codes the client sent on deliberate teardown.
    pub fn close_codes(&self) -> Vec<u16> {
        self.close_codes.lock().unwrap().clone()
    }
}

#[async_trait]
impl RealtimeTransport for MockTransport {
    async fn open(&self, url: &str) -> Result<Box<dyn MessageStream>> {
        self.opens.lock().unwrap().push(OpenRecord {
            url: url.to_string(),
            at: Instant::now(),
        });

        if self.refusals.lock().unwrap().pop_front().is_some() {
            return Err(PulseLinkError::WebSocketError(
                "scripted handshake refusal".to_string(),
            ));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        self.handles.lock().unwrap().push(StreamHandle { tx });
        Ok(Box::new(MockStream {
            rx,
            close_codes: self.close_codes.clone(),
        }))
    }
}

struct MockStream {
    rx: mpsc::UnboundedReceiver<StreamItem>,
    close_codes: Arc<Mutex<Vec<u16>>>,
}

#[async_trait]
impl MessageStream for MockStream {
    async fn next_message(&mut self) -> Option<Result<String>> {
        match self.rx.recv().await {
            Some(StreamItem::Frame(text)) => Some(Ok(text)),
            Some(StreamItem::Error(message)) => {
                Some(Err(PulseLinkError::WebSocketError(message)))
            },
            Some(StreamItem::End) | None => None,
        }
    }

    async fn close(&mut self, code: u16) {
        self.close_codes.lock().unwrap().push(code);
        self.rx.close();
    }
}
