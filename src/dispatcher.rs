//! Inbound frame classification and event fan-out.
//!
//! Consumes the receive loop's frames strictly in receipt order. Events go to
//! every live subscription whose topic set intersects the event's; server
//! error frames are surfaced through the lifecycle hooks and are non-fatal.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Mutex, PoisonError};

use crate::event_handlers::EventHandlers;
use crate::models::{parse_message, RealtimeEvent, RealtimeMessage};
use crate::topics::SubscriptionTable;

pub(crate) struct Dispatcher<'a> {
    table: &'a Mutex<SubscriptionTable>,
    handlers: &'a EventHandlers,
}

impl<'a> Dispatcher<'a> {
    pub(crate) fn new(table: &'a Mutex<SubscriptionTable>, handlers: &'a EventHandlers) -> Self {
        Self { table, handlers }
    }

    /// Process one raw inbound frame.
    pub(crate) fn handle_frame(&self, text: &str) {
        match parse_message(text) {
            Ok(Some(RealtimeMessage::Event(event))) => self.fan_out(event),
            Ok(Some(RealtimeMessage::Error(signal))) => {
                log::warn!("[pulse-link] Server reported error: {}", signal);
                self.handlers.emit_protocol_error(signal);
            },
            Ok(None) => {},
            Err(e) => {
                log::warn!("[pulse-link] Failed to parse inbound frame: {}", e);
            },
        }
    }

    /// Deliver `event` to every matching live subscription.
    ///
    /// A panic inside one callback is contained so the remaining matching
    /// subscriptions still receive the event.
    fn fan_out(&self, event: RealtimeEvent) {
        if event.channels.is_empty() {
            return;
        }

        // Snapshot the matching callbacks under the lock, then invoke outside
        // it so a slow or panicking callback cannot stall registrations.
        let matched = {
            let table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
            // Guards against transient staleness while a rebuild is pending:
            // the live interest set is authoritative, not the socket's.
            if !table.channel_set().intersects(&event.channels) {
                return;
            }
            table.matching(&event.channels)
        };

        for (id, callback) in matched {
            let delivery = event.clone();
            if catch_unwind(AssertUnwindSafe(|| callback(delivery))).is_err() {
                log::error!(
                    "[pulse-link] Callback for subscription {} panicked; continuing dispatch",
                    id
                );
            }
        }
    }
}
