//! `RealtimeSubscription` — disposal handle for a registered subscription.
//!
//! The subscription record itself lives in the client's table; callers only
//! hold this handle. Closing it (or dropping it) removes the record
//! synchronously and nudges the connection task to rebuild or tear down the
//! shared connection.

use std::sync::{Arc, PoisonError};

use tokio::sync::mpsc;

use crate::connection::{Cmd, Shared};

/// Handle to one live subscription.
///
/// `close()` is idempotent; dropping the handle closes it too. Removal from
/// the subscription table happens before `close()` returns, so no event is
/// delivered to the callback afterwards.
pub struct RealtimeSubscription {
    id: u64,
    shared: Arc<Shared>,
    cmd_tx: mpsc::Sender<Cmd>,
    closed: bool,
}

impl RealtimeSubscription {
    pub(crate) fn new(id: u64, shared: Arc<Shared>, cmd_tx: mpsc::Sender<Cmd>) -> Self {
        Self {
            id,
            shared,
            cmd_tx,
            closed: false,
        }
    }

    /// Process-lifetime-unique id of this subscription.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Unregister the subscription.
    ///
    /// Recomputes the channel set from the remaining subscriptions and
    /// schedules a debounced connection rebuild (or teardown, when this was
    /// the last subscription). Safe to call multiple times.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        let removed = self
            .shared
            .table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(self.id);
        if removed {
            log::debug!("[pulse-link] Subscription {} closed", self.id);
            // If the queue is full a rebuild is already pending; it will see
            // the updated table.
            let _ = self.cmd_tx.try_send(Cmd::Rebuild);
        }
    }

    /// Whether `close()` has already run.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for RealtimeSubscription {
    fn drop(&mut self) {
        self.close();
    }
}
