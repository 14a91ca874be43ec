//! Reconnect backoff policy.

use std::time::Duration;

/// Pure mapping from reconnect attempt count to backoff delay.
///
/// Used only after abnormal disconnects; a deliberate close never consults
/// the policy. The attempt counter resets to zero on every successful
/// connection, so the delay ladder restarts after any recovery.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReconnectPolicy;

impl ReconnectPolicy {
    /// Delay before reconnect attempt number `attempts` (zero-based).
    pub fn delay(&self, attempts: u32) -> Duration {
        match attempts {
            0..=4 => Duration::from_secs(1),
            5..=14 => Duration::from_secs(5),
            15..=99 => Duration::from_secs(10),
            _ => Duration::from_secs(60),
        }
    }
}
