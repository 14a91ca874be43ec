//! Data models for the realtime wire protocol and connection lifecycle.

mod connection_state;
mod event;
mod wire;

pub use connection_state::ConnectionState;
pub use event::{ErrorSignal, RealtimeEvent};
pub use wire::{parse_message, RealtimeMessage};
