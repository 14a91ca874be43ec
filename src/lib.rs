//! # pulse-link: Pulse realtime client library
//!
//! Client library for the Pulse backend's realtime API. An arbitrary number
//! of topic subscriptions is multiplexed over a single WebSocket connection:
//!
//! - **Single shared connection**: one socket regardless of how many
//!   subscriptions exist; the connect URL carries the union of all topics
//! - **Coalesced rebuilds**: bursts of subscribe/unsubscribe calls trigger
//!   exactly one connection rebuild reflecting the final topic set
//! - **Automatic reconnection**: abnormal disconnects retry with a tiered
//!   backoff; deliberate closes never reconnect
//! - **Isolated delivery**: each subscription gets its own callback; a
//!   panicking callback never starves the others
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use pulse_link::RealtimeClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = RealtimeClient::builder()
//!         .endpoint("https://pulse.example.com")
//!         .project("my-project")
//!         .build()?;
//!
//!     let orders = client.subscribe(["orders"], |event| {
//!         println!("orders event: {}", event.payload);
//!     });
//!     let inventory = client.subscribe(["inventory", "orders"], |event| {
//!         println!("inventory event on {:?}", event.channels);
//!     });
//!
//!     tokio::time::sleep(std::time::Duration::from_secs(60)).await;
//!
//!     drop(orders);
//!     drop(inventory);
//!     client.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Lifecycle hooks
//!
//! ```rust,no_run
//! use pulse_link::{EventHandlers, RealtimeClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let handlers = EventHandlers::new()
//!     .on_connect(|| println!("connected"))
//!     .on_disconnect(|reason| println!("disconnected: {}", reason))
//!     .on_protocol_error(|signal| eprintln!("server error: {}", signal));
//!
//! let client = RealtimeClient::builder()
//!     .endpoint("https://pulse.example.com")
//!     .project("my-project")
//!     .event_handlers(handlers)
//!     .build()?;
//! # Ok(())
//! # }
//! ```

pub mod client;
mod connection;
mod dispatcher;
pub mod error;
pub mod event_handlers;
pub mod executor;
pub mod models;
pub mod policy;
pub mod subscription;
pub mod topics;
pub mod transport;
mod url;

pub use client::{ConnectionOptions, RealtimeClient, RealtimeClientBuilder};
pub use error::{PulseLinkError, Result};
pub use event_handlers::{ConnectionError, DisconnectReason, EventHandlers};
pub use executor::{HttpExecutor, RequestExecutor};
pub use models::{ConnectionState, ErrorSignal, RealtimeEvent};
pub use policy::ReconnectPolicy;
pub use subscription::RealtimeSubscription;
pub use topics::ChannelSet;
pub use transport::{MessageStream, RealtimeTransport, WebSocketTransport};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
