//! Polled, non-blocking byte-stream transport for WebSocket endpoints.
//!
//! This library drives a single raw TCP connection to a `ws://` / `wss://`
//! endpoint entirely through asynchronous events, and exposes those events
//! to a consumer through a single-threaded polling interface. It is the
//! byte-stream *underlay* for a WebSocket stack: framing, masking, the
//! handshake and TLS all belong to the layer above.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────┐  connect / send   ┌──────────────┐      TCP
//! │  Consumer      │──────────────────►│  Transport   │◄──────────────► peer
//! │  (game loop,   │                   │  + I/O task  │
//! │   own cadence) │◄──────────────────│  EventQueue  │
//! └────────────────┘   poll() drains   └──────────────┘
//! ```
//!
//! Key design principles:
//!
//! - Platform callbacks never run consumer code: the I/O task only queues
//!   events; [`Transport::poll`] drains them on the consumer's thread
//! - All descriptor I/O is non-blocking by construction; only name
//!   resolution may suspend, and it runs before the socket exists
//! - One connection per transport; a fresh `connect` starts a fresh
//!   lifecycle after a disconnect
//!
//! # Quick Start
//!
//! ```no_run
//! use ws_transport::{Endpoint, Result, Scheme, Transport, TransportHandler};
//!
//! #[derive(Default)]
//! struct Chat {
//!     open: bool,
//! }
//!
//! impl TransportHandler for Chat {
//!     fn on_connected(&mut self) {
//!         self.open = true;
//!     }
//!     fn on_message(&mut self, payload: &[u8]) {
//!         println!("{} bytes", payload.len());
//!     }
//!     fn on_disconnected(&mut self) {
//!         self.open = false;
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let endpoint = Endpoint::new(Scheme::Ws, "203.0.113.5", 8080, "/chat")?;
//!
//!     let mut transport = Transport::new();
//!     transport.connect(&endpoint).await?;
//!
//!     let mut chat = Chat::default();
//!     while transport.state() != ws_transport::ConnectionState::Disconnected {
//!         if transport.poll(&mut chat) && chat.open {
//!             transport.send_message(b"hello")?;
//!         }
//!         tokio::time::sleep(std::time::Duration::from_millis(16)).await;
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`endpoint`] | [`Endpoint`] and [`Scheme`] value types |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`queue`] | [`Event`] and the callback [`EventQueue`] |
//! | [`resolver`] | [`Resolve`] collaborator and literal fast path |
//! | [`socket`] | Non-blocking [`SocketHandle`] and its I/O task |
//! | [`state`] | [`ConnectionState`] machine |
//! | [`transport`] | [`Transport`] facade and [`TransportHandler`] |

// ============================================================================
// Modules
// ============================================================================

/// Remote endpoint description.
///
/// Structured scheme/host/port/path with construction-time validation.
pub mod endpoint;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Event callback queue.
///
/// FIFO boundary between the I/O task and the polling consumer.
pub mod queue;

/// Endpoint resolution.
///
/// Literal fast path plus the [`Resolve`] name lookup collaborator.
pub mod resolver;

/// Socket handle and I/O task.
///
/// Owns the descriptor; every read and write is non-blocking.
pub mod socket;

/// Connection state machine.
///
/// Idle / Connecting / Connected / Disconnected, with delivery gating.
pub mod state;

/// Transport facade.
///
/// `connect`, `send_message`, `disconnect` and `poll`.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Endpoint types
pub use endpoint::{Endpoint, Scheme};

// Error types
pub use error::{Error, ResolveError, Result, SocketError};

// Event types
pub use queue::{Event, EventQueue};

// Resolver types
pub use resolver::{Resolve, ResolvedAddress, SystemResolver};

// Socket types
pub use socket::SocketHandle;

// State types
pub use state::{ConnectionState, StateMachine};

// Transport types
pub use transport::{Transport, TransportHandler};
