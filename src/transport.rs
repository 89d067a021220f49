//! Transport facade.
//!
//! The public surface of the crate: `connect`, `send_message`,
//! `disconnect` and `poll`, composing the resolver, socket handle, event
//! queue and state machine.
//!
//! # Polling discipline
//!
//! From the consumer's viewpoint the transport is single-threaded
//! cooperative: [`Transport::poll`] is the only point where state mutates
//! and handler callbacks run. Call it at your own cadence (once per frame
//! or tick); the I/O task merely queues notifications in between.
//!
//! # Example
//!
//! ```no_run
//! use ws_transport::{Endpoint, Result, Scheme, Transport, TransportHandler};
//!
//! struct Printer;
//!
//! impl TransportHandler for Printer {
//!     fn on_connected(&mut self) {
//!         println!("connected");
//!     }
//!     fn on_message(&mut self, payload: &[u8]) {
//!         println!("received {} bytes", payload.len());
//!     }
//!     fn on_disconnected(&mut self) {
//!         println!("disconnected");
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
//!     let mut handler = Printer;
//!     loop {
//!         let _ = transport.poll(&mut handler);
//!         tokio::time::sleep(std::time::Duration::from_millis(16)).await;
//!     }
//! }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::endpoint::Endpoint;
use crate::error::{Result, SocketError};
use crate::queue::{Event, EventQueue};
use crate::resolver::{Resolve, SystemResolver, resolve_endpoint};
use crate::socket::SocketHandle;
use crate::state::{ConnectionState, StateMachine};

// ============================================================================
// TransportHandler
// ============================================================================

/// Consumer signal handlers.
///
/// Each method fires only inside [`Transport::poll`], one queued event at a
/// time, in arrival order. Default implementations ignore the signal.
pub trait TransportHandler {
    /// The connection is established; sending is now legal.
    fn on_connected(&mut self) {}

    /// Bytes arrived on the stream.
    fn on_message(&mut self, payload: &[u8]) {
        let _ = payload;
    }

    /// The connection ended, remotely or via explicit disconnect.
    fn on_disconnected(&mut self) {}
}

// ============================================================================
// Transport
// ============================================================================

/// Single-connection polled byte-stream transport.
///
/// One live connection attempt at a time; after a disconnect, a new
/// `connect` starts a fresh lifecycle.
pub struct Transport {
    /// Name lookup collaborator.
    resolver: Box<dyn Resolve>,
    /// Event queue shared with the I/O task.
    queue: Arc<EventQueue>,
    /// Live socket, if an attempt has been issued.
    socket: Option<SocketHandle>,
    /// State machine for the current attempt.
    machine: StateMachine,
}

impl Default for Transport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport {
    /// Creates a transport using the system resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::with_resolver(Box::new(SystemResolver))
    }

    /// Creates a transport with a custom name lookup collaborator.
    #[must_use]
    pub fn with_resolver(resolver: Box<dyn Resolve>) -> Self {
        Self {
            resolver,
            queue: Arc::new(EventQueue::new()),
            socket: None,
            machine: StateMachine::new(),
        }
    }

    /// Returns the current connection state.
    #[inline]
    #[must_use]
    pub const fn state(&self) -> ConnectionState {
        self.machine.state()
    }

    /// Resolves the endpoint, opens the socket and issues the connect.
    ///
    /// Returns as soon as the connect is in flight; the outcome is observed
    /// later through polled events. Resolution may suspend, and resolution
    /// or allocation failures abort the attempt synchronously - no event is
    /// enqueued for them.
    ///
    /// A fresh connect after a disconnect starts a fresh state machine;
    /// undrained events of the previous connection are dropped.
    ///
    /// # Errors
    ///
    /// - [`SocketError::AlreadyActive`] if an attempt is already live
    /// - [`ResolveError`](crate::ResolveError) on resolution failure
    /// - [`SocketError::AllocationFailed`] if the OS denies the socket
    pub async fn connect(&mut self, endpoint: &Endpoint) -> Result<()> {
        if self.machine.state().is_active() {
            warn!(state = %self.machine.state(), "Connect while an attempt is live");
            return Err(SocketError::AlreadyActive.into());
        }

        // Fresh lifecycle: stale events from a previous connection must not
        // poison the new machine.
        let stale = self.queue.drain_all();
        if !stale.is_empty() {
            trace!(count = stale.len(), "Dropped undrained events from previous connection");
        }
        self.machine = StateMachine::new();
        self.socket = None;

        let addr = resolve_endpoint(self.resolver.as_ref(), endpoint).await?;

        let socket = SocketHandle::open(Arc::clone(&self.queue), &addr)?;
        socket.begin_connect(addr)?;

        self.machine.connect_requested();
        self.socket = Some(socket);

        debug!(%endpoint, ip = %addr.ip, "Connect issued");

        Ok(())
    }

    /// Sends a payload on the connected stream.
    ///
    /// Delegates to the socket only while the polled state is Connected;
    /// partial writes are reported via the returned count.
    ///
    /// # Errors
    ///
    /// - [`SocketError::NotConnected`] while not Connected (recoverable;
    ///   the socket's `send` is never reached)
    /// - [`SocketError::WriteFailed`] on a descriptor error
    pub fn send_message(&self, payload: &[u8]) -> Result<usize> {
        if !self.machine.state().is_connected() {
            warn!(state = %self.machine.state(), "Send on non-connected transport");
            return Err(SocketError::NotConnected.into());
        }

        let socket = self.socket.as_ref().ok_or(SocketError::NotConnected)?;
        let written = socket.send(payload)?;

        Ok(written)
    }

    /// Closes the connection.
    ///
    /// Forces the state to Disconnected and enqueues one Disconnected event
    /// so the consumer observes the same lifecycle notification for
    /// self-initiated closes. Idempotent: further calls are silent no-ops,
    /// and late platform callbacks for the closed socket are discarded.
    pub fn disconnect(&mut self) {
        if self.machine.state() == ConnectionState::Disconnected {
            trace!("Disconnect on already-disconnected transport");
            return;
        }

        if let Some(socket) = self.socket.take() {
            socket.close();
        }

        self.machine.force_disconnect();
        self.queue.push(Event::Disconnected);

        debug!("Disconnected");
    }

    /// Drains the event queue and dispatches to the handler.
    ///
    /// Each drained event is applied to the state machine in arrival order;
    /// events the machine deems illegal for the current state are discarded
    /// without a callback. Returns whether any event was drained, so a
    /// caller knows to re-check state or re-render.
    pub fn poll(&mut self, handler: &mut dyn TransportHandler) -> bool {
        let events = self.queue.drain_all();
        let processed = !events.is_empty();

        for event in events {
            if !self.machine.apply(&event) {
                continue;
            }

            match event {
                Event::Connected => handler.on_connected(),
                Event::MessageReceived(payload) => handler.on_message(&payload),
                Event::Disconnected => handler.on_disconnected(),
            }
        }

        processed
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::TcpListener as StdTcpListener;
    use std::time::Duration;

    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;
    use tokio::time::sleep;

    use crate::endpoint::Scheme;
    use crate::error::Error;

    /// Handler that records every signal it receives.
    #[derive(Debug, Default)]
    struct Recording {
        connected: usize,
        messages: Vec<Vec<u8>>,
        disconnected: usize,
    }

    impl Recording {
        fn received_bytes(&self) -> Vec<u8> {
            self.messages.iter().flatten().copied().collect()
        }
    }

    impl TransportHandler for Recording {
        fn on_connected(&mut self) {
            self.connected += 1;
        }
        fn on_message(&mut self, payload: &[u8]) {
            self.messages.push(payload.to_vec());
        }
        fn on_disconnected(&mut self) {
            self.disconnected += 1;
        }
    }

    /// Routes transport tracing through the test harness.
    ///
    /// Filter with e.g. `RUST_LOG=ws_transport=trace cargo test`.
    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    async fn local_listener() -> (TcpListener, Endpoint) {
        init_tracing();
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind listener");
        let port = listener.local_addr().expect("local addr").port();
        let endpoint =
            Endpoint::new(Scheme::Ws, "127.0.0.1", port, "/chat").expect("valid endpoint");
        (listener, endpoint)
    }

    /// Polls until the predicate holds or 5s elapse.
    async fn poll_until(
        transport: &mut Transport,
        handler: &mut Recording,
        pred: impl Fn(&Recording) -> bool,
    ) {
        for _ in 0..500 {
            let _ = transport.poll(handler);
            if pred(handler) {
                return;
            }
            sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached, handler: {handler:?}");
    }

    #[tokio::test]
    async fn test_scenario_connect_and_poll_fires_on_connected_once() {
        let (listener, endpoint) = local_listener().await;

        let mut transport = Transport::new();
        transport.connect(&endpoint).await.expect("connect");
        assert_eq!(transport.state(), ConnectionState::Connecting);

        let _server = listener.accept().await.expect("accept");

        let mut handler = Recording::default();
        poll_until(&mut transport, &mut handler, |h| h.connected == 1).await;

        assert_eq!(transport.state(), ConnectionState::Connected);
        assert_eq!(handler.connected, 1);
        assert_eq!(handler.disconnected, 0);

        // No further events without activity
        assert!(!transport.poll(&mut handler));
        assert_eq!(handler.connected, 1);
    }

    #[tokio::test]
    async fn test_scenario_messages_delivered_in_order() {
        let (listener, endpoint) = local_listener().await;

        let mut transport = Transport::new();
        transport.connect(&endpoint).await.expect("connect");

        let (mut server, _) = listener.accept().await.expect("accept");

        let mut handler = Recording::default();
        poll_until(&mut transport, &mut handler, |h| h.connected == 1).await;

        // TCP may coalesce the chunks; byte order is the guarantee
        server.write_all(&[0x01]).await.expect("write");
        server.flush().await.expect("flush");
        server.write_all(&[0x02, 0x03]).await.expect("write");
        server.flush().await.expect("flush");

        poll_until(&mut transport, &mut handler, |h| {
            h.received_bytes().len() >= 3
        })
        .await;

        assert_eq!(handler.received_bytes(), vec![0x01, 0x02, 0x03]);
        assert_eq!(transport.state(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn test_scenario_send_while_connecting_is_not_connected() {
        let (listener, endpoint) = local_listener().await;

        let mut transport = Transport::new();
        transport.connect(&endpoint).await.expect("connect");

        let _server = listener.accept().await.expect("accept");

        // The open event may already be queued, but state only changes in
        // poll - sending is still illegal.
        sleep(Duration::from_millis(50)).await;
        assert_eq!(transport.state(), ConnectionState::Connecting);

        let result = transport.send_message(b"early");
        assert!(matches!(
            result,
            Err(Error::Socket(SocketError::NotConnected))
        ));
        assert_eq!(transport.state(), ConnectionState::Connecting);

        // The queued open event is intact
        let mut handler = Recording::default();
        poll_until(&mut transport, &mut handler, |h| h.connected == 1).await;
    }

    #[tokio::test]
    async fn test_send_while_idle_is_not_connected() {
        let transport = Transport::new();
        let result = transport.send_message(b"early");
        assert!(matches!(
            result,
            Err(Error::Socket(SocketError::NotConnected))
        ));
    }

    #[tokio::test]
    async fn test_send_after_connected_reaches_peer() {
        let (listener, endpoint) = local_listener().await;

        let mut transport = Transport::new();
        transport.connect(&endpoint).await.expect("connect");

        let (mut server, _) = listener.accept().await.expect("accept");

        let mut handler = Recording::default();
        poll_until(&mut transport, &mut handler, |h| h.connected == 1).await;

        let written = transport.send_message(b"ping").expect("send");
        assert_eq!(written, 4);

        let mut buf = [0u8; 4];
        tokio::io::AsyncReadExt::read_exact(&mut server, &mut buf)
            .await
            .expect("read");
        assert_eq!(&buf, b"ping");
    }

    #[tokio::test]
    async fn test_scenario_explicit_disconnect_single_event() {
        let (listener, endpoint) = local_listener().await;

        let mut transport = Transport::new();
        transport.connect(&endpoint).await.expect("connect");

        let (mut server, _) = listener.accept().await.expect("accept");

        let mut handler = Recording::default();
        poll_until(&mut transport, &mut handler, |h| h.connected == 1).await;

        transport.disconnect();
        assert_eq!(transport.state(), ConnectionState::Disconnected);

        poll_until(&mut transport, &mut handler, |h| h.disconnected == 1).await;

        // Late platform callbacks for the closed handle are discarded
        let _ = server.write_all(&[0xFF]).await;
        drop(server);
        sleep(Duration::from_millis(100)).await;

        assert!(!transport.poll(&mut handler));
        assert_eq!(handler.disconnected, 1);
        assert!(handler.messages.is_empty());
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let (listener, endpoint) = local_listener().await;

        let mut transport = Transport::new();
        transport.connect(&endpoint).await.expect("connect");

        let _server = listener.accept().await.expect("accept");

        let mut handler = Recording::default();
        poll_until(&mut transport, &mut handler, |h| h.connected == 1).await;

        for _ in 0..5 {
            transport.disconnect();
        }

        poll_until(&mut transport, &mut handler, |h| h.disconnected == 1).await;
        sleep(Duration::from_millis(50)).await;
        let _ = transport.poll(&mut handler);

        assert_eq!(handler.disconnected, 1);
    }

    #[tokio::test]
    async fn test_disconnect_while_connecting() {
        let (listener, endpoint) = local_listener().await;

        let mut transport = Transport::new();
        transport.connect(&endpoint).await.expect("connect");

        let _server = listener.accept().await.expect("accept");
        sleep(Duration::from_millis(50)).await;

        // Open event is queued but not polled; disconnect wins
        transport.disconnect();

        let mut handler = Recording::default();
        poll_until(&mut transport, &mut handler, |h| h.disconnected == 1).await;

        assert_eq!(handler.connected, 0, "stale open event must be discarded");
        assert_eq!(transport.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_connect_while_active_fails() {
        let (listener, endpoint) = local_listener().await;

        let mut transport = Transport::new();
        transport.connect(&endpoint).await.expect("connect");

        let _server = listener.accept().await.expect("accept");

        let result = transport.connect(&endpoint).await;
        assert!(matches!(
            result,
            Err(Error::Socket(SocketError::AlreadyActive))
        ));
    }

    #[tokio::test]
    async fn test_reconnect_after_disconnect() {
        let (listener, endpoint) = local_listener().await;

        let mut transport = Transport::new();
        transport.connect(&endpoint).await.expect("connect");
        let _server = listener.accept().await.expect("accept");

        let mut handler = Recording::default();
        poll_until(&mut transport, &mut handler, |h| h.connected == 1).await;

        transport.disconnect();
        poll_until(&mut transport, &mut handler, |h| h.disconnected == 1).await;

        // Fresh lifecycle on the same transport
        transport.connect(&endpoint).await.expect("reconnect");
        let _server2 = listener.accept().await.expect("accept");

        poll_until(&mut transport, &mut handler, |h| h.connected == 2).await;
        assert_eq!(transport.state(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn test_connect_malformed_literal_fails_synchronously() {
        let endpoint =
            Endpoint::new(Scheme::Ws, "999.999.999.999", 80, "/").expect("valid endpoint");

        let mut transport = Transport::new();
        let result = transport.connect(&endpoint).await;

        assert!(result.expect_err("must fail").is_resolve_error());
        assert_eq!(transport.state(), ConnectionState::Idle);

        // No event was enqueued for the aborted attempt
        let mut handler = Recording::default();
        assert!(!transport.poll(&mut handler));
    }

    #[tokio::test]
    async fn test_remote_close_delivers_disconnected() {
        let (listener, endpoint) = local_listener().await;

        let mut transport = Transport::new();
        transport.connect(&endpoint).await.expect("connect");

        let (server, _) = listener.accept().await.expect("accept");

        let mut handler = Recording::default();
        poll_until(&mut transport, &mut handler, |h| h.connected == 1).await;

        drop(server);

        poll_until(&mut transport, &mut handler, |h| h.disconnected == 1).await;
        assert_eq!(transport.state(), ConnectionState::Disconnected);

        // Disconnect after the remote close is a no-op
        transport.disconnect();
        assert!(!transport.poll(&mut handler));
        assert_eq!(handler.disconnected, 1);
    }

    #[tokio::test]
    async fn test_connect_refused_observed_via_poll() {
        // Reserve a port with the std listener, then free it
        let std_listener = StdTcpListener::bind("127.0.0.1:0").expect("bind");
        let port = std_listener.local_addr().expect("local addr").port();
        drop(std_listener);

        let endpoint =
            Endpoint::new(Scheme::Ws, "127.0.0.1", port, "/").expect("valid endpoint");

        let mut transport = Transport::new();
        transport.connect(&endpoint).await.expect("connect issues");
        assert_eq!(transport.state(), ConnectionState::Connecting);

        let mut handler = Recording::default();
        poll_until(&mut transport, &mut handler, |h| h.disconnected == 1).await;

        assert_eq!(handler.connected, 0);
        assert_eq!(transport.state(), ConnectionState::Disconnected);
    }
}
