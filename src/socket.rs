//! Socket handle and I/O task.
//!
//! A [`SocketHandle`] owns exactly one OS stream socket for its lifetime.
//! tokio creates the descriptor non-blocking and registers it with the
//! runtime reactor before any I/O, so every read and write below is
//! guaranteed not to block.
//!
//! # I/O Task
//!
//! `begin_connect` spawns a task that plays the role of the platform's
//! async notification mechanism:
//!
//! - connect completion pushes `Connected` (or `Disconnected` on failure)
//! - readable wakeups drain the stream and push `MessageReceived`
//! - peer close or a read error pushes `Disconnected` and ends the task
//!
//! The task never touches anything but the event queue and the liveness
//! flag; all consumer-visible effects happen later, inside `poll`.
//!
//! # Cancellation
//!
//! `close` flips the liveness flag and wakes the task. Late callbacks for
//! a closed handle are checked against the flag before enqueueing, so a
//! read that races with teardown is discarded instead of delivered.

// ============================================================================
// Imports
// ============================================================================

use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::net::{TcpSocket, TcpStream};
use tokio::sync::Notify;
use tracing::{debug, trace, warn};

use crate::error::SocketError;
use crate::queue::{Event, EventQueue};
use crate::resolver::ResolvedAddress;

// ============================================================================
// Constants
// ============================================================================

/// Read buffer size for one `try_read` call.
const RECV_CHUNK: usize = 4096;

// ============================================================================
// ReadOutcome
// ============================================================================

/// Result of draining all currently available bytes from the stream.
enum ReadOutcome {
    /// Bytes were available.
    Data(Vec<u8>),
    /// Readiness was spurious; nothing to read yet.
    WouldBlock,
    /// Orderly peer shutdown or a read error.
    Closed,
}

// ============================================================================
// SocketShared
// ============================================================================

/// State shared between the handle and its I/O task.
struct SocketShared {
    /// Destination for produced events.
    queue: Arc<EventQueue>,
    /// Connected stream, set by the I/O task once connect completes.
    stream: Mutex<Option<Arc<TcpStream>>>,
    /// Liveness flag; cleared by `close`, checked before every enqueue.
    alive: AtomicBool,
    /// Wakes the I/O task on close.
    shutdown: Notify,
}

impl SocketShared {
    /// Enqueues an event unless the handle has been closed.
    fn push(&self, event: Event) {
        if self.alive.load(Ordering::SeqCst) {
            self.queue.push(event);
        } else {
            trace!(?event, "Discarding event for closed socket");
        }
    }
}

// ============================================================================
// SocketHandle
// ============================================================================

/// Owner of one non-blocking stream socket.
///
/// Created by `open`, torn down by `close` (idempotent) or drop. The
/// descriptor itself is released exactly once, when the last owner of the
/// connected stream drops it.
pub struct SocketHandle {
    /// State shared with the I/O task.
    shared: Arc<SocketShared>,
    /// Allocated socket awaiting `begin_connect`.
    pending: Mutex<Option<TcpSocket>>,
}

impl SocketHandle {
    /// Allocates a stream socket for the given address family.
    ///
    /// The socket is non-blocking from creation; no I/O happens before
    /// `begin_connect`.
    ///
    /// # Errors
    ///
    /// Returns [`SocketError::AllocationFailed`] if the OS denies the
    /// resource.
    pub fn open(queue: Arc<EventQueue>, addr: &ResolvedAddress) -> Result<Self, SocketError> {
        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()
        } else {
            TcpSocket::new_v6()
        }
        .map_err(SocketError::allocation_failed)?;

        trace!(ip = %addr.ip, "Socket allocated");

        Ok(Self {
            shared: Arc::new(SocketShared {
                queue,
                stream: Mutex::new(None),
                alive: AtomicBool::new(true),
                shutdown: Notify::new(),
            }),
            pending: Mutex::new(Some(socket)),
        })
    }

    /// Issues a non-blocking connect and spawns the I/O task.
    ///
    /// Returns immediately; an in-progress connect is the expected path,
    /// never an error. The outcome arrives later as a `Connected` or
    /// `Disconnected` event.
    ///
    /// # Errors
    ///
    /// Returns [`SocketError::ConnectFailed`] if the connect was already
    /// issued for this handle.
    pub fn begin_connect(&self, addr: ResolvedAddress) -> Result<(), SocketError> {
        let socket = self
            .pending
            .lock()
            .take()
            .ok_or_else(|| {
                SocketError::connect_failed(std::io::Error::other("connect already issued"))
            })?;

        let shared = Arc::clone(&self.shared);
        tokio::spawn(Self::run_io_task(socket, addr.socket_addr(), shared));

        Ok(())
    }

    /// Writes as many bytes as the OS accepts without blocking.
    ///
    /// Partial writes are legal and reported via the returned count; a
    /// count of zero means the send buffer is full right now.
    ///
    /// # Errors
    ///
    /// - [`SocketError::NotConnected`] if the stream is not established
    /// - [`SocketError::WriteFailed`] on a descriptor error
    pub fn send(&self, bytes: &[u8]) -> Result<usize, SocketError> {
        let stream = self
            .shared
            .stream
            .lock()
            .clone()
            .ok_or(SocketError::NotConnected)?;

        let mut written = 0;
        while written < bytes.len() {
            match stream.try_write(&bytes[written..]) {
                Ok(0) => break,
                Ok(n) => written += n,
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => {
                    warn!(error = %e, "Write failed");
                    return Err(SocketError::write_failed(e));
                }
            }
        }

        if written < bytes.len() {
            trace!(written, total = bytes.len(), "Partial write");
        }

        Ok(written)
    }

    /// Drains all currently available bytes via repeated non-blocking reads.
    ///
    /// An empty result is not an error: it means no data is available right
    /// now (or the stream is not established). The I/O task uses the same
    /// drain primitive; calling this directly is only useful for handles
    /// driven without a task.
    #[must_use]
    pub fn receive_available(&self) -> Vec<u8> {
        let Some(stream) = self.shared.stream.lock().clone() else {
            return Vec::new();
        };

        match Self::drain_stream(&stream) {
            ReadOutcome::Data(payload) => payload,
            ReadOutcome::WouldBlock | ReadOutcome::Closed => Vec::new(),
        }
    }

    /// Releases the socket; safe to call multiple times.
    ///
    /// After close, no further events are enqueued for this handle and the
    /// I/O task exits. The second call is a no-op.
    pub fn close(&self) {
        if self.shared.alive.swap(false, Ordering::SeqCst) {
            debug!("Socket closed");
            self.shared.shutdown.notify_one();
            *self.shared.stream.lock() = None;
            *self.pending.lock() = None;
        } else {
            trace!("Close on already-closed socket");
        }
    }

    /// Returns `true` until `close` has been called.
    #[inline]
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.shared.alive.load(Ordering::SeqCst)
    }

    // ------------------------------------------------------------------------
    // I/O task
    // ------------------------------------------------------------------------

    /// Connects and pumps the stream until close or error.
    async fn run_io_task(socket: TcpSocket, addr: SocketAddr, shared: Arc<SocketShared>) {
        let stream = match socket.connect(addr).await {
            Ok(stream) => stream,
            Err(e) => {
                debug!(%addr, error = %e, "Connect failed");
                shared.push(Event::Disconnected);
                return;
            }
        };

        if !shared.alive.load(Ordering::SeqCst) {
            trace!(%addr, "Connect completed after close, dropping stream");
            return;
        }

        debug!(%addr, "Stream connected");

        let stream = Arc::new(stream);
        *shared.stream.lock() = Some(Arc::clone(&stream));
        shared.push(Event::Connected);

        loop {
            tokio::select! {
                _ = shared.shutdown.notified() => {
                    trace!("I/O task woken for shutdown");
                    break;
                }

                ready = stream.readable() => {
                    if let Err(e) = ready {
                        debug!(error = %e, "Readiness error");
                        shared.push(Event::Disconnected);
                        break;
                    }

                    match Self::drain_stream(&stream) {
                        ReadOutcome::Data(payload) => {
                            trace!(len = payload.len(), "Payload received");
                            shared.push(Event::MessageReceived(payload));
                        }
                        ReadOutcome::WouldBlock => {}
                        ReadOutcome::Closed => {
                            debug!("Stream closed by peer");
                            shared.push(Event::Disconnected);
                            break;
                        }
                    }
                }
            }
        }

        debug!("I/O task terminated");
    }

    /// Reads until the OS reports no more data.
    ///
    /// A zero-length read with nothing accumulated is loop termination
    /// (peer shutdown), not a deliverable event.
    fn drain_stream(stream: &TcpStream) -> ReadOutcome {
        let mut payload = Vec::new();
        let mut buf = [0u8; RECV_CHUNK];

        loop {
            match stream.try_read(&mut buf) {
                Ok(0) => {
                    return if payload.is_empty() {
                        ReadOutcome::Closed
                    } else {
                        // Deliver what we have; the close surfaces on the
                        // next readiness wakeup.
                        ReadOutcome::Data(payload)
                    };
                }

                Ok(n) => payload.extend_from_slice(&buf[..n]),

                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    return if payload.is_empty() {
                        ReadOutcome::WouldBlock
                    } else {
                        ReadOutcome::Data(payload)
                    };
                }

                Err(e) => {
                    debug!(error = %e, "Read error");
                    return if payload.is_empty() {
                        ReadOutcome::Closed
                    } else {
                        ReadOutcome::Data(payload)
                    };
                }
            }
        }
    }
}

impl Drop for SocketHandle {
    fn drop(&mut self) {
        self.close();
    }
}

// ============================================================================
// Tests
// ============================================================================
