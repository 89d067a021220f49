//! Event callback queue.
//!
//! Platform callbacks fire on the I/O task, a context the consumer does not
//! control. Instead of invoking consumer code from there, every notification
//! is appended to this queue and drained exactly once per `poll` cycle on
//! the consumer's own thread. The queue is the only synchronization boundary
//! between the two sides.
//!
//! # Ordering
//!
//! FIFO in arrival order, across all event kinds: a `Disconnected` pushed
//! after a `MessageReceived` is delivered after it. Draining is atomic with
//! respect to concurrent pushes - no event is observed twice, none is lost.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;

use parking_lot::Mutex;

// ============================================================================
// Event
// ============================================================================

/// A pending notification produced by the I/O task.
///
/// Events are owned values with no external references; once enqueued they
/// belong solely to the queue until drained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The connect attempt completed.
    Connected,
    /// Bytes arrived on the stream.
    MessageReceived(Vec<u8>),
    /// The connection ended, remotely or via explicit disconnect.
    Disconnected,
}

// ============================================================================
// EventQueue
// ============================================================================

/// Ordered buffer of pending events.
///
/// Append-only from the producer side, drain-all from the consumer side.
/// Created with the transport facade and cleared (not destroyed) by each
/// `poll`.
#[derive(Debug, Default)]
pub struct EventQueue {
    /// Queued events, oldest first.
    events: Mutex<VecDeque<Event>>,
}

impl EventQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event.
    pub fn push(&self, event: Event) {
        self.events.lock().push_back(event);
    }

    /// Atomically removes and returns all queued events in arrival order.
    ///
    /// The queue is left empty. Events pushed concurrently with the drain
    /// are either included in this batch or left for the next one, never
    /// split or reordered.
    #[must_use]
    pub fn drain_all(&self) -> Vec<Event> {
        let mut events = self.events.lock();
        events.drain(..).collect()
    }

    /// Returns the number of queued events.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Returns `true` if no events are queued.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================
