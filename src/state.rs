//! Connection state machine.
//!
//! Tracks the lifecycle of a single connection attempt and gates which
//! operations are legal:
//!
//! ```text
//! Idle ──connect──► Connecting ──open──► Connected ──close──► Disconnected
//!                        │                                         ▲
//!                        └──────────close / connect error──────────┘
//! ```
//!
//! Disconnected is terminal; a new connect builds a fresh machine rather
//! than reusing this one. The machine mutates only on the consumer thread:
//! either from drained events inside `poll` or from an explicit
//! `disconnect`.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use tracing::trace;

use crate::queue::Event;

// ============================================================================
// ConnectionState
// ============================================================================

/// Lifecycle state of a connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No attempt started.
    Idle,
    /// Connect issued, outcome not yet observed.
    Connecting,
    /// Open signal observed; sending is legal.
    Connected,
    /// Terminal. A fresh connect builds a fresh machine.
    Disconnected,
}

impl ConnectionState {
    /// Returns `true` if sending is legal in this state.
    #[inline]
    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Returns `true` if a connect attempt is live (issued or established).
    #[inline]
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Connecting | Self::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Disconnected => write!(f, "disconnected"),
        }
    }
}

// ============================================================================
// StateMachine
// ============================================================================

/// State machine for one connection attempt.
///
/// Besides tracking the current state, the machine decides event
/// *delivery*: [`apply`](Self::apply) returns whether the drained event
/// should reach the consumer's handler. Events that are illegal for the
/// current state (a message after teardown, a duplicate close) are
/// discarded.
#[derive(Debug)]
pub struct StateMachine {
    /// Current state.
    state: ConnectionState,
    /// Whether a Disconnected event has already been delivered.
    disconnect_delivered: bool,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine {
    /// Creates a machine in the Idle state.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: ConnectionState::Idle,
            disconnect_delivered: false,
        }
    }

    /// Returns the current state.
    #[inline]
    #[must_use]
    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    /// Marks the connect attempt as issued.
    ///
    /// Transition: Idle → Connecting.
    pub fn connect_requested(&mut self) {
        self.state = ConnectionState::Connecting;
    }

    /// Forces the machine into Disconnected for an explicit disconnect.
    ///
    /// Legal from any state. Does not mark the Disconnected event as
    /// delivered: the queued event still reaches the consumer exactly once
    /// through `poll`.
    pub fn force_disconnect(&mut self) {
        self.state = ConnectionState::Disconnected;
    }

    /// Applies a drained event and reports whether to deliver it.
    ///
    /// - `Connected` is delivered only from Connecting
    /// - `MessageReceived` is delivered only while Connected
    /// - `Disconnected` is delivered exactly once per machine
    pub fn apply(&mut self, event: &Event) -> bool {
        match event {
            Event::Connected => {
                if self.state != ConnectionState::Connecting {
                    trace!(state = %self.state, "Discarding Connected event");
                    return false;
                }
                self.state = ConnectionState::Connected;
                true
            }

            Event::MessageReceived(_) => {
                if self.state != ConnectionState::Connected {
                    trace!(state = %self.state, "Discarding MessageReceived event");
                    return false;
                }
                true
            }

            Event::Disconnected => {
                if self.disconnect_delivered {
                    trace!("Discarding duplicate Disconnected event");
                    return false;
                }
                self.state = ConnectionState::Disconnected;
                self.disconnect_delivered = true;
                true
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
