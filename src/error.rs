//! Error types for the transport.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use ws_transport::{Result, Transport};
//!
//! async fn example(transport: &mut Transport) -> Result<()> {
//!     transport.send_message(b"hello")?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Endpoint | [`Error::InvalidEndpoint`] |
//! | Resolution | [`ResolveError::NotFound`], [`ResolveError::Malformed`] |
//! | Socket | [`SocketError::AllocationFailed`], [`SocketError::ConnectFailed`], [`SocketError::NotConnected`], [`SocketError::WriteFailed`], [`SocketError::AlreadyActive`] |
//!
//! Mid-connection failures (peer reset, read error) are never surfaced as
//! errors: the I/O task translates them into a `Disconnected` event that is
//! observed through `poll`.

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// ResolveError
// ============================================================================

/// Errors produced while turning an endpoint into a network address.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// Name lookup yielded no address.
    #[error("No address found for host: {host}")]
    NotFound {
        /// The host that failed to resolve.
        host: String,
    },

    /// The host looked like a numeric literal but is not a valid address.
    ///
    /// Returned by the literal fast path, e.g. for `999.999.999.999`.
    #[error("Malformed address literal: {host}")]
    Malformed {
        /// The invalid literal.
        host: String,
    },
}

impl ResolveError {
    /// Creates a not-found error.
    #[inline]
    pub fn not_found(host: impl Into<String>) -> Self {
        Self::NotFound { host: host.into() }
    }

    /// Creates a malformed-literal error.
    #[inline]
    pub fn malformed(host: impl Into<String>) -> Self {
        Self::Malformed { host: host.into() }
    }
}

// ============================================================================
// SocketError
// ============================================================================

/// Errors produced by socket operations.
///
/// Only failures that occur synchronously on the caller's side appear here.
/// Asynchronous failures (peer reset mid-connection) become `Disconnected`
/// events instead.
#[derive(Error, Debug)]
pub enum SocketError {
    /// The OS denied the socket resource.
    #[error("Socket allocation failed: {source}")]
    AllocationFailed {
        /// Underlying OS error.
        source: IoError,
    },

    /// The connect attempt could not be issued.
    ///
    /// A pending (in-progress) connect is the expected path and is never
    /// reported through this variant.
    #[error("Connect failed: {source}")]
    ConnectFailed {
        /// Underlying OS error.
        source: IoError,
    },

    /// An operation required a connected transport.
    ///
    /// Returned by `send_message` while the state machine is not Connected.
    /// Recoverable: retry after the `Connected` event has been polled.
    #[error("Transport is not connected")]
    NotConnected,

    /// A write on the descriptor failed.
    #[error("Write failed: {source}")]
    WriteFailed {
        /// Underlying OS error.
        source: IoError,
    },

    /// A connect was requested while an attempt is already live.
    ///
    /// Disconnect first; each connection gets a fresh state machine.
    #[error("A connection attempt is already active")]
    AlreadyActive,
}

impl SocketError {
    /// Creates an allocation-failed error.
    #[inline]
    pub fn allocation_failed(source: IoError) -> Self {
        Self::AllocationFailed { source }
    }

    /// Creates a connect-failed error.
    #[inline]
    pub fn connect_failed(source: IoError) -> Self {
        Self::ConnectFailed { source }
    }

    /// Creates a write-failed error.
    #[inline]
    pub fn write_failed(source: IoError) -> Self {
        Self::WriteFailed { source }
    }
}

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    /// Endpoint validation failed.
    ///
    /// Returned when an endpoint has an empty host or a zero port.
    #[error("Invalid endpoint: {message}")]
    InvalidEndpoint {
        /// Description of the validation failure.
        message: String,
    },

    /// Endpoint resolution failed.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Socket operation failed.
    #[error(transparent)]
    Socket(#[from] SocketError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates an invalid endpoint error.
    #[inline]
    pub fn invalid_endpoint(message: impl Into<String>) -> Self {
        Self::InvalidEndpoint {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a resolution error.
    #[inline]
    #[must_use]
    pub fn is_resolve_error(&self) -> bool {
        matches!(self, Self::Resolve(_))
    }

    /// Returns `true` if this is a socket error.
    #[inline]
    #[must_use]
    pub fn is_socket_error(&self) -> bool {
        matches!(self, Self::Socket(_))
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors may succeed on retry: sending before the
    /// `Connected` event has been polled, or connecting while a previous
    /// attempt is still live.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Socket(SocketError::NotConnected) | Self::Socket(SocketError::AlreadyActive)
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
