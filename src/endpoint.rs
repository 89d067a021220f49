//! Remote endpoint description.
//!
//! An [`Endpoint`] is the structured form of a WebSocket URI: scheme, host,
//! port and path. The transport does not parse raw URIs itself; callers
//! either build an endpoint from fields or hand over a pre-parsed
//! [`url::Url`] via [`Endpoint::from_url`].
//!
//! Invariants enforced at construction:
//!
//! - `host` is non-empty
//! - `port` is in `[1, 65535]` (zero is rejected)
//!
//! An endpoint is immutable once built; `connect` consumes it for
//! resolution and discards it afterwards.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Scheme
// ============================================================================

/// URI scheme of a WebSocket endpoint.
///
/// The scheme selects the default port and is carried for the layer above;
/// the byte transport itself opens a plain TCP stream either way (TLS is
/// out of scope here).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    /// `ws://` - plain WebSocket.
    Ws,
    /// `wss://` - WebSocket over TLS (terminated by the layer above).
    Wss,
}

impl Scheme {
    /// Returns the default port for this scheme.
    #[inline]
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::Ws => 80,
            Self::Wss => 443,
        }
    }

    /// Parses a scheme from its URI string form.
    ///
    /// Returns `None` for anything other than `ws` or `wss`.
    #[must_use]
    pub fn parse(scheme: &str) -> Option<Self> {
        match scheme {
            "ws" => Some(Self::Ws),
            "wss" => Some(Self::Wss),
            _ => None,
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ws => write!(f, "ws"),
            Self::Wss => write!(f, "wss"),
        }
    }
}

// ============================================================================
// Endpoint
// ============================================================================

/// Structured description of a remote WebSocket target.
///
/// # Example
///
/// ```
/// use ws_transport::{Endpoint, Scheme};
///
/// let endpoint = Endpoint::new(Scheme::Ws, "203.0.113.5", 8080, "/chat").unwrap();
/// assert_eq!(endpoint.to_string(), "ws://203.0.113.5:8080/chat");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// URI scheme.
    scheme: Scheme,
    /// Host name or address literal.
    host: String,
    /// TCP port, never zero.
    port: u16,
    /// Request path, always starting with `/`.
    path: String,
}

impl Endpoint {
    /// Creates an endpoint from its parts.
    ///
    /// An empty path is normalized to `/`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEndpoint`] if `host` is empty or `port` is
    /// zero.
    pub fn new(
        scheme: Scheme,
        host: impl Into<String>,
        port: u16,
        path: impl Into<String>,
    ) -> Result<Self> {
        let host = host.into();
        if host.is_empty() {
            return Err(Error::invalid_endpoint("host must not be empty"));
        }
        if port == 0 {
            return Err(Error::invalid_endpoint("port must be in [1, 65535]"));
        }

        let mut path = path.into();
        if path.is_empty() {
            path.push('/');
        }

        Ok(Self {
            scheme,
            host,
            port,
            path,
        })
    }

    /// Creates an endpoint from a pre-parsed URL.
    ///
    /// The port falls back to the scheme default when the URL omits it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEndpoint`] if the URL scheme is not `ws` or
    /// `wss`, or if the URL has no host.
    pub fn from_url(url: &Url) -> Result<Self> {
        let scheme = Scheme::parse(url.scheme())
            .ok_or_else(|| Error::invalid_endpoint(format!("unsupported scheme: {}", url.scheme())))?;

        let host = url
            .host_str()
            .ok_or_else(|| Error::invalid_endpoint("URL has no host"))?;

        let port = url.port().unwrap_or_else(|| scheme.default_port());

        Self::new(scheme, host, port, url.path())
    }

    /// Returns the URI scheme.
    #[inline]
    #[must_use]
    pub const fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// Returns the host name or address literal.
    #[inline]
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the TCP port.
    #[inline]
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Returns the request path.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}{}", self.scheme, self.host, self.port, self.path)
    }
}

// ============================================================================
// Tests
// ============================================================================
