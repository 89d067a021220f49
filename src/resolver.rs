//! Endpoint resolution.
//!
//! Turns an [`Endpoint`] into a connectable [`ResolvedAddress`], invoked
//! once per connection attempt.
//!
//! # Resolution order
//!
//! 1. Literal fast path: if the host parses as an IPv4/IPv6 literal
//!    (bracketed IPv6 accepted), no lookup collaborator is invoked.
//! 2. A host that *looks* like a numeric literal but fails to parse
//!    (e.g. `999.999.999.999`) is [`ResolveError::Malformed`] - it would
//!    never be a valid DNS name, so the name lookup is skipped too.
//! 3. Otherwise the [`Resolve`] collaborator performs a name lookup and the
//!    first returned address wins deterministically.
//!
//! Resolution may suspend the calling task. It runs before the socket
//! exists, so it is exempt from the non-blocking contract that covers all
//! descriptor I/O.

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, SocketAddr};
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use tokio::net::lookup_host;
use tracing::{debug, trace};

use crate::endpoint::Endpoint;
use crate::error::ResolveError;

// ============================================================================
// Constants
// ============================================================================

/// Shape check for dotted-quad literals.
///
/// Matches anything of the form `N.N.N.N` with numeric components, including
/// out-of-range ones - those are malformed literals, not host names.
static DOTTED_QUAD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\d{1,3}\.){3}\d{1,3}$").expect("static regex"));

// ============================================================================
// ResolvedAddress
// ============================================================================

/// A connectable network address derived from an endpoint.
///
/// Ephemeral: consumed by the connect attempt and not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedAddress {
    /// Resolved IP address (v4 or v6).
    pub ip: IpAddr,
    /// TCP port.
    pub port: u16,
}

impl ResolvedAddress {
    /// Creates a resolved address from its parts.
    #[inline]
    #[must_use]
    pub const fn new(ip: IpAddr, port: u16) -> Self {
        Self { ip, port }
    }

    /// Returns the address as a `SocketAddr` for connecting.
    #[inline]
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.ip, self.port)
    }

    /// Returns `true` if this is an IPv4 address.
    #[inline]
    #[must_use]
    pub const fn is_ipv4(&self) -> bool {
        self.ip.is_ipv4()
    }
}

impl From<SocketAddr> for ResolvedAddress {
    fn from(addr: SocketAddr) -> Self {
        Self::new(addr.ip(), addr.port())
    }
}

// ============================================================================
// Resolve Trait
// ============================================================================

/// Name lookup collaborator.
///
/// The transport calls this once per connection attempt, only when the host
/// is not an address literal. Implementations choose their own lookup
/// mechanism; [`SystemResolver`] uses the runtime's resolver.
#[async_trait]
pub trait Resolve: Send + Sync {
    /// Resolves a host name to a connectable address.
    ///
    /// When the lookup returns multiple addresses, the first entry in
    /// resolver-returned order wins.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::NotFound`] when the lookup yields no address.
    async fn resolve_host(&self, host: &str, port: u16)
    -> Result<ResolvedAddress, ResolveError>;
}

// ============================================================================
// SystemResolver
// ============================================================================

/// Default resolver backed by `tokio::net::lookup_host`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemResolver;

#[async_trait]
impl Resolve for SystemResolver {
    async fn resolve_host(
        &self,
        host: &str,
        port: u16,
    ) -> Result<ResolvedAddress, ResolveError> {
        let mut addrs = lookup_host((host, port))
            .await
            .map_err(|e| {
                debug!(host, error = %e, "Name lookup failed");
                ResolveError::not_found(host)
            })?;

        addrs
            .next()
            .map(ResolvedAddress::from)
            .ok_or_else(|| ResolveError::not_found(host))
    }
}

// ============================================================================
// Resolution Entry Point
// ============================================================================

/// Resolves an endpoint to a connectable address.
///
/// Literal hosts are parsed directly without invoking `resolver`; everything
/// else goes through the collaborator.
///
/// # Errors
///
/// - [`ResolveError::Malformed`] if the host looks like a numeric literal
///   but is not a valid address
/// - [`ResolveError::NotFound`] if the name lookup yields no address
pub async fn resolve_endpoint(
    resolver: &dyn Resolve,
    endpoint: &Endpoint,
) -> Result<ResolvedAddress, ResolveError> {
    if let Some(ip) = literal_host(endpoint.host())? {
        trace!(host = endpoint.host(), "Literal address, skipping lookup");
        return Ok(ResolvedAddress::new(ip, endpoint.port()));
    }

    let addr = resolver
        .resolve_host(endpoint.host(), endpoint.port())
        .await?;

    debug!(host = endpoint.host(), ip = %addr.ip, "Host resolved");

    Ok(addr)
}

/// Attempts the literal-address fast path.
///
/// Returns `Ok(Some(ip))` for a valid literal, `Ok(None)` for a host name,
/// and [`ResolveError::Malformed`] for a literal-shaped string that does not
/// parse.
fn literal_host(host: &str) -> Result<Option<IpAddr>, ResolveError> {
    // Bracketed IPv6, as it appears in URIs
    let bare = if host.starts_with('[') && host.ends_with(']') {
        &host[1..host.len() - 1]
    } else {
        host
    };

    if let Ok(ip) = bare.parse::<IpAddr>() {
        return Ok(Some(ip));
    }

    if DOTTED_QUAD.is_match(bare) || bare.contains(':') {
        return Err(ResolveError::malformed(host));
    }

    Ok(None)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::Ipv4Addr;

    use crate::endpoint::Scheme;

    /// Resolver that fails the test when invoked.
    struct PanickingResolver;

    #[async_trait]
    impl Resolve for PanickingResolver {
        async fn resolve_host(
            &self,
            host: &str,
            _port: u16,
        ) -> Result<ResolvedAddress, ResolveError> {
            panic!("lookup collaborator invoked for literal host: {host}");
        }
    }

    /// Resolver that always returns a fixed address.
    struct FixedResolver(ResolvedAddress);

    #[async_trait]
    impl Resolve for FixedResolver {
        async fn resolve_host(
            &self,
            _host: &str,
            _port: u16,
        ) -> Result<ResolvedAddress, ResolveError> {
            Ok(self.0)
        }
    }

    #[test]
    fn test_literal_host_ipv4() {
        let ip = literal_host("203.0.113.5").expect("valid literal");
        assert_eq!(ip, Some(IpAddr::V4(Ipv4Addr::new(203, 0, 113, 5))));
    }

    #[test]
    fn test_literal_host_ipv6() {
        let ip = literal_host("::1").expect("valid literal");
        assert_eq!(ip, Some("::1".parse().expect("valid ip")));

        let bracketed = literal_host("[::1]").expect("valid literal");
        assert_eq!(bracketed, Some("::1".parse().expect("valid ip")));
    }

    #[test]
    fn test_literal_host_name_passthrough() {
        let result = literal_host("example.com").expect("host name");
        assert_eq!(result, None);
    }

    #[test]
    fn test_literal_host_malformed() {
        assert!(matches!(
            literal_host("999.999.999.999"),
            Err(ResolveError::Malformed { .. })
        ));
        assert!(matches!(
            literal_host("::zz"),
            Err(ResolveError::Malformed { .. })
        ));
    }

    #[tokio::test]
    async fn test_resolve_literal_skips_collaborator() {
        let endpoint =
            Endpoint::new(Scheme::Ws, "203.0.113.5", 8080, "/chat").expect("valid endpoint");

        let addr = resolve_endpoint(&PanickingResolver, &endpoint)
            .await
            .expect("literal resolves");

        assert_eq!(addr.ip, IpAddr::V4(Ipv4Addr::new(203, 0, 113, 5)));
        assert_eq!(addr.port, 8080);
    }

    #[tokio::test]
    async fn test_resolve_name_uses_collaborator() {
        let fixed = ResolvedAddress::new(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)), 9000);
        let endpoint =
            Endpoint::new(Scheme::Ws, "example.com", 9000, "/").expect("valid endpoint");

        let addr = resolve_endpoint(&FixedResolver(fixed), &endpoint)
            .await
            .expect("resolves");

        assert_eq!(addr, fixed);
    }

    #[tokio::test]
    async fn test_resolve_malformed_skips_collaborator() {
        let endpoint =
            Endpoint::new(Scheme::Ws, "300.300.300.300", 80, "/").expect("valid endpoint");

        let result = resolve_endpoint(&PanickingResolver, &endpoint).await;
        assert!(matches!(result, Err(ResolveError::Malformed { .. })));
    }

    #[tokio::test]
    async fn test_system_resolver_localhost() {
        let addr = SystemResolver
            .resolve_host("localhost", 8080)
            .await
            .expect("localhost resolves");

        assert!(addr.ip.is_loopback());
        assert_eq!(addr.port, 8080);
    }

    #[test]
    fn test_resolved_address_socket_addr() {
        let addr = ResolvedAddress::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 80);
        let socket_addr = addr.socket_addr();
        assert_eq!(socket_addr.ip(), IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(socket_addr.port(), 80);
        assert!(addr.is_ipv4());
    }
}
