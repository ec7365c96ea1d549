//! Structured addresses and the current-origin provider.
//!
//! The engine never parses raw URL strings — address parsing is the
//! embedder's concern. The core consumes a [`Locator`]: a pure value with
//! the four fields cross-origin detection and URL building need.

use std::fmt;

/// A structured network address: `{protocol, host, port, path}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator {
    /// Scheme without the trailing colon (`http`, `https`).
    pub protocol: String,
    /// Host name.
    pub host: String,
    /// Port number.
    pub port: u16,
    /// Path component, `/` when absent.
    pub path: String,
}

impl Locator {
    /// Convenience constructor for the common case.
    pub fn new(protocol: &str, host: &str, port: u16) -> Self {
        Self {
            protocol: protocol.to_string(),
            host: host.to_string(),
            port,
            path: "/".to_string(),
        }
    }

    /// Returns `true` if `host:port` differs from this locator's
    /// authority. Scheme is deliberately ignored: the engine treats a
    /// same-host `http`→`https` hop as same-origin, matching how the
    /// transports themselves upgrade.
    pub fn is_cross_origin(&self, host: &str, port: u16) -> bool {
        self.host != host || self.port != port
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}{}", self.protocol, self.host, self.port, self.path)
    }
}

/// Supplies the origin the engine is currently running under.
///
/// The connection manager queries this once per handshake / transport
/// selection decision. `None` means "no ambient origin" (a native
/// process, not an embedded page) — every target is then same-origin.
pub trait OriginProvider {
    /// The current origin, if any.
    fn current(&self) -> Option<Locator>;
}

/// An [`OriginProvider`] returning a fixed value. The default provider
/// for native embedders and tests.
#[derive(Debug, Clone, Default)]
pub struct FixedOrigin(pub Option<Locator>);

impl FixedOrigin {
    /// An origin-less provider: all targets are same-origin.
    pub fn none() -> Self {
        Self(None)
    }
}

impl OriginProvider for FixedOrigin {
    fn current(&self) -> Option<Locator> {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cross_origin_detects_host_difference() {
        let origin = Locator::new("http", "app.test", 80);
        assert!(origin.is_cross_origin("api.test", 80));
    }

    #[test]
    fn test_cross_origin_detects_port_difference() {
        let origin = Locator::new("http", "app.test", 80);
        assert!(origin.is_cross_origin("app.test", 8080));
    }

    #[test]
    fn test_same_authority_is_not_cross_origin() {
        let origin = Locator::new("http", "app.test", 80);
        assert!(!origin.is_cross_origin("app.test", 80));
        // Scheme does not participate in the check.
        let secure = Locator::new("https", "app.test", 80);
        assert!(!secure.is_cross_origin("app.test", 80));
    }

    #[test]
    fn test_fixed_origin_none_reports_no_origin() {
        assert!(FixedOrigin::none().current().is_none());
    }

    #[test]
    fn test_locator_display() {
        let loc = Locator::new("https", "app.test", 443);
        assert_eq!(loc.to_string(), "https://app.test:443/");
    }
}
