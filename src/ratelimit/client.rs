//! Client identifier resolution.

use std::net::SocketAddr;

use axum::http::HeaderMap;

/// Identifier shared by every client whose address cannot be resolved.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Header carrying the proxy-forwarded client address chain.
pub const FORWARDED_FOR: &str = "x-forwarded-for";

/// The key that partitions bucket state, typically an IP address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientKey(String);

impl ClientKey {
    /// Resolve the client identifier for a request.
    ///
    /// When `trust_proxy` is set the leftmost `X-Forwarded-For` entry wins.
    /// Otherwise, or when the header is missing, the transport peer address
    /// is used. Requests with neither share the [`UNKNOWN_CLIENT`] bucket.
    pub fn resolve(headers: &HeaderMap, peer: Option<SocketAddr>, trust_proxy: bool) -> Self {
        if trust_proxy {
            if let Some(forwarded) = forwarded_client(headers) {
                return Self(forwarded);
            }
        }

        match peer {
            Some(addr) => Self(addr.ip().to_string()),
            None => Self(UNKNOWN_CLIENT.to_string()),
        }
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn forwarded_client(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(FORWARDED_FOR)?.to_str().ok()?;
    value
        .split(',')
        .map(str::trim)
        .find(|entry| !entry.is_empty())
        .map(str::to_string)
}

impl std::fmt::Display for ClientKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn peer() -> Option<SocketAddr> {
        Some("10.1.2.3:54321".parse().unwrap())
    }

    fn forwarded(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(FORWARDED_FOR, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_trusted_forwarded_header_wins() {
        let key = ClientKey::resolve(&forwarded("192.168.1.1"), peer(), true);
        assert_eq!(key.as_str(), "192.168.1.1");
    }

    #[test]
    fn test_forwarded_chain_uses_leftmost_entry() {
        let key = ClientKey::resolve(&forwarded(" 203.0.113.7 , 10.0.0.1"), peer(), true);
        assert_eq!(key.as_str(), "203.0.113.7");
    }

    #[test]
    fn test_untrusted_proxy_uses_peer_ip() {
        let key = ClientKey::resolve(&forwarded("192.168.1.1"), peer(), false);
        assert_eq!(key.as_str(), "10.1.2.3");
    }

    #[test]
    fn test_empty_forwarded_header_falls_back_to_peer() {
        let key = ClientKey::resolve(&forwarded(" , "), peer(), true);
        assert_eq!(key.as_str(), "10.1.2.3");
    }

    #[test]
    fn test_no_address_is_unknown() {
        let key = ClientKey::resolve(&HeaderMap::new(), None, true);
        assert_eq!(key.as_str(), UNKNOWN_CLIENT);
        assert_eq!(key.to_string(), "unknown");
    }
}
