//! Well-known addressing of a context server.
//!
//! A node hosts exactly one server endpoint under the fixed identity
//! [`SERVER_NODE`]. Over WebSocket that identity is the request path, so a
//! client only needs `host:port` to reach it.

use std::fmt;
use std::str::FromStr;

use crate::error::CtxError;

/// Identity under which a node exposes its server endpoint.
pub const SERVER_NODE: &str = "server";

/// Default bind and connect host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default bind and connect port.
pub const DEFAULT_PORT: u16 = 8888;

/// Host and port of a context server node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServerAddress {
    /// Host name or IP.
    pub host: String,
    /// TCP port.
    pub port: u16,
}

impl ServerAddress {
    /// Create an address.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// The WebSocket path of the server endpoint.
    #[must_use]
    pub fn endpoint_path() -> String {
        format!("/{SERVER_NODE}")
    }

    /// The WebSocket URL of the server endpoint on this node.
    #[must_use]
    pub fn url(&self) -> String {
        format!("ws://{}:{}{}", self.host, self.port, Self::endpoint_path())
    }

    /// `host:port` suitable for binding a listener.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerAddress {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT)
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for ServerAddress {
    type Err = CtxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| CtxError::invalid_request(format!("expected host:port, got '{s}'")))?;
        if host.is_empty() {
            return Err(CtxError::invalid_request(format!("missing host in '{s}'")));
        }
        let port = port
            .parse::<u16>()
            .map_err(|e| CtxError::invalid_request(format!("bad port in '{s}': {e}")))?;
        Ok(Self::new(host, port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_address() {
        let addr = ServerAddress::default();
        assert_eq!(addr.to_string(), "127.0.0.1:8888");
        assert_eq!(addr.url(), "ws://127.0.0.1:8888/server");
    }

    #[test]
    fn test_parse() {
        let addr: ServerAddress = "localhost:9000".parse().unwrap();
        assert_eq!(addr, ServerAddress::new("localhost", 9000));

        assert!("localhost".parse::<ServerAddress>().is_err());
        assert!(":80".parse::<ServerAddress>().is_err());
        assert!("host:99999".parse::<ServerAddress>().is_err());
    }
}
