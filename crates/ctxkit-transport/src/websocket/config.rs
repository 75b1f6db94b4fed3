//! WebSocket configuration types.

use std::time::Duration;

use ctxkit_core::identity::{SERVER_NODE, ServerAddress};

/// Default upper bound on one frame's payload.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Client-side WebSocket configuration.
#[derive(Debug, Clone)]
pub struct WebSocketConfig {
    /// WebSocket URL (`ws://` or `wss://`).
    pub url: String,
    /// How long to wait for the TCP connect and upgrade.
    pub connect_timeout: Duration,
    /// Maximum message size in bytes.
    pub max_message_size: usize,
}

impl WebSocketConfig {
    /// Create a configuration for a URL.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            connect_timeout: Duration::from_secs(30),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }

    /// Configuration for the server endpoint of a node.
    #[must_use]
    pub fn for_address(address: &ServerAddress) -> Self {
        Self::new(address.url())
    }

    /// Set the connection timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the maximum message size.
    #[must_use]
    pub const fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self::for_address(&ServerAddress::default())
    }
}

/// Server-side configuration for WebSocket listeners.
#[derive(Debug, Clone)]
pub struct WebSocketServerConfig {
    /// Request path that gets upgraded; everything else is answered 404.
    pub path: String,
    /// Allowed origins. Empty disables origin validation.
    pub allowed_origins: Vec<String>,
    /// Maximum message size in bytes.
    pub max_message_size: usize,
}

impl WebSocketServerConfig {
    /// Create the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            path: format!("/{SERVER_NODE}"),
            allowed_origins: Vec::new(),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }

    /// Set the endpoint path.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Add an allowed origin.
    #[must_use]
    pub fn with_allowed_origin(mut self, origin: impl Into<String>) -> Self {
        self.allowed_origins.push(origin.into());
        self
    }

    /// Set multiple allowed origins at once.
    #[must_use]
    pub fn with_allowed_origins(
        mut self,
        origins: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.allowed_origins
            .extend(origins.into_iter().map(Into::into));
        self
    }

    /// Set maximum message size.
    #[must_use]
    pub const fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    /// Check if an origin is allowed.
    #[must_use]
    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        self.allowed_origins.is_empty() || self.allowed_origins.iter().any(|o| o == origin)
    }
}

impl Default for WebSocketServerConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_client_config_targets_well_known_endpoint() {
        assert_eq!(WebSocketConfig::default().url, "ws://127.0.0.1:8888/server");
    }

    #[test]
    fn test_origin_check() {
        let open = WebSocketServerConfig::new();
        assert!(open.is_origin_allowed("https://anywhere.example"));

        let strict = WebSocketServerConfig::new().with_allowed_origins(["https://a.example"]);
        assert!(strict.is_origin_allowed("https://a.example"));
        assert!(!strict.is_origin_allowed("https://b.example"));
    }
}
