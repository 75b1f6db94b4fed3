//! Server configuration.

use ctxkit_core::{DEFAULT_HOST, DEFAULT_PORT, PROTOCOL_VERSION, ServerAddress, ServerInfo};
use ctxkit_transport::WebSocketServerConfig;

/// Configuration of a [`ContextServer`](crate::ContextServer).
///
/// ```rust
/// use ctxkit_server::ServerConfig;
///
/// let config = ServerConfig::default()
///     .with_port(9000)
///     .with_instructions("Call echo with {\"data\": ...}");
/// assert_eq!(config.address().to_string(), "127.0.0.1:9000");
/// assert_eq!(config.path, "/server");
/// ```
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind.
    pub host: String,
    /// Port to bind. `0` picks an ephemeral port.
    pub port: u16,
    /// WebSocket path of the server endpoint.
    pub path: String,
    /// Identity reported during `initialize`.
    pub server_info: ServerInfo,
    /// Usage notes reported during `initialize`.
    pub instructions: Option<String>,
    /// Protocol version offered when the client asks for an unsupported one.
    pub protocol_version: String,
    /// Largest accepted message, in bytes.
    pub max_message_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            path: ServerAddress::endpoint_path(),
            server_info: ServerInfo::default(),
            instructions: None,
            protocol_version: PROTOCOL_VERSION.to_string(),
            max_message_size: WebSocketServerConfig::default().max_message_size,
        }
    }
}

impl ServerConfig {
    /// Create the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the host.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the port.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set host and port from an address.
    #[must_use]
    pub fn with_address(mut self, address: ServerAddress) -> Self {
        self.host = address.host;
        self.port = address.port;
        self
    }

    /// Set the endpoint path.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Set the reported server identity.
    #[must_use]
    pub fn with_server_info(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.server_info = ServerInfo::new(name, version);
        self
    }

    /// Set the instructions.
    #[must_use]
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Set the fallback protocol version.
    #[must_use]
    pub fn with_protocol_version(mut self, version: impl Into<String>) -> Self {
        self.protocol_version = version.into();
        self
    }

    /// Set the maximum message size.
    #[must_use]
    pub const fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    /// The bind address.
    #[must_use]
    pub fn address(&self) -> ServerAddress {
        ServerAddress::new(self.host.clone(), self.port)
    }

    /// Listener configuration derived from this one.
    #[must_use]
    pub fn websocket(&self) -> WebSocketServerConfig {
        WebSocketServerConfig::new()
            .with_path(self.path.clone())
            .with_max_message_size(self.max_message_size)
    }
}
