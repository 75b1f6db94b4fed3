//! Client builder for fluent construction.
//!
//! The [`ClientBuilder`] collects the identity and capabilities the client
//! advertises during the handshake, and the server address it connects to.

use ctxkit_core::capability::{Capabilities, CapabilityConfig, ClientInfo, InitializeRequest};
use ctxkit_core::identity::{DEFAULT_HOST, DEFAULT_PORT};
use ctxkit_core::protocol::methods;
use ctxkit_core::{CtxError, RequestOptions, ServerAddress};
use ctxkit_transport::{Transport, WebSocketConfig, WebSocketTransport};

use crate::client::{ContextClient, initialize};

/// Builder for constructing context clients.
///
/// # Example
///
/// ```no_run
/// use ctxkit_client::ClientBuilder;
///
/// # async fn example() -> Result<(), ctxkit_core::CtxError> {
/// let client = ClientBuilder::new()
///     .name("my-client")
///     .version("0.3.0")
///     .port(9000)
///     .connect()
///     .await?;
/// println!("{}", client.banner());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    name: String,
    version: String,
    capabilities: Capabilities,
    host: String,
    port: u16,
    options: RequestOptions,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientBuilder {
    /// Create a builder with the default identity and address.
    #[must_use]
    pub fn new() -> Self {
        let info = ClientInfo::default();
        Self {
            name: info.name,
            version: info.version,
            capabilities: Capabilities::new(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            options: RequestOptions::default(),
        }
    }

    /// Set the client name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the client version.
    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Advertise one capability.
    #[must_use]
    pub fn capability(mut self, name: impl Into<String>, config: CapabilityConfig) -> Self {
        self.capabilities.insert(name.into(), config);
        self
    }

    /// Advertise the `roots` capability with change notifications.
    #[must_use]
    pub fn with_roots(self) -> Self {
        self.capability(
            "roots",
            CapabilityConfig::new().with_setting("listChanged", "true"),
        )
    }

    /// Replace all advertised capabilities.
    #[must_use]
    pub fn capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Set the server host.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the server port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Options sent with the `initialize` request.
    #[must_use]
    pub const fn handshake_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    /// The address [`connect`](Self::connect) will use.
    #[must_use]
    pub fn address(&self) -> ServerAddress {
        ServerAddress::new(self.host.clone(), self.port)
    }

    fn initialize_request(&self) -> InitializeRequest {
        let request = InitializeRequest::new(
            ClientInfo::new(&self.name, &self.version),
            self.capabilities.clone(),
        );
        if self.options == RequestOptions::default() {
            request
        } else {
            request.with_options(self.options)
        }
    }

    /// Run the handshake over `transport` and return a connected client.
    ///
    /// # Errors
    ///
    /// Returns [`CtxError::HandshakeFailed`] if the server refuses the
    /// handshake or answers with an unsupported protocol version, and a
    /// transport error if the connection fails. With a handshake timeout set,
    /// a server that stays silent fails with [`CtxError::Timeout`] and the
    /// transport is closed.
    pub async fn build<T>(self, transport: T) -> Result<ContextClient<T>, CtxError>
    where
        T: Transport + 'static,
        T::Error: Into<CtxError>,
    {
        let request = self.initialize_request();
        let handshake = initialize(&transport, &request);
        let response = match self.options.timeout {
            Some(limit) => match tokio::time::timeout(limit, handshake).await {
                Ok(response) => response?,
                Err(_) => {
                    tracing::warn!(?limit, "handshake timed out");
                    // The handshake already failed; a close error adds nothing.
                    let _ = transport.close().await;
                    return Err(CtxError::timeout(methods::INITIALIZE, limit));
                }
            },
            None => handshake.await?,
        };
        Ok(ContextClient::new(transport, request.client_info, response))
    }

    /// Connect to the configured address over WebSocket and run the handshake.
    ///
    /// # Errors
    ///
    /// Fails if the server cannot be reached or the handshake fails.
    pub async fn connect(self) -> Result<ContextClient<WebSocketTransport>, CtxError> {
        let address = self.address();
        tracing::debug!(url = %address.url(), "connecting to context server");
        let transport = WebSocketTransport::connect(WebSocketConfig::for_address(&address)).await?;
        self.build(transport).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_builder_defaults() {
        let builder = ClientBuilder::new();
        assert_eq!(builder.name, "Context Client");
        assert_eq!(builder.version, "1.0");
        assert!(builder.capabilities.is_empty());
        assert_eq!(builder.address().to_string(), "127.0.0.1:8888");
    }

    #[test]
    fn test_builder_fluent() {
        let builder = ClientBuilder::new()
            .name("test-client")
            .version("2.0.0")
            .host("10.0.0.7")
            .port(9100)
            .with_roots();

        assert_eq!(builder.name, "test-client");
        assert_eq!(builder.version, "2.0.0");
        assert_eq!(builder.address().url(), "ws://10.0.0.7:9100/server");
        assert!(builder.capabilities["roots"].is_enabled("listChanged"));
    }

    #[test]
    fn test_initialize_request_carries_options_only_when_set() {
        let plain = ClientBuilder::new().initialize_request();
        assert!(plain.options.is_none());
        assert_eq!(plain.client_info.name, "Context Client");

        let bounded = ClientBuilder::new()
            .handshake_options(RequestOptions::with_timeout(Duration::from_secs(2)))
            .initialize_request();
        assert_eq!(
            bounded.options.and_then(|o| o.timeout),
            Some(Duration::from_secs(2))
        );
    }

    #[tokio::test]
    async fn test_handshake_timeout_closes_transport() {
        let (client_end, server) = ctxkit_transport::MemoryTransport::pair();
        let limit = Duration::from_millis(50);

        let err = tokio::time::timeout(
            Duration::from_secs(2),
            ClientBuilder::new()
                .handshake_options(RequestOptions::with_timeout(limit))
                .build(client_end),
        )
        .await
        .expect("the handshake deadline must fire")
        .unwrap_err();

        let CtxError::Timeout { operation, duration } = err else {
            panic!("expected a timeout, got {err:?}");
        };
        assert_eq!(operation, "initialize");
        assert_eq!(duration, limit);
        assert!(!server.is_connected());
    }
}
