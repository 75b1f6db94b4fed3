//! WebSocket client transport.

use ctxkit_core::protocol::Message;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig as WsConfig;
use tokio_tungstenite::{MaybeTlsStream, connect_async_with_config};

use super::channel::Framed;
use super::config::WebSocketConfig;
use crate::error::TransportError;
use crate::traits::{Transport, TransportMetadata};

/// Client end of a WebSocket connection to a context server.
pub struct WebSocketTransport {
    config: WebSocketConfig,
    framed: Framed<MaybeTlsStream<TcpStream>>,
}

impl WebSocketTransport {
    /// Connect and complete the WebSocket upgrade.
    ///
    /// # Errors
    ///
    /// Fails on an invalid URL, when the connect does not finish within
    /// `config.connect_timeout`, or when the server refuses the upgrade.
    pub async fn connect(config: WebSocketConfig) -> Result<Self, TransportError> {
        let url = url::Url::parse(&config.url)
            .map_err(|e| TransportError::connection(format!("Invalid WebSocket URL: {e}")))?;

        let mut ws_config = WsConfig::default();
        ws_config.max_message_size = Some(config.max_message_size);

        let connect = connect_async_with_config(url.as_str(), Some(ws_config), true);
        let (ws_stream, _response) = tokio::time::timeout(config.connect_timeout, connect)
            .await
            .map_err(|_| TransportError::Timeout {
                operation: "WebSocket connect".to_string(),
                duration: config.connect_timeout,
            })?
            .map_err(|e| TransportError::connection(format!("WebSocket connection failed: {e}")))?;

        tracing::info!(url = %config.url, "WebSocket connected");

        Ok(Self {
            framed: Framed::new(ws_stream),
            config,
        })
    }

    /// The URL this transport connected to.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.config.url
    }

    /// Messages written so far.
    #[must_use]
    pub fn messages_sent(&self) -> u64 {
        self.framed.messages_sent()
    }

    /// Messages read so far.
    #[must_use]
    pub fn messages_received(&self) -> u64 {
        self.framed.messages_received()
    }
}

impl Transport for WebSocketTransport {
    type Error = TransportError;

    async fn send(&self, msg: Message) -> Result<(), Self::Error> {
        self.framed.send(&msg).await
    }

    async fn recv(&self) -> Result<Option<Message>, Self::Error> {
        self.framed.recv().await
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.framed.close().await?;
        tracing::info!(url = %self.config.url, "WebSocket connection closed");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.framed.is_connected()
    }

    fn metadata(&self) -> TransportMetadata {
        TransportMetadata::new("websocket").remote_addr(&self.config.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_invalid_url_is_rejected() {
        let result = WebSocketTransport::connect(WebSocketConfig::new("not a url")).await;
        assert!(matches!(result, Err(TransportError::Connection { .. })));
    }

    #[tokio::test]
    async fn test_connect_refused() {
        // Bind then drop to get a port nobody listens on.
        let port = {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let config = WebSocketConfig::new(format!("ws://127.0.0.1:{port}/server"))
            .with_connect_timeout(Duration::from_secs(5));

        assert!(WebSocketTransport::connect(config).await.is_err());
    }
}
