//! WebSocket listener.
//!
//! [`WebSocketListener::bind`] binds the node address and starts a
//! background accept loop. Each TCP connection is upgraded on its own task,
//! so a slow handshake never stalls the loop; finished upgrades are handed
//! to [`WebSocketListener::accept`] through a channel.
//!
//! ```ignore
//! let listener = WebSocketListener::bind("127.0.0.1:8888", WebSocketServerConfig::new()).await?;
//! while let Ok(connection) = listener.accept().await {
//!     tokio::spawn(serve(connection));
//! }
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_hdr_async_with_config;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig as WsConfig;

use super::channel::WebSocketConnection;
use super::config::WebSocketServerConfig;
use crate::error::TransportError;
use crate::runtime::AsyncMutex;
use crate::traits::TransportListener;

/// Accepts WebSocket connections for the server endpoint of a node.
pub struct WebSocketListener {
    local_addr: SocketAddr,
    config: WebSocketServerConfig,
    running: Arc<AtomicBool>,
    connection_rx: AsyncMutex<mpsc::Receiver<WebSocketConnection>>,
    active_connections: Arc<AtomicU64>,
    accept_task: JoinHandle<()>,
}

impl WebSocketListener {
    /// Bind `addr` and start accepting.
    ///
    /// Port `0` picks an ephemeral port; read it back with
    /// [`local_socket_addr`](Self::local_socket_addr).
    ///
    /// # Errors
    ///
    /// Fails when the address cannot be bound.
    pub async fn bind(
        addr: impl AsRef<str>,
        config: WebSocketServerConfig,
    ) -> Result<Self, TransportError> {
        let addr = addr.as_ref();
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            TransportError::connection(format!("Failed to bind WebSocket listener on {addr}: {e}"))
        })?;
        let local_addr = listener.local_addr()?;

        // Buffer up to 32 upgraded connections nobody accepted yet.
        let (tx, rx) = mpsc::channel(32);
        let running = Arc::new(AtomicBool::new(true));
        let active_connections = Arc::new(AtomicU64::new(0));

        let accept_task = tokio::spawn(accept_loop(
            listener,
            config.clone(),
            tx,
            Arc::clone(&running),
            Arc::clone(&active_connections),
        ));

        tracing::info!(addr = %local_addr, path = %config.path, "WebSocket listener started");

        Ok(Self {
            local_addr,
            config,
            running,
            connection_rx: AsyncMutex::new(rx),
            active_connections,
            accept_task,
        })
    }

    /// Wait for the next upgraded connection.
    ///
    /// # Errors
    ///
    /// Fails once the listener has stopped.
    pub async fn accept(&self) -> Result<WebSocketConnection, TransportError> {
        let mut rx = self.connection_rx.lock().await;
        rx.recv()
            .await
            .ok_or_else(|| TransportError::connection("Listener stopped"))
    }

    /// Stop accepting. Established connections stay open.
    pub fn stop(&self) {
        if self.running.swap(false, Ordering::AcqRel) {
            self.accept_task.abort();
            tracing::info!(
                addr = %self.local_addr,
                active_connections = self.active_connections(),
                "WebSocket listener stopped"
            );
        }
    }

    /// Whether the accept loop is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// The bound address.
    #[must_use]
    pub const fn local_socket_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Server configuration.
    #[must_use]
    pub const fn config(&self) -> &WebSocketServerConfig {
        &self.config
    }

    /// Connections currently open.
    #[must_use]
    pub fn active_connections(&self) -> u64 {
        self.active_connections.load(Ordering::Relaxed)
    }
}

impl Drop for WebSocketListener {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

impl TransportListener for WebSocketListener {
    type Transport = WebSocketConnection;
    type Error = TransportError;

    async fn accept(&self) -> Result<Self::Transport, Self::Error> {
        Self::accept(self).await
    }

    fn local_addr(&self) -> Option<String> {
        Some(self.local_addr.to_string())
    }
}

async fn accept_loop(
    listener: TcpListener,
    config: WebSocketServerConfig,
    tx: mpsc::Sender<WebSocketConnection>,
    running: Arc<AtomicBool>,
    active_connections: Arc<AtomicU64>,
) {
    let next_id = AtomicU64::new(0);

    while running.load(Ordering::Acquire) {
        match listener.accept().await {
            Ok((stream, peer)) => {
                tracing::debug!(peer = %peer, "Accepting WebSocket connection");

                active_connections.fetch_add(1, Ordering::Relaxed);
                let guard = ActiveConnectionGuard {
                    counter: Arc::clone(&active_connections),
                };
                let connection_id = next_id.fetch_add(1, Ordering::Relaxed);

                tokio::spawn(upgrade(
                    stream,
                    peer,
                    connection_id,
                    guard,
                    config.clone(),
                    tx.clone(),
                ));
            }
            Err(e) => {
                tracing::error!(error = %e, "Error accepting connection");
            }
        }
    }
}

async fn upgrade(
    stream: TcpStream,
    peer: SocketAddr,
    connection_id: u64,
    guard: ActiveConnectionGuard,
    config: WebSocketServerConfig,
    tx: mpsc::Sender<WebSocketConnection>,
) {
    let mut ws_config = WsConfig::default();
    ws_config.max_message_size = Some(config.max_message_size);

    let callback =
        |request: &Request, response: Response| check_upgrade(&config, peer, request, response);

    match accept_hdr_async_with_config(stream, callback, Some(ws_config)).await {
        Ok(ws_stream) => {
            tracing::info!(peer = %peer, connection_id, "WebSocket connection established");
            let connection = WebSocketConnection::new(ws_stream, peer, connection_id, guard);
            if tx.send(connection).await.is_err() {
                tracing::warn!(connection_id, "Listener stopped, dropping connection");
            }
        }
        Err(e) => {
            tracing::warn!(peer = %peer, error = %e, "WebSocket handshake failed");
        }
    }
}

/// Only the endpoint path is upgraded, and only from allowed origins.
fn check_upgrade(
    config: &WebSocketServerConfig,
    peer: SocketAddr,
    request: &Request,
    response: Response,
) -> Result<Response, ErrorResponse> {
    let path = request.uri().path();
    if path != config.path {
        tracing::warn!(peer = %peer, path = %path, "Rejecting WebSocket upgrade for unknown path");
        return Err(reject(StatusCode::NOT_FOUND, "No endpoint at this path"));
    }

    if !config.allowed_origins.is_empty() {
        let origin = request
            .headers()
            .get("origin")
            .and_then(|o| o.to_str().ok());
        match origin {
            Some(origin) if config.is_origin_allowed(origin) => {}
            Some(origin) => {
                tracing::warn!(
                    peer = %peer,
                    origin = %origin,
                    "Rejecting WebSocket connection from disallowed origin"
                );
                return Err(reject(StatusCode::FORBIDDEN, "Origin not allowed"));
            }
            None => {
                tracing::warn!(
                    peer = %peer,
                    "Rejecting WebSocket connection with missing Origin header"
                );
                return Err(reject(StatusCode::FORBIDDEN, "Origin header required"));
            }
        }
    }

    Ok(response)
}

fn reject(status: StatusCode, body: &str) -> ErrorResponse {
    let mut response = ErrorResponse::new(Some(body.to_string()));
    *response.status_mut() = status;
    response
}

/// Decrements the listener's active connection count on drop.
pub(crate) struct ActiveConnectionGuard {
    counter: Arc<AtomicU64>,
}

impl Drop for ActiveConnectionGuard {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bind_ephemeral_port() {
        let listener = WebSocketListener::bind("127.0.0.1:0", WebSocketServerConfig::new())
            .await
            .unwrap();
        assert_ne!(listener.local_socket_addr().port(), 0);
        assert!(listener.is_running());
        assert_eq!(listener.active_connections(), 0);

        listener.stop();
        assert!(!listener.is_running());
    }

    #[tokio::test]
    async fn test_bind_invalid_address() {
        let result = WebSocketListener::bind("not-an-address", WebSocketServerConfig::new()).await;
        assert!(matches!(result, Err(TransportError::Connection { .. })));
    }
}
