//! Transport abstractions.
//!
//! - [`Transport`]: bidirectional message passing for one connection
//! - [`TransportListener`]: server side, yields one transport per accepted peer

use std::future::Future;
use std::time::Instant;

use ctxkit_core::protocol::Message;

/// Metadata about a transport connection.
#[derive(Debug, Clone, Default)]
pub struct TransportMetadata {
    /// Transport type identifier (`memory`, `websocket`).
    pub transport_type: String,
    /// Remote address, if applicable.
    pub remote_addr: Option<String>,
    /// Local address, if applicable.
    pub local_addr: Option<String>,
    /// When the connection was established.
    pub connected_at: Option<Instant>,
}

impl TransportMetadata {
    /// Create metadata for a transport type.
    #[must_use]
    pub fn new(transport_type: impl Into<String>) -> Self {
        Self {
            transport_type: transport_type.into(),
            ..Self::default()
        }
    }

    /// Set the remote address.
    #[must_use]
    pub fn remote_addr(mut self, addr: impl Into<String>) -> Self {
        self.remote_addr = Some(addr.into());
        self
    }

    /// Set the local address.
    #[must_use]
    pub fn local_addr(mut self, addr: impl Into<String>) -> Self {
        self.local_addr = Some(addr.into());
        self
    }

    /// Mark the connection time.
    #[must_use]
    pub fn connected_now(mut self) -> Self {
        self.connected_at = Some(Instant::now());
        self
    }
}

/// Bidirectional message passing between a context client and server.
///
/// `send` and `recv` must be callable concurrently from different tasks:
/// the client keeps a reader task in `recv` while callers `send`.
pub trait Transport: Send + Sync {
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Send one message.
    ///
    /// # Errors
    ///
    /// Fails when the connection is closed or the write fails.
    fn send(&self, msg: Message) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Receive the next message.
    ///
    /// Returns `Ok(None)` once the peer closed the connection cleanly.
    ///
    /// # Errors
    ///
    /// Fails when the read fails or a frame is not a valid message.
    fn recv(&self) -> impl Future<Output = Result<Option<Message>, Self::Error>> + Send;

    /// Close the connection.
    ///
    /// # Errors
    ///
    /// Fails when the close handshake could not be written.
    fn close(&self) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Whether the connection is still open.
    fn is_connected(&self) -> bool;

    /// Connection metadata.
    fn metadata(&self) -> TransportMetadata;
}

/// Server-side source of connections.
pub trait TransportListener: Send + Sync {
    /// Transport produced per accepted connection.
    type Transport: Transport + 'static;

    /// The error type for listener operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Wait for the next connection.
    ///
    /// # Errors
    ///
    /// Fails once the listener has stopped.
    fn accept(&self) -> impl Future<Output = Result<Self::Transport, Self::Error>> + Send;

    /// Address the listener is bound to.
    fn local_addr(&self) -> Option<String>;
}
