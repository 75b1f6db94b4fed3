//! Transports for the context protocol.
//!
//! A transport moves JSON-RPC [`Message`](ctxkit_core::Message)s between a
//! client and a server session. The session code only sees the
//! [`Transport`] trait; how the bytes travel is decided here.
//!
//! | Transport | Use |
//! |-----------|-----|
//! | [`MemoryTransport`] | In-process pair for tests, benches and embedding |
//! | [`WebSocketTransport`] | Client end, connects to `ws://host:port/server` |
//! | [`WebSocketListener`] | Server side, yields a [`WebSocketConnection`] per peer |
//!
//! # Example
//!
//! ```no_run
//! use ctxkit_core::ServerAddress;
//! use ctxkit_transport::{Transport, WebSocketConfig, WebSocketTransport};
//!
//! # async fn run() -> Result<(), ctxkit_transport::TransportError> {
//! let config = WebSocketConfig::for_address(&ServerAddress::default());
//! let transport = WebSocketTransport::connect(config).await?;
//! while let Some(msg) = transport.recv().await? {
//!     println!("{msg:?}");
//! }
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]

pub mod error;
pub mod memory;
pub mod runtime;
pub mod traits;
pub mod websocket;

pub use error::TransportError;
pub use memory::MemoryTransport;
pub use traits::{Transport, TransportListener, TransportMetadata};
pub use websocket::{
    WebSocketConfig, WebSocketConnection, WebSocketListener, WebSocketServerConfig,
    WebSocketTransport,
};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::TransportError;
    pub use crate::memory::MemoryTransport;
    pub use crate::traits::{Transport, TransportListener, TransportMetadata};
    pub use crate::websocket::{WebSocketConfig, WebSocketListener, WebSocketTransport};
}
