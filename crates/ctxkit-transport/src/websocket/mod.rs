//! WebSocket transport.
//!
//! One JSON-RPC message per text frame. The server side listens on a node
//! address and only upgrades requests for the well-known endpoint path;
//! the client side connects to `ws://host:port/server`.
//!
//! ```rust
//! use ctxkit_transport::websocket::WebSocketConfig;
//! use std::time::Duration;
//!
//! let config = WebSocketConfig::new("ws://127.0.0.1:8888/server")
//!     .with_connect_timeout(Duration::from_secs(5));
//! assert_eq!(config.url, "ws://127.0.0.1:8888/server");
//! ```

mod channel;
mod client;
mod config;
mod server;

pub use channel::WebSocketConnection;
pub use client::WebSocketTransport;
pub use config::{WebSocketConfig, WebSocketServerConfig};
pub use server::WebSocketListener;
