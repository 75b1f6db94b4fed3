//! # ctxkit
//!
//! Serve named tools, resources and prompts to remote clients over a
//! capability-negotiating session.
//!
//! This facade re-exports the workspace crates:
//!
//! | Module | Crate | Contents |
//! |--------|-------|----------|
//! | crate root | `ctxkit-core` | framing, handshake, errors, payload types |
//! | [`transport`] | `ctxkit-transport` | memory pair and WebSocket transports |
//! | [`server`] | `ctxkit-server` | handlers, registries, sessions, bootstrap |
//! | [`client`] | `ctxkit-client` | handshake and typed calls |
//!
//! # Example
//!
//! ```rust
//! use ctxkit::prelude::*;
//! use ctxkit::transport::MemoryTransport;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), CtxError> {
//! let server = ContextServer::new(ServerConfig::default());
//! server.register_tool(Typed(EchoTool))?;
//!
//! let (client_end, server_end) = MemoryTransport::pair();
//! tokio::spawn({
//!     let server = server.clone();
//!     async move { server.serve(server_end).await }
//! });
//!
//! let client = ClientBuilder::new().build(client_end).await?;
//! let echoed = client
//!     .call_tool("echo", &Envelope::new("Hello, World!"), RequestOptions::default())
//!     .await?;
//! assert_eq!(echoed, "Hello, World!");
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![warn(clippy::unwrap_used)]

// Re-export all public items from core
pub use ctxkit_core::*;

pub use ctxkit_transport::{Transport, TransportListener, TransportMetadata};

pub mod prelude;

/// Transport layer types.
pub mod transport {
    pub use ctxkit_transport::*;
}

/// Server implementation types.
#[cfg(feature = "server")]
pub mod server {
    pub use ctxkit_server::*;
}

/// Client implementation types.
#[cfg(feature = "client")]
pub mod client {
    pub use ctxkit_client::*;
}
