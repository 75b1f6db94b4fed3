//! Client side of the context protocol.
//!
//! A [`ContextClient`] connects to a context server, runs the `initialize`
//! handshake and then exposes every session operation as a typed async
//! method. Construction either succeeds with a fully initialized client or
//! fails; there is no half-open client.
//!
//! # Example
//!
//! ```no_run
//! use ctxkit_client::ContextClient;
//! use ctxkit_core::{Envelope, RequestOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ctxkit_core::CtxError> {
//!     let client = ContextClient::connect_server("127.0.0.1", 8888).await?;
//!     println!("{}", client.banner());
//!
//!     let tools = client.list_tools(RequestOptions::default()).await?;
//!     println!("tools: {tools}");
//!
//!     let echoed = client
//!         .call_tool("echo", &Envelope::new("Hello, World!"), RequestOptions::default())
//!         .await?;
//!     println!("{echoed}");
//!
//!     client.close().await
//! }
//! ```
//!
//! Any [`Transport`](ctxkit_transport::Transport) works through
//! [`ClientBuilder::build`]; [`ClientBuilder::connect`] uses WebSocket.

#![deny(missing_docs)]
#![warn(clippy::unwrap_used)]

pub mod builder;
pub mod client;

pub use builder::ClientBuilder;
pub use client::ContextClient;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::builder::ClientBuilder;
    pub use crate::client::ContextClient;
}
