//! Server side of the context protocol.
//!
//! A [`ContextServer`] hosts three registries of named handlers, one each
//! for tools, resources and prompts. Every connection gets a [`Session`]
//! that runs the handshake and routes calls into those registries.
//!
//! # Overview
//!
//! 1. Implement [`Tool`], [`Resource`] or [`Prompt`] (or use the
//!    [`builtin`] handlers, or a [`TypedTool`] through [`Typed`])
//! 2. Register them on a [`ContextServer`]
//! 3. [`run`](ContextServer::run) it on a WebSocket endpoint, or
//!    [`serve`](ContextServer::serve) a single transport
//!
//! # Example
//!
//! ```rust
//! # tokio_test::block_on(async {
//! use bytes::Bytes;
//! use ctxkit_core::{ClientInfo, Capabilities, Envelope, InitializeRequest, RequestOptions};
//! use ctxkit_server::builtin::EchoTool;
//! use ctxkit_server::{ContextServer, ServerConfig, Typed};
//!
//! let server = ContextServer::new(ServerConfig::default());
//! server.register_tool(Typed(EchoTool)).unwrap();
//!
//! let session = server.session();
//! session
//!     .initialize(InitializeRequest::new(ClientInfo::default(), Capabilities::new()))
//!     .unwrap();
//!
//! let payload = Bytes::from(serde_json::to_vec(&Envelope::new("Hello, World!")).unwrap());
//! let out = session.call_tool("echo", payload, RequestOptions::default()).await.unwrap();
//! assert_eq!(out, "Hello, World!");
//! # });
//! ```
//!
//! # Errors
//!
//! Lookup misses and handler failures come back as structured
//! [`CtxError`](ctxkit_core::CtxError) values (`NotFound`, `HandlerFailure`,
//! `Timeout`) and are sent to the client as JSON-RPC errors. They never end
//! the connection.

#![deny(missing_docs)]

pub mod builtin;
pub mod config;
pub mod handler;
pub mod peer;
pub mod registry;
pub mod router;
pub mod server;
pub mod session;
pub mod state;
pub mod subscriptions;

pub use config::ServerConfig;
pub use handler::{
    Completion, Handler, HandlerError, HandlerResult, Prompt, Resource, Tool, Typed, TypedTool,
};
pub use peer::{Peer, TransportPeer};
pub use registry::{PromptRegistry, Registry, ResourceRegistry, ToolRegistry};
pub use server::{ConnectionRuntime, ContextServer};
pub use session::{ClientRecord, Session, SessionState};
pub use state::ServerState;
pub use subscriptions::{SessionId, Subscriptions};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::builtin::{EchoTool, FnResource, TemplatePrompt};
    pub use crate::config::ServerConfig;
    pub use crate::handler::{
        Completion, HandlerError, HandlerResult, Prompt, Resource, Tool, Typed, TypedTool,
    };
    pub use crate::server::ContextServer;
    pub use crate::session::Session;
}
