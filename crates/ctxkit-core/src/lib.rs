//! # ctxkit-core
//!
//! Core types for the context protocol.
//!
//! A context server hosts named *tools*, *resources* and *prompts*. Clients
//! open a session, negotiate capabilities with an `initialize` handshake and
//! then list and invoke those handlers by name. This crate holds everything
//! both ends agree on:
//!
//! - **Framing**: JSON-RPC 2.0 requests, responses and notifications
//! - **Handshake**: [`InitializeRequest`] / [`InitializeResponse`] and the
//!   string-keyed [`CapabilityConfig`] map
//! - **Payloads**: [`Envelope`], [`ListResponse`], [`RequestOptions`],
//!   [`LoggingLevel`] and the handler metadata records
//! - **Errors**: the [`CtxError`] taxonomy and its JSON-RPC mapping
//! - **Addressing**: the well-known [`ServerAddress`] of a context server
//!
//! The crate does not depend on an async runtime.
//!
//! # Example
//!
//! ```rust
//! use ctxkit_core::{Envelope, ListResponse, ToolMetadata};
//!
//! let payload = serde_json::to_vec(&Envelope::new("Hello, World!")).unwrap();
//! assert_eq!(payload, br#"{"data":"Hello, World!"}"#);
//!
//! let listing = ListResponse::new(vec![
//!     ToolMetadata::new("echo").description("Echo the input"),
//!     ToolMetadata::new("sum"),
//! ]);
//! assert_eq!(listing.to_string(), "echo, sum");
//! ```

#![deny(missing_docs)]
#![warn(clippy::unwrap_used)]

pub mod capability;
pub mod error;
pub mod identity;
pub mod protocol;
pub mod types;

pub use capability::{
    Capabilities, CapabilityConfig, ClientInfo, InitializeRequest, InitializeResponse,
    PROTOCOL_VERSION, SUPPORTED_PROTOCOL_VERSIONS, ServerInfo, is_version_supported,
    negotiate_version,
};
pub use error::{CtxError, CtxResultExt, JsonRpcError};
pub use identity::{DEFAULT_HOST, DEFAULT_PORT, SERVER_NODE, ServerAddress};
pub use protocol::{Message, Notification, Request, RequestId, Response};
pub use types::{
    Envelope, HandlerKind, Identifiable, ListResponse, LoggingLevel, PromptMetadata,
    RequestOptions, ResourceMetadata, ToolMetadata,
};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::capability::{
        Capabilities, CapabilityConfig, ClientInfo, InitializeRequest, InitializeResponse,
        PROTOCOL_VERSION, ServerInfo,
    };
    pub use crate::error::{CtxError, CtxResultExt};
    pub use crate::identity::ServerAddress;
    pub use crate::protocol::{Message, Notification, Request, RequestId, Response};
    pub use crate::types::{
        Envelope, HandlerKind, ListResponse, LoggingLevel, PromptMetadata, RequestOptions,
        ResourceMetadata, ToolMetadata,
    };
}
