//! The [`CtxError`] enum.

use std::time::Duration;

use miette::Diagnostic;
use thiserror::Error;

use super::codes;
use super::details::{BoxError, HandshakeDetails, TransportDetails};
use super::transport::{TransportContext, TransportErrorKind};
use crate::types::HandlerKind;

/// Every failure a context session can report.
///
/// Registry and handler failures are recovered at the session boundary and
/// travel to the caller as structured JSON-RPC errors. Only transport
/// failures end a connection.
#[derive(Error, Diagnostic, Debug)]
pub enum CtxError {
    // ------------------------------------------------------------------
    // JSON-RPC framing
    // ------------------------------------------------------------------
    /// The message was not valid JSON.
    #[error("Parse error: {message}")]
    #[diagnostic(code(ctx::protocol::parse_error))]
    Parse {
        /// Human-readable message.
        message: String,
        /// Underlying error.
        #[source]
        source: Option<BoxError>,
    },

    /// The message was JSON but not a valid request.
    #[error("Invalid request: {message}")]
    #[diagnostic(code(ctx::protocol::invalid_request))]
    InvalidRequest {
        /// Human-readable message.
        message: String,
    },

    /// No route for the method.
    #[error("Method not found: {method}")]
    #[diagnostic(code(ctx::protocol::method_not_found))]
    MethodNotFound {
        /// The requested method.
        method: String,
    },

    /// The parameters did not decode for the method.
    #[error("Invalid params for '{method}': {message}")]
    #[diagnostic(code(ctx::protocol::invalid_params))]
    InvalidParams {
        /// The method that rejected its parameters.
        method: String,
        /// What was wrong.
        message: String,
    },

    /// Something broke inside the server or client.
    #[error("Internal error: {message}")]
    #[diagnostic(code(ctx::internal), severity(error))]
    Internal {
        /// Human-readable message.
        message: String,
        /// Underlying error.
        #[source]
        source: Option<BoxError>,
    },

    // ------------------------------------------------------------------
    // Transport
    // ------------------------------------------------------------------
    /// The transport failed.
    #[error("Transport error ({}): {}", .0.kind, .0.message)]
    #[diagnostic(code(ctx::transport::error))]
    Transport(#[source] Box<TransportDetails>),

    // ------------------------------------------------------------------
    // Registry and dispatch
    // ------------------------------------------------------------------
    /// A handler with the same name is already registered.
    #[error("{kind} '{name}' is already registered")]
    #[diagnostic(
        code(ctx::registry::duplicate),
        help("Handler names must be unique per kind; pick another name or skip the registration")
    )]
    DuplicateRegistration {
        /// Registry the name collided in.
        kind: HandlerKind,
        /// The colliding name.
        name: String,
    },

    /// No handler with that name.
    #[error("{kind} {name} not found")]
    #[diagnostic(
        code(ctx::registry::not_found),
        help("List the server's handlers to see which names are registered")
    )]
    NotFound {
        /// Registry that was searched.
        kind: HandlerKind,
        /// The requested name or URI.
        name: String,
    },

    /// The handler ran and failed.
    #[error("{kind} '{name}' failed: {message}")]
    #[diagnostic(code(ctx::handler::failure))]
    HandlerFailure {
        /// Kind of the failing handler.
        kind: HandlerKind,
        /// Name of the failing handler.
        name: String,
        /// The handler's error, rendered.
        message: String,
    },

    /// The call did not finish within its timeout.
    #[error("Timeout after {duration:?}: {operation}")]
    #[diagnostic(
        code(ctx::timeout),
        help("Raise RequestOptions::timeout or check the handler for blocking work")
    )]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// The budget that elapsed.
        duration: Duration,
    },

    // ------------------------------------------------------------------
    // Session lifecycle
    // ------------------------------------------------------------------
    /// A call arrived before the handshake.
    #[error("Session not initialized: '{method}' requires a completed initialize handshake")]
    #[diagnostic(code(ctx::session::not_initialized), help("Call initialize first"))]
    NotInitialized {
        /// The rejected method.
        method: String,
    },

    /// `initialize` was called twice.
    #[error("Session already initialized")]
    #[diagnostic(code(ctx::session::already_initialized))]
    AlreadyInitialized,

    /// The session is closed.
    #[error("Session closed")]
    #[diagnostic(code(ctx::session::closed))]
    SessionClosed,

    /// The peer does not offer this capability.
    #[error("Capability not supported: {capability}")]
    #[diagnostic(code(ctx::capability::not_supported))]
    CapabilityNotSupported {
        /// The missing capability.
        capability: String,
    },

    /// The handshake failed.
    #[error("Handshake failed: {}", .0.message)]
    #[diagnostic(code(ctx::handshake::failed))]
    HandshakeFailed(#[source] Box<HandshakeDetails>),

    // ------------------------------------------------------------------
    // Context
    // ------------------------------------------------------------------
    /// An error with a context message attached.
    #[error("{context}: {source}")]
    #[diagnostic(code(ctx::context))]
    WithContext {
        /// The context message.
        context: String,
        /// The wrapped error.
        #[source]
        source: Box<CtxError>,
    },
}

impl CtxError {
    /// Create a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            source: None,
        }
    }

    /// Create an invalid request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Create a method not found error.
    pub fn method_not_found(method: impl Into<String>) -> Self {
        Self::MethodNotFound {
            method: method.into(),
        }
    }

    /// Create an invalid params error.
    pub fn invalid_params(method: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParams {
            method: method.into(),
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Create an internal error with a source.
    pub fn internal_with_source<E: std::error::Error + Send + Sync + 'static>(
        message: impl Into<String>,
        source: E,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a transport error.
    pub fn transport(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self::transport_with_context(kind, message, TransportContext::default())
    }

    /// Create a transport error with context.
    pub fn transport_with_context(
        kind: TransportErrorKind,
        message: impl Into<String>,
        context: TransportContext,
    ) -> Self {
        Self::Transport(Box::new(TransportDetails {
            kind,
            message: message.into(),
            context,
            source: None,
        }))
    }

    /// Create a duplicate registration error.
    pub fn duplicate(kind: HandlerKind, name: impl Into<String>) -> Self {
        Self::DuplicateRegistration {
            kind,
            name: name.into(),
        }
    }

    /// Create a not found error.
    pub fn not_found(kind: HandlerKind, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// Create a handler failure.
    pub fn handler_failure(
        kind: HandlerKind,
        name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::HandlerFailure {
            kind,
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a not initialized error.
    pub fn not_initialized(method: impl Into<String>) -> Self {
        Self::NotInitialized {
            method: method.into(),
        }
    }

    /// Create a capability not supported error.
    pub fn capability_not_supported(capability: impl Into<String>) -> Self {
        Self::CapabilityNotSupported {
            capability: capability.into(),
        }
    }

    /// Create a handshake failure.
    pub fn handshake_failed(message: impl Into<String>) -> Self {
        Self::handshake_failed_with_versions(message, None, None)
    }

    /// Create a handshake failure recording both protocol versions.
    pub fn handshake_failed_with_versions(
        message: impl Into<String>,
        client_version: Option<String>,
        server_version: Option<String>,
    ) -> Self {
        Self::HandshakeFailed(Box::new(HandshakeDetails {
            message: message.into(),
            client_version,
            server_version,
            source: None,
        }))
    }

    /// The JSON-RPC error code for this error.
    #[must_use]
    pub fn code(&self) -> i32 {
        match self {
            Self::Parse { .. } => codes::PARSE_ERROR,
            Self::InvalidRequest { .. } => codes::INVALID_REQUEST,
            Self::MethodNotFound { .. } => codes::METHOD_NOT_FOUND,
            Self::InvalidParams { .. } => codes::INVALID_PARAMS,
            Self::Internal { .. } => codes::INTERNAL_ERROR,
            Self::Transport(_) => codes::SERVER_ERROR_START,
            Self::HandlerFailure { .. } => codes::HANDLER_FAILURE,
            Self::NotFound { .. } => codes::NOT_FOUND,
            Self::DuplicateRegistration { .. } => codes::DUPLICATE_REGISTRATION,
            Self::NotInitialized { .. } => codes::NOT_INITIALIZED,
            Self::AlreadyInitialized => codes::ALREADY_INITIALIZED,
            Self::SessionClosed => codes::SESSION_CLOSED,
            Self::Timeout { .. } => codes::TIMEOUT,
            Self::CapabilityNotSupported { .. } => codes::CAPABILITY_NOT_SUPPORTED,
            Self::HandshakeFailed(_) => codes::HANDSHAKE_FAILED,
            Self::WithContext { source, .. } => source.code(),
        }
    }

    /// Whether the caller can reasonably retry or correct the call.
    ///
    /// Transport and handshake failures end the connection; everything
    /// raised by the session itself leaves the connection usable.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Transport(details) => details.kind == TransportErrorKind::MalformedFrame,
            Self::HandshakeFailed(_) | Self::SessionClosed => false,
            Self::Internal { .. } | Self::Parse { .. } => false,
            Self::WithContext { source, .. } => source.is_recoverable(),
            _ => true,
        }
    }

    /// Whether a received frame failed to decode while the connection
    /// itself stayed up.
    #[must_use]
    pub fn is_malformed_frame(&self) -> bool {
        matches!(
            self.root(),
            Self::Transport(details) if details.kind == TransportErrorKind::MalformedFrame
        )
    }

    /// Strip any context wrappers.
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::WithContext { source, .. } => source.root(),
            other => other,
        }
    }
}

impl From<serde_json::Error> for CtxError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<std::io::Error> for CtxError {
    fn from(err: std::io::Error) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::ConnectionRefused | std::io::ErrorKind::NotFound => {
                TransportErrorKind::ConnectionFailed
            }
            std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::BrokenPipe => TransportErrorKind::ConnectionClosed,
            std::io::ErrorKind::TimedOut => TransportErrorKind::Timeout,
            std::io::ErrorKind::WriteZero => TransportErrorKind::WriteFailed,
            _ => TransportErrorKind::ReadFailed,
        };
        Self::Transport(Box::new(TransportDetails {
            kind,
            message: err.to_string(),
            context: TransportContext::default(),
            source: Some(Box::new(err)),
        }))
    }
}
