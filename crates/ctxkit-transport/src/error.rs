//! Transport error types.

use ctxkit_core::error::{CtxError, TransportContext, TransportDetails, TransportErrorKind};
use thiserror::Error;

/// Errors raised by transports and listeners.
#[derive(Error, Debug)]
pub enum TransportError {
    /// I/O error from the socket.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An outgoing message could not be encoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A frame arrived but did not hold a JSON-RPC message. The connection
    /// stays open.
    #[error("Malformed frame: {0}")]
    Malformed(#[source] serde_json::Error),

    /// Connecting, binding or upgrading failed.
    #[error("Connection error: {message}")]
    Connection {
        /// Error message.
        message: String,
    },

    /// The peer closed the connection.
    #[error("Connection closed")]
    ConnectionClosed,

    /// The transport was already closed locally.
    #[error("Not connected")]
    NotConnected,

    /// A frame of an unexpected type arrived.
    #[error("Invalid message: {message}")]
    InvalidMessage {
        /// Description of the problem.
        message: String,
    },

    /// The operation did not finish in time.
    #[error("{operation} timed out after {duration:?}")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// How long the operation waited.
        duration: std::time::Duration,
    },
}

impl TransportError {
    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create an invalid message error.
    pub fn invalid_message(message: impl Into<String>) -> Self {
        Self::InvalidMessage {
            message: message.into(),
        }
    }

    /// Classify the error.
    #[must_use]
    pub fn kind(&self) -> TransportErrorKind {
        match self {
            Self::Io(e) => match e.kind() {
                std::io::ErrorKind::ConnectionRefused
                | std::io::ErrorKind::AddrInUse
                | std::io::ErrorKind::AddrNotAvailable => TransportErrorKind::ConnectionFailed,
                std::io::ErrorKind::ConnectionReset
                | std::io::ErrorKind::ConnectionAborted
                | std::io::ErrorKind::BrokenPipe => TransportErrorKind::ConnectionClosed,
                std::io::ErrorKind::TimedOut => TransportErrorKind::Timeout,
                std::io::ErrorKind::WriteZero => TransportErrorKind::WriteFailed,
                _ => TransportErrorKind::ReadFailed,
            },
            Self::Json(_) | Self::InvalidMessage { .. } => TransportErrorKind::InvalidMessage,
            Self::Malformed(_) => TransportErrorKind::MalformedFrame,
            Self::Connection { .. } | Self::NotConnected => TransportErrorKind::ConnectionFailed,
            Self::ConnectionClosed => TransportErrorKind::ConnectionClosed,
            Self::Timeout { .. } => TransportErrorKind::Timeout,
        }
    }
}

impl From<TransportError> for CtxError {
    fn from(err: TransportError) -> Self {
        Self::Transport(Box::new(TransportDetails {
            kind: err.kind(),
            message: err.to_string(),
            context: TransportContext::default(),
            source: Some(Box::new(err)),
        }))
    }
}
