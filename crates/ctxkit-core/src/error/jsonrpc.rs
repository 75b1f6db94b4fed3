//! JSON-RPC error object and the conversions to and from [`CtxError`].
//!
//! Structured failures carry a `data` object tagged by `kind`, so a client
//! can rebuild the exact variant the server raised instead of matching on
//! message text.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::codes;
use super::transport::TransportErrorKind;
use super::types::CtxError;
use crate::types::HandlerKind;

/// A JSON-RPC error response object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Error code.
    pub code: i32,
    /// Error message.
    pub message: String,
    /// Additional error data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl JsonRpcError {
    /// Create an error with an arbitrary code.
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Create an "invalid params" error (-32602).
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(codes::INVALID_PARAMS, message)
    }

    /// Create an "internal error" (-32603).
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(codes::INTERNAL_ERROR, message)
    }

    /// Create a "method not found" error (-32601).
    pub fn method_not_found(message: impl Into<String>) -> Self {
        Self::new(codes::METHOD_NOT_FOUND, message)
    }

    /// Create a "parse error" (-32700).
    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::new(codes::PARSE_ERROR, message)
    }

    /// Create an "invalid request" error (-32600).
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(codes::INVALID_REQUEST, message)
    }
}

impl std::fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

/// The `data` member of structured errors.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum ErrorData {
    NotFound {
        handler: HandlerKind,
        name: String,
    },
    HandlerFailure {
        handler: HandlerKind,
        name: String,
        message: String,
    },
    DuplicateRegistration {
        handler: HandlerKind,
        name: String,
    },
    Timeout {
        operation: String,
        duration_ms: u64,
    },
    NotInitialized {
        method: String,
    },
    AlreadyInitialized,
    SessionClosed,
    CapabilityNotSupported {
        capability: String,
    },
    Transport {
        transport_kind: TransportErrorKind,
    },
    Handshake {
        client_version: Option<String>,
        server_version: Option<String>,
    },
    MethodNotFound {
        method: String,
    },
    InvalidParams {
        method: String,
    },
}

impl ErrorData {
    fn of(err: &CtxError) -> Option<Self> {
        let data = match err {
            CtxError::NotFound { kind, name } => Self::NotFound {
                handler: *kind,
                name: name.clone(),
            },
            CtxError::HandlerFailure {
                kind,
                name,
                message,
            } => Self::HandlerFailure {
                handler: *kind,
                name: name.clone(),
                message: message.clone(),
            },
            CtxError::DuplicateRegistration { kind, name } => Self::DuplicateRegistration {
                handler: *kind,
                name: name.clone(),
            },
            CtxError::Timeout {
                operation,
                duration,
            } => Self::Timeout {
                operation: operation.clone(),
                duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
            },
            CtxError::NotInitialized { method } => Self::NotInitialized {
                method: method.clone(),
            },
            CtxError::AlreadyInitialized => Self::AlreadyInitialized,
            CtxError::SessionClosed => Self::SessionClosed,
            CtxError::CapabilityNotSupported { capability } => Self::CapabilityNotSupported {
                capability: capability.clone(),
            },
            CtxError::Transport(details) => Self::Transport {
                transport_kind: details.kind,
            },
            CtxError::HandshakeFailed(details) => Self::Handshake {
                client_version: details.client_version.clone(),
                server_version: details.server_version.clone(),
            },
            CtxError::MethodNotFound { method } => Self::MethodNotFound {
                method: method.clone(),
            },
            CtxError::InvalidParams { method, .. } => Self::InvalidParams {
                method: method.clone(),
            },
            CtxError::WithContext { source, .. } => return Self::of(source),
            CtxError::Parse { .. }
            | CtxError::InvalidRequest { .. }
            | CtxError::Internal { .. } => return None,
        };
        Some(data)
    }

    fn into_error(self, message: String) -> CtxError {
        match self {
            Self::NotFound { handler, name } => CtxError::not_found(handler, name),
            Self::HandlerFailure {
                handler,
                name,
                message,
            } => CtxError::handler_failure(handler, name, message),
            Self::DuplicateRegistration { handler, name } => CtxError::duplicate(handler, name),
            Self::Timeout {
                operation,
                duration_ms,
            } => CtxError::timeout(operation, Duration::from_millis(duration_ms)),
            Self::NotInitialized { method } => CtxError::not_initialized(method),
            Self::AlreadyInitialized => CtxError::AlreadyInitialized,
            Self::SessionClosed => CtxError::SessionClosed,
            Self::CapabilityNotSupported { capability } => {
                CtxError::capability_not_supported(capability)
            }
            Self::Transport { transport_kind } => CtxError::transport(transport_kind, message),
            Self::Handshake {
                client_version,
                server_version,
            } => CtxError::handshake_failed_with_versions(message, client_version, server_version),
            Self::MethodNotFound { method } => CtxError::method_not_found(method),
            Self::InvalidParams { method } => CtxError::invalid_params(method, message),
        }
    }
}

impl From<&CtxError> for JsonRpcError {
    fn from(err: &CtxError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
            data: ErrorData::of(err).and_then(|data| serde_json::to_value(data).ok()),
        }
    }
}

impl From<CtxError> for JsonRpcError {
    fn from(err: CtxError) -> Self {
        Self::from(&err)
    }
}

impl CtxError {
    /// Rebuild an error received over the wire.
    ///
    /// Structured `data` restores the original variant. Without it the code
    /// decides, and codes outside the known set become [`CtxError::Internal`].
    #[must_use]
    pub fn from_rpc(error: JsonRpcError) -> Self {
        let JsonRpcError {
            code,
            message,
            data,
        } = error;

        if let Some(data) = data.and_then(|d| serde_json::from_value::<ErrorData>(d).ok()) {
            return data.into_error(message);
        }

        match code {
            codes::PARSE_ERROR => Self::parse(message),
            codes::INVALID_REQUEST => Self::invalid_request(message),
            codes::METHOD_NOT_FOUND => Self::method_not_found(message),
            codes::INVALID_PARAMS => Self::invalid_params("", message),
            codes::ALREADY_INITIALIZED => Self::AlreadyInitialized,
            codes::SESSION_CLOSED => Self::SessionClosed,
            codes::HANDSHAKE_FAILED => Self::handshake_failed(message),
            _ => Self::internal(message),
        }
    }
}
