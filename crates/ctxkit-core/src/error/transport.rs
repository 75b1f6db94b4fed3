//! Transport failure classification.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What went wrong at the transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportErrorKind {
    /// The connection could not be established.
    ConnectionFailed,
    /// The connection closed while a call was in flight.
    ConnectionClosed,
    /// Reading from the connection failed.
    ReadFailed,
    /// Writing to the connection failed.
    WriteFailed,
    /// The operation timed out.
    Timeout,
    /// A frame of an unexpected type arrived.
    InvalidMessage,
    /// A frame arrived intact but did not hold a JSON-RPC message. The
    /// connection is still usable.
    MalformedFrame,
    /// The peer broke the framing protocol.
    ProtocolViolation,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::ConnectionFailed => "connection failed",
            Self::ConnectionClosed => "connection closed",
            Self::ReadFailed => "read failed",
            Self::WriteFailed => "write failed",
            Self::Timeout => "timeout",
            Self::InvalidMessage => "invalid message",
            Self::MalformedFrame => "malformed frame",
            Self::ProtocolViolation => "protocol violation",
        };
        f.write_str(text)
    }
}

/// Where a transport failure happened.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransportContext {
    /// Transport type (`memory`, `websocket`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport_type: Option<String>,
    /// Remote endpoint address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_addr: Option<String>,
}

impl TransportContext {
    /// Context for a transport type.
    #[must_use]
    pub fn new(transport_type: impl Into<String>) -> Self {
        Self {
            transport_type: Some(transport_type.into()),
            remote_addr: None,
        }
    }

    /// Set the remote address.
    #[must_use]
    pub fn with_remote_addr(mut self, addr: impl Into<String>) -> Self {
        self.remote_addr = Some(addr.into());
        self
    }
}
