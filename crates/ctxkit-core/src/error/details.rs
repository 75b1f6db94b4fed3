//! Boxed detail records for the larger error variants.

use std::fmt;

use super::transport::{TransportContext, TransportErrorKind};

/// A boxed, thread-safe error.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Details of a transport failure.
#[derive(Debug)]
pub struct TransportDetails {
    /// Failure classification.
    pub kind: TransportErrorKind,
    /// Human-readable message.
    pub message: String,
    /// Where it happened.
    pub context: TransportContext,
    /// Underlying error.
    pub source: Option<BoxError>,
}

impl fmt::Display for TransportDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for TransportDetails {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Details of a failed handshake.
#[derive(Debug)]
pub struct HandshakeDetails {
    /// Human-readable message.
    pub message: String,
    /// Protocol version the client asked for.
    pub client_version: Option<String>,
    /// Protocol version the server answered with.
    pub server_version: Option<String>,
    /// Underlying error.
    pub source: Option<BoxError>,
}

impl fmt::Display for HandshakeDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for HandshakeDetails {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}
