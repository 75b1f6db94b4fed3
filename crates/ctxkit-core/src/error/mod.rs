//! Error handling for the context protocol.
//!
//! Every failure flows through [`CtxError`]. Two groups matter to callers:
//!
//! - **Session errors** (`NotFound`, `HandlerFailure`, `Timeout`,
//!   `NotInitialized`, ...) are answered as JSON-RPC errors and leave the
//!   connection open. [`CtxError::is_recoverable`] returns `true` for them.
//! - **Transport errors** end the connection.
//!
//! On the wire, structured variants carry a `data` object tagged by `kind`
//! so [`CtxError::from_rpc`] can restore the variant on the client side.
//!
//! ```rust
//! use ctxkit_core::error::{CtxError, JsonRpcError};
//! use ctxkit_core::types::HandlerKind;
//!
//! let wire = JsonRpcError::from(CtxError::not_found(HandlerKind::Tool, "nope"));
//! assert_eq!(wire.message, "Tool nope not found");
//!
//! let back = CtxError::from_rpc(wire);
//! assert!(matches!(back, CtxError::NotFound { kind: HandlerKind::Tool, .. }));
//! ```

mod codes;
mod context;
mod details;
mod jsonrpc;
mod transport;
mod types;

pub use codes::*;
pub use context::CtxResultExt;
pub use details::{BoxError, HandshakeDetails, TransportDetails};
pub use jsonrpc::JsonRpcError;
pub use transport::{TransportContext, TransportErrorKind};
pub use types::CtxError;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HandlerKind;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    #[test]
    fn test_error_codes() {
        assert_eq!(CtxError::parse("bad").code(), PARSE_ERROR);
        assert_eq!(CtxError::method_not_found("x").code(), METHOD_NOT_FOUND);
        assert_eq!(
            CtxError::not_found(HandlerKind::Prompt, "p").code(),
            NOT_FOUND
        );
        assert_eq!(CtxError::not_initialized("tools/list").code(), NOT_INITIALIZED);
        assert_eq!(
            CtxError::timeout("tools/call", Duration::from_secs(1)).code(),
            TIMEOUT
        );
    }

    #[test]
    fn test_not_found_display() {
        assert_eq!(
            CtxError::not_found(HandlerKind::Tool, "nope").to_string(),
            "Tool nope not found"
        );
        assert_eq!(
            CtxError::not_found(HandlerKind::Resource, "file:///x").to_string(),
            "Resource file:///x not found"
        );
    }

    #[test]
    fn test_duplicate_display() {
        let err = CtxError::duplicate(HandlerKind::Tool, "echo");
        assert_eq!(err.to_string(), "Tool 'echo' is already registered");
    }

    #[test]
    fn test_structured_roundtrip() {
        let cases = vec![
            CtxError::handler_failure(HandlerKind::Tool, "div", "division by zero"),
            CtxError::timeout("tools/call slow", Duration::from_millis(250)),
            CtxError::not_initialized("resources/list"),
            CtxError::capability_not_supported("completions"),
            CtxError::AlreadyInitialized,
            CtxError::SessionClosed,
        ];

        for original in cases {
            let code = original.code();
            let text = original.to_string();
            let back = CtxError::from_rpc(JsonRpcError::from(&original));
            assert_eq!(back.code(), code);
            assert_eq!(back.to_string(), text);
        }
    }

    #[test]
    fn test_context_preserves_code_and_data() {
        let err = CtxError::WithContext {
            context: "while calling".to_string(),
            source: Box::new(CtxError::not_found(HandlerKind::Tool, "nope")),
        };
        assert_eq!(err.code(), NOT_FOUND);
        assert!(matches!(err.root(), CtxError::NotFound { .. }));

        let back = CtxError::from_rpc(JsonRpcError::from(&err));
        assert!(matches!(back, CtxError::NotFound { ref name, .. } if name == "nope"));
    }

    #[test]
    fn test_unknown_code_falls_back_to_internal() {
        let back = CtxError::from_rpc(JsonRpcError::new(-31000, "odd"));
        assert!(matches!(back, CtxError::Internal { ref message, .. } if message == "odd"));
    }

    #[test]
    fn test_recoverable() {
        assert!(CtxError::not_found(HandlerKind::Tool, "x").is_recoverable());
        assert!(CtxError::timeout("x", Duration::from_secs(1)).is_recoverable());
        let closed = CtxError::transport(TransportErrorKind::ConnectionClosed, "gone");
        assert!(!closed.is_recoverable());
        assert!(!CtxError::SessionClosed.is_recoverable());
    }

    #[test]
    fn test_malformed_frame_is_recoverable() {
        let err = CtxError::transport(TransportErrorKind::MalformedFrame, "expected value");
        assert!(err.is_malformed_frame());
        assert!(err.is_recoverable());

        let wrapped = CtxError::WithContext {
            context: "while reading".to_string(),
            source: Box::new(err),
        };
        assert!(wrapped.is_malformed_frame());

        let closed = CtxError::transport(TransportErrorKind::ConnectionClosed, "gone");
        assert!(!closed.is_malformed_frame());
    }

    #[test]
    fn test_io_error_maps_to_transport() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe");
        match CtxError::from(io) {
            CtxError::Transport(details) => {
                assert_eq!(details.kind, TransportErrorKind::ConnectionClosed);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
