//! JSON-RPC error codes.
//!
//! The standard JSON-RPC codes cover framing problems. Protocol-level
//! failures of the context session use the server range starting at
//! [`SERVER_ERROR_START`].

/// Invalid JSON was received.
pub const PARSE_ERROR: i32 = -32700;

/// The JSON sent is not a valid request object.
pub const INVALID_REQUEST: i32 = -32600;

/// The method does not exist.
pub const METHOD_NOT_FOUND: i32 = -32601;

/// Invalid method parameters.
pub const INVALID_PARAMS: i32 = -32602;

/// Internal JSON-RPC error.
pub const INTERNAL_ERROR: i32 = -32603;

/// Server error range start. Also used for transport failures.
pub const SERVER_ERROR_START: i32 = -32000;

/// Server error range end.
pub const SERVER_ERROR_END: i32 = -32099;

/// A handler raised an error while running.
pub const HANDLER_FAILURE: i32 = -32001;

/// No tool, resource or prompt with the requested name.
pub const NOT_FOUND: i32 = -32002;

/// A handler with the same name is already registered.
pub const DUPLICATE_REGISTRATION: i32 = -32003;

/// The session has not completed the `initialize` handshake.
pub const NOT_INITIALIZED: i32 = -32004;

/// `initialize` was called on an initialized session.
pub const ALREADY_INITIALIZED: i32 = -32005;

/// The session has been closed.
pub const SESSION_CLOSED: i32 = -32006;

/// The call exceeded its timeout.
pub const TIMEOUT: i32 = -32007;

/// The peer does not offer the capability.
pub const CAPABILITY_NOT_SUPPORTED: i32 = -32008;

/// The handshake could not be completed.
pub const HANDSHAKE_FAILED: i32 = -32009;
