//! JSON-RPC 2.0 framing.
//!
//! Every exchange between a context client and server is one of three
//! message shapes:
//!
//! - **Request**: a method call carrying an id; answered by exactly one response
//! - **Response**: the result or error for the request with the same id
//! - **Notification**: a one-way message without an id
//!
//! # Example
//!
//! ```rust
//! use ctxkit_core::protocol::{Message, Request};
//!
//! let request = Request::with_params("tools/call", 7u64, serde_json::json!({"name": "echo"}));
//! let wire = serde_json::to_string(&Message::from(request)).unwrap();
//! let parsed: Message = serde_json::from_str(&wire).unwrap();
//! assert_eq!(parsed.method(), Some("tools/call"));
//! ```

use crate::error::{CtxError, JsonRpcError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// The JSON-RPC version string carried by every message.
pub const JSONRPC_VERSION: &str = "2.0";

/// Method names.
pub mod methods {
    /// Open the session and negotiate capabilities.
    pub const INITIALIZE: &str = "initialize";
    /// Liveness probe.
    pub const PING: &str = "ping";

    /// List tools.
    pub const TOOLS_LIST: &str = "tools/list";
    /// Call a tool.
    pub const TOOLS_CALL: &str = "tools/call";

    /// List resources.
    pub const RESOURCES_LIST: &str = "resources/list";
    /// Read a resource.
    pub const RESOURCES_READ: &str = "resources/read";
    /// Subscribe to updates of a resource.
    pub const RESOURCES_SUBSCRIBE: &str = "resources/subscribe";
    /// Unsubscribe from updates of a resource.
    pub const RESOURCES_UNSUBSCRIBE: &str = "resources/unsubscribe";

    /// List prompts.
    pub const PROMPTS_LIST: &str = "prompts/list";
    /// Render a prompt.
    pub const PROMPTS_GET: &str = "prompts/get";

    /// Set the session's logging level.
    pub const LOGGING_SET_LEVEL: &str = "logging/setLevel";

    /// Request a completion.
    pub const COMPLETION_COMPLETE: &str = "completion/complete";
}

/// Notification names.
pub mod notifications {
    /// Sent by the client once the handshake completed.
    pub const INITIALIZED: &str = "notifications/initialized";
    /// Sent by the client when its roots changed.
    pub const ROOTS_LIST_CHANGED: &str = "notifications/roots/list_changed";
    /// Sent by the server to each subscriber of a changed resource.
    pub const RESOURCES_UPDATED: &str = "notifications/resources/updated";
    /// Sent by the server to deliver a log message.
    pub const MESSAGE: &str = "notifications/message";
}

/// Identifier correlating a request with its response.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric id, used by the bundled client.
    Number(u64),
    /// String id.
    String(String),
    /// Serialized as `null`; answers a frame whose id could not be read.
    Null,
}

impl From<u64> for RequestId {
    fn from(id: u64) -> Self {
        Self::Number(id)
    }
}

impl From<String> for RequestId {
    fn from(id: String) -> Self {
        Self::String(id)
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        Self::String(id.to_string())
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => f.write_str(s),
            Self::Null => f.write_str("null"),
        }
    }
}

/// A method call expecting a response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Always `"2.0"`.
    pub jsonrpc: Cow<'static, str>,
    /// Correlation id echoed by the response.
    pub id: RequestId,
    /// Method name, e.g. `tools/call`.
    pub method: Cow<'static, str>,
    /// Method parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl Request {
    /// Create a request without parameters.
    #[must_use]
    pub fn new(method: impl Into<Cow<'static, str>>, id: impl Into<RequestId>) -> Self {
        Self {
            jsonrpc: Cow::Borrowed(JSONRPC_VERSION),
            id: id.into(),
            method: method.into(),
            params: None,
        }
    }

    /// Create a request with parameters.
    #[must_use]
    pub fn with_params(
        method: impl Into<Cow<'static, str>>,
        id: impl Into<RequestId>,
        params: serde_json::Value,
    ) -> Self {
        Self {
            params: Some(params),
            ..Self::new(method, id)
        }
    }

    /// The method name.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Decode the parameters into `T`.
    ///
    /// Absent parameters decode from an empty object, so parameter structs
    /// whose fields are all optional accept a bare request.
    pub fn params_as<T: DeserializeOwned>(&self) -> Result<T, CtxError> {
        let value = self
            .params
            .clone()
            .unwrap_or_else(|| serde_json::Value::Object(serde_json::Map::new()));
        serde_json::from_value(value)
            .map_err(|e| CtxError::invalid_params(self.method.as_ref(), e.to_string()))
    }
}

/// The reply to a [`Request`]: either a result or an error, never both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Always `"2.0"`.
    pub jsonrpc: Cow<'static, str>,
    /// Id of the request being answered.
    pub id: RequestId,
    /// Result on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// Error on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl Response {
    /// Create a successful response.
    #[must_use]
    pub fn success(id: impl Into<RequestId>, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: Cow::Borrowed(JSONRPC_VERSION),
            id: id.into(),
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
    #[must_use]
    pub fn error(id: impl Into<RequestId>, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: Cow::Borrowed(JSONRPC_VERSION),
            id: id.into(),
            result: None,
            error: Some(error),
        }
    }

    /// Whether this response carries an error.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Convert into the carried result, mapping wire errors back into [`CtxError`].
    pub fn into_result(self) -> Result<serde_json::Value, CtxError> {
        match (self.result, self.error) {
            (_, Some(error)) => Err(CtxError::from_rpc(error)),
            (Some(result), None) => Ok(result),
            (None, None) => Err(CtxError::internal(
                "Response contained neither result nor error",
            )),
        }
    }
}

/// A one-way message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    /// Always `"2.0"`.
    pub jsonrpc: Cow<'static, str>,
    /// Notification method, e.g. `notifications/resources/updated`.
    pub method: Cow<'static, str>,
    /// Notification parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl Notification {
    /// Create a notification without parameters.
    #[must_use]
    pub fn new(method: impl Into<Cow<'static, str>>) -> Self {
        Self {
            jsonrpc: Cow::Borrowed(JSONRPC_VERSION),
            method: method.into(),
            params: None,
        }
    }

    /// Create a notification with parameters.
    #[must_use]
    pub fn with_params(method: impl Into<Cow<'static, str>>, params: serde_json::Value) -> Self {
        Self {
            params: Some(params),
            ..Self::new(method)
        }
    }

    /// The method name.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }
}

/// Any JSON-RPC message.
///
/// Variant order matters for untagged decoding: a request is tried before a
/// response, and a notification (no id) last.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
    /// A request.
    Request(Request),
    /// A response.
    Response(Response),
    /// A notification.
    Notification(Notification),
}

impl Message {
    /// Method name for requests and notifications.
    #[must_use]
    pub fn method(&self) -> Option<&str> {
        match self {
            Self::Request(r) => Some(&r.method),
            Self::Notification(n) => Some(&n.method),
            Self::Response(_) => None,
        }
    }

    /// Correlation id for requests and responses.
    #[must_use]
    pub const fn id(&self) -> Option<&RequestId> {
        match self {
            Self::Request(r) => Some(&r.id),
            Self::Response(r) => Some(&r.id),
            Self::Notification(_) => None,
        }
    }

    /// Whether this is a request.
    #[must_use]
    pub const fn is_request(&self) -> bool {
        matches!(self, Self::Request(_))
    }

    /// Whether this is a response.
    #[must_use]
    pub const fn is_response(&self) -> bool {
        matches!(self, Self::Response(_))
    }

    /// Whether this is a notification.
    #[must_use]
    pub const fn is_notification(&self) -> bool {
        matches!(self, Self::Notification(_))
    }
}

impl From<Request> for Message {
    fn from(r: Request) -> Self {
        Self::Request(r)
    }
}

impl From<Response> for Message {
    fn from(r: Response) -> Self {
        Self::Response(r)
    }
}

impl From<Notification> for Message {
    fn from(n: Notification) -> Self {
        Self::Notification(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HandlerKind;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_request_wire_shape() {
        let request = Request::with_params("tools/call", 1u64, json!({"name": "echo"}));
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({"jsonrpc": "2.0", "id": 1, "method": "tools/call", "params": {"name": "echo"}})
        );
    }

    #[test]
    fn test_request_without_params_omits_field() {
        let json = serde_json::to_string(&Request::new("ping", "req-1")).unwrap();
        assert!(!json.contains("params"));
        assert!(json.contains("\"id\":\"req-1\""));
    }

    #[test]
    fn test_params_as_defaults_to_empty_object() {
        #[derive(Deserialize)]
        struct Optional {
            cursor: Option<String>,
        }

        let parsed: Optional = Request::new("tools/list", 1u64).params_as().unwrap();
        assert!(parsed.cursor.is_none());
    }

    #[test]
    fn test_params_as_reports_invalid_params() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Named {
            name: String,
        }

        let err = Request::with_params("tools/call", 1u64, json!({"nom": "echo"}))
            .params_as::<Named>()
            .unwrap_err();
        assert!(matches!(
            err,
            CtxError::InvalidParams { ref method, .. } if method == "tools/call"
        ));
    }

    #[test]
    fn test_response_into_result() {
        let ok = Response::success(1u64, json!("pong"));
        assert_eq!(ok.into_result().unwrap(), json!("pong"));

        let err = Response::error(2u64, (&CtxError::not_found(HandlerKind::Tool, "nope")).into());
        assert!(matches!(
            err.into_result(),
            Err(CtxError::NotFound { kind: HandlerKind::Tool, ref name }) if name == "nope"
        ));
    }

    #[test]
    fn test_message_discrimination() {
        let msg: Message =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#).unwrap();
        assert!(msg.is_request());

        let msg: Message =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"result":"pong"}"#).unwrap();
        assert!(msg.is_response());

        let msg: Message = serde_json::from_str(
            r#"{"jsonrpc":"2.0","method":"notifications/roots/list_changed"}"#,
        )
        .unwrap();
        assert!(msg.is_notification());
        assert!(msg.id().is_none());
    }

    #[test]
    fn test_parse_error_response_carries_null_id() {
        let err = CtxError::parse("expected value at line 1 column 2");
        let response = Response::error(RequestId::Null, (&err).into());
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["id"], serde_json::Value::Null);
        assert_eq!(value["error"]["code"], json!(-32700));
        assert_eq!(RequestId::Null.to_string(), "null");

        let back: Message = serde_json::from_value(value).unwrap();
        assert!(back.is_response());
        assert_eq!(back.id(), Some(&RequestId::Null));
    }
}
