//! Request routing.
//!
//! An incoming request is parsed into a [`ParsedRequest`] by method name,
//! then [`dispatch`] calls the matching [`Session`] operation and encodes
//! its result.
//!
//! # Methods
//!
//! - **Lifecycle**: `initialize`, `ping`
//! - **Tools**: `tools/list`, `tools/call`
//! - **Resources**: `resources/list`, `resources/read`,
//!   `resources/subscribe`, `resources/unsubscribe`
//! - **Prompts**: `prompts/list`, `prompts/get`
//! - **Logging**: `logging/setLevel`
//! - **Completions**: `completion/complete`

use bytes::Bytes;
use ctxkit_core::types::{CallParams, CompleteParams, OptionsParams, SetLevelParams, UriParams};
use ctxkit_core::{CtxError, InitializeRequest, Notification, Request, RequestOptions};
use serde::Serialize;
use serde_json::Value;

pub use ctxkit_core::protocol::{methods, notifications};

use crate::session::Session;

/// A request with its parameters decoded.
#[derive(Debug)]
pub enum ParsedRequest {
    /// `initialize`
    Initialize(InitializeRequest),
    /// `ping`
    Ping(OptionsParams),
    /// `tools/list`
    ToolsList(OptionsParams),
    /// `tools/call`
    ToolsCall(CallParams),
    /// `resources/list`
    ResourcesList(OptionsParams),
    /// `resources/read`
    ResourcesRead(CallParams),
    /// `resources/subscribe`
    ResourcesSubscribe(UriParams),
    /// `resources/unsubscribe`
    ResourcesUnsubscribe(UriParams),
    /// `prompts/list`
    PromptsList(OptionsParams),
    /// `prompts/get`
    PromptsGet(CallParams),
    /// `logging/setLevel`
    LoggingSetLevel(SetLevelParams),
    /// `completion/complete`
    CompletionComplete(CompleteParams),
    /// Anything else.
    Unknown(String),
}

/// Decode a request's parameters according to its method.
///
/// Unknown methods parse to [`ParsedRequest::Unknown`]; malformed
/// parameters fail with [`CtxError::InvalidParams`].
pub fn parse_request(request: &Request) -> Result<ParsedRequest, CtxError> {
    let parsed = match request.method() {
        methods::INITIALIZE => ParsedRequest::Initialize(request.params_as()?),
        methods::PING => ParsedRequest::Ping(request.params_as()?),
        methods::TOOLS_LIST => ParsedRequest::ToolsList(request.params_as()?),
        methods::TOOLS_CALL => ParsedRequest::ToolsCall(request.params_as()?),
        methods::RESOURCES_LIST => ParsedRequest::ResourcesList(request.params_as()?),
        methods::RESOURCES_READ => ParsedRequest::ResourcesRead(request.params_as()?),
        methods::RESOURCES_SUBSCRIBE => ParsedRequest::ResourcesSubscribe(request.params_as()?),
        methods::RESOURCES_UNSUBSCRIBE => {
            ParsedRequest::ResourcesUnsubscribe(request.params_as()?)
        }
        methods::PROMPTS_LIST => ParsedRequest::PromptsList(request.params_as()?),
        methods::PROMPTS_GET => ParsedRequest::PromptsGet(request.params_as()?),
        methods::LOGGING_SET_LEVEL => ParsedRequest::LoggingSetLevel(request.params_as()?),
        methods::COMPLETION_COMPLETE => ParsedRequest::CompletionComplete(request.params_as()?),
        other => ParsedRequest::Unknown(other.to_string()),
    };
    Ok(parsed)
}

/// Run a request against a session and encode the result.
pub async fn dispatch(session: &Session, request: &Request) -> Result<Value, CtxError> {
    match parse_request(request)? {
        ParsedRequest::Initialize(params) => encode(session.initialize(params)?),
        ParsedRequest::Ping(params) => encode(session.ping(options(params.options))?),
        ParsedRequest::ToolsList(params) => encode(session.list_tools(options(params.options))?),
        ParsedRequest::ToolsCall(params) => {
            let payload = Bytes::from(params.payload());
            encode(
                session
                    .call_tool(&params.name, payload, options(params.options))
                    .await?,
            )
        }
        ParsedRequest::ResourcesList(params) => {
            encode(session.list_resources(options(params.options))?)
        }
        ParsedRequest::ResourcesRead(params) => {
            let payload = Bytes::from(params.payload());
            encode(
                session
                    .read_resource(&params.name, payload, options(params.options))
                    .await?,
            )
        }
        ParsedRequest::ResourcesSubscribe(params) => {
            session
                .subscribe_resource(&params.uri, options(params.options))
                .await?;
            Ok(empty())
        }
        ParsedRequest::ResourcesUnsubscribe(params) => {
            session
                .unsubscribe_resource(&params.uri, options(params.options))
                .await?;
            Ok(empty())
        }
        ParsedRequest::PromptsList(params) => {
            encode(session.list_prompts(options(params.options))?)
        }
        ParsedRequest::PromptsGet(params) => {
            let payload = Bytes::from(params.payload());
            encode(
                session
                    .get_prompt(&params.name, payload, options(params.options))
                    .await?,
            )
        }
        ParsedRequest::LoggingSetLevel(params) => {
            session
                .set_logging_level(params.level, options(params.options))
                .await?;
            Ok(empty())
        }
        ParsedRequest::CompletionComplete(params) => {
            let payload = Bytes::from(params.payload());
            encode(session.complete(payload, options(params.options)).await?)
        }
        ParsedRequest::Unknown(method) => Err(CtxError::method_not_found(method)),
    }
}

/// Handle a notification from the client.
pub async fn handle_notification(session: &Session, notification: &Notification) {
    match notification.method() {
        notifications::INITIALIZED => {
            tracing::debug!(session = %session.id(), "client confirmed initialization");
        }
        notifications::ROOTS_LIST_CHANGED => session.on_roots_list_changed().await,
        other => tracing::debug!(session = %session.id(), method = %other, "ignoring notification"),
    }
}

fn options(options: Option<RequestOptions>) -> RequestOptions {
    options.unwrap_or_default()
}

fn encode<T: Serialize>(value: T) -> Result<Value, CtxError> {
    serde_json::to_value(value)
        .map_err(|e| CtxError::internal_with_source("failed to encode result", e))
}

fn empty() -> Value {
    Value::Object(serde_json::Map::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::EchoTool;
    use crate::config::ServerConfig;
    use crate::handler::Typed;
    use crate::state::ServerState;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;

    fn make_request(method: &'static str, params: Option<Value>) -> Request {
        match params {
            Some(p) => Request::with_params(method, 1u64, p),
            None => Request::new(method, 1u64),
        }
    }

    fn session() -> Session {
        let state = Arc::new(ServerState::new(ServerConfig::default()));
        state.tools().register(Arc::new(Typed(EchoTool))).unwrap();
        Session::new(state)
    }

    async fn initialized() -> Session {
        let session = session();
        let request = make_request(
            "initialize",
            Some(json!({
                "protocolVersion": "2024-11-05",
                "clientInfo": {"name": "test-client", "version": "1.0.0"}
            })),
        );
        let result = dispatch(&session, &request).await.unwrap();
        assert_eq!(result["protocolVersion"], json!("2024-11-05"));
        session
    }

    #[test]
    fn test_parse_ping_without_params() {
        let parsed = parse_request(&make_request("ping", None)).unwrap();
        assert!(matches!(parsed, ParsedRequest::Ping(OptionsParams { options: None })));
    }

    #[test]
    fn test_parse_tools_call() {
        let request = make_request(
            "tools/call",
            Some(json!({"name": "echo", "arguments": {"data": "x"}, "options": {"timeout": 1.5}})),
        );
        let ParsedRequest::ToolsCall(params) = parse_request(&request).unwrap() else {
            panic!("expected tools/call");
        };
        assert_eq!(params.name, "echo");
        assert_eq!(
            params.options.unwrap().timeout,
            Some(std::time::Duration::from_millis(1500))
        );
    }

    #[test]
    fn test_parse_missing_name_is_invalid_params() {
        let err = parse_request(&make_request("tools/call", Some(json!({})))).unwrap_err();
        assert!(matches!(
            err,
            CtxError::InvalidParams { ref method, .. } if method == "tools/call"
        ));
    }

    #[test]
    fn test_parse_unknown_method() {
        let parsed = parse_request(&make_request("unknown/method", None)).unwrap();
        assert!(matches!(parsed, ParsedRequest::Unknown(ref m) if m == "unknown/method"));
    }

    #[tokio::test]
    async fn test_dispatch_echo() {
        let session = initialized().await;
        let request = make_request(
            "tools/call",
            Some(json!({"name": "echo", "arguments": {"data": "Hello, World!"}})),
        );
        assert_eq!(dispatch(&session, &request).await.unwrap(), json!("Hello, World!"));
    }

    #[tokio::test]
    async fn test_dispatch_ping_and_list() {
        let session = initialized().await;
        assert_eq!(
            dispatch(&session, &make_request("ping", None)).await.unwrap(),
            json!("pong")
        );
        let listing = dispatch(&session, &make_request("tools/list", None)).await.unwrap();
        assert_eq!(listing["results"][0]["name"], json!("echo"));
        assert_eq!(listing["next"], Value::Null);
    }

    #[tokio::test]
    async fn test_dispatch_set_level_returns_empty_object() {
        let session = initialized().await;
        let request = make_request("logging/setLevel", Some(json!({"level": "critical"})));
        assert_eq!(dispatch(&session, &request).await.unwrap(), json!({}));
    }

    #[tokio::test]
    async fn test_dispatch_unknown_method() {
        let session = initialized().await;
        let err = dispatch(&session, &make_request("tasks/list", None))
            .await
            .unwrap_err();
        assert!(matches!(err, CtxError::MethodNotFound { .. }));
    }

    #[tokio::test]
    async fn test_roots_notification_counts() {
        let session = initialized().await;
        handle_notification(&session, &Notification::new(notifications::ROOTS_LIST_CHANGED)).await;
        assert_eq!(session.roots_changed_count(), 1);
    }
}
