//! Client against a real server session over the in-memory transport.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use ctxkit_client::{ClientBuilder, ContextClient};
use ctxkit_core::protocol::notifications;
use ctxkit_core::{CtxError, Envelope, HandlerKind, LoggingLevel, RequestOptions};
use ctxkit_server::builtin::{EchoTool, FnResource, TemplatePrompt};
use ctxkit_server::{
    Completion, ConnectionRuntime, ContextServer, HandlerError, HandlerResult, ServerConfig,
    Session, TransportPeer, Typed,
};
use ctxkit_transport::MemoryTransport;
use futures::future::BoxFuture;
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::time::timeout;
use url::Url;

const WAIT: Duration = Duration::from_secs(5);

struct Upper;

impl Completion for Upper {
    fn complete(&self, payload: Bytes, _options: RequestOptions) -> BoxFuture<'_, HandlerResult> {
        Box::pin(async move {
            let prefix: String = serde_json::from_slice(&payload)?;
            Ok(prefix.to_uppercase())
        })
    }
}

fn server() -> ContextServer {
    let server = ContextServer::new(
        ServerConfig::default().with_instructions("Try the echo tool."),
    );
    server.register_tool(Typed(EchoTool)).unwrap();
    server
        .register_resource(FnResource::new(
            "clock",
            Url::parse("mem://clock").unwrap(),
            |(): ()| async { Ok::<_, HandlerError>(42) },
        ))
        .unwrap();
    server
        .register_prompt(TemplatePrompt::new("greet", "Hello, {name}!"))
        .unwrap();
    server
}

async fn connect(server: &ContextServer) -> ContextClient<MemoryTransport> {
    let (client_end, server_end) = MemoryTransport::pair();
    let server = server.clone();
    tokio::spawn(async move { server.serve(server_end).await });
    timeout(WAIT, ClientBuilder::new().name("test-client").build(client_end))
        .await
        .expect("handshake timed out")
        .expect("handshake failed")
}

// =============================================================================
// Bootstrap
// =============================================================================

#[tokio::test]
async fn handshake_stores_server_metadata() {
    let client = connect(&server()).await;

    assert_eq!(client.server_info().name, "Context Server");
    assert_eq!(client.protocol_version(), "2025-02-17");
    assert_eq!(client.instructions(), Some("Try the echo tool."));
    assert!(client.has_capability("tools"));
    assert!(!client.has_capability("completions"));
    assert!(client.banner().contains("Server: Context Server [1.0]"));
    assert!(client.banner().contains("Instructions: Try the echo tool."));
    assert!(client.is_connected());
}

#[tokio::test]
async fn handshake_failure_returns_no_client() {
    let (client_end, server_end) = MemoryTransport::pair();
    drop(server_end);
    let result = ClientBuilder::new().build(client_end).await;
    assert!(result.is_err());
}

// =============================================================================
// Operations
// =============================================================================

#[tokio::test]
async fn echo_over_the_wire() {
    let client = connect(&server()).await;
    let options = RequestOptions::default();

    assert_eq!(client.ping(options).await.unwrap(), "pong");

    let echoed = client
        .call_tool("echo", &Envelope::new("Hello, World!"), options)
        .await
        .unwrap();
    assert_eq!(echoed, "Hello, World!");

    let raw = client
        .call_tool_bytes("echo", br#"{"data":"raw"}"#, options)
        .await
        .unwrap();
    assert_eq!(raw, "raw");
}

#[tokio::test]
async fn listings_are_sorted_and_typed() {
    let server = server();
    server
        .register_prompt(TemplatePrompt::new("aaa", "first"))
        .unwrap();
    let client = connect(&server).await;
    let options = RequestOptions::default();

    let tools = client.list_tools(options).await.unwrap();
    assert_eq!(tools.ids(), vec!["echo"]);
    assert!(tools.results[0].input_schema.is_some());

    let resources = client.list_resources(options).await.unwrap();
    assert_eq!(resources.results[0].uri.as_str(), "mem://clock");

    let prompts = client.list_prompts(options).await.unwrap();
    assert_eq!(prompts.to_string(), "aaa, greet");
    assert_eq!(prompts.next, None);
}

#[tokio::test]
async fn server_errors_arrive_structured() {
    let client = connect(&server()).await;
    let options = RequestOptions::default();

    let err = client
        .call_tool("nope", &Envelope::new("x"), options)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CtxError::NotFound { kind: HandlerKind::Tool, ref name } if name == "nope"
    ));
    assert_eq!(err.to_string(), "Tool nope not found");

    let err = client
        .call_tool("echo", &json!({"wrong": true}), options)
        .await
        .unwrap_err();
    assert!(matches!(err, CtxError::HandlerFailure { kind: HandlerKind::Tool, .. }));

    let err = client.complete(&"abc", options).await.unwrap_err();
    assert!(matches!(err, CtxError::CapabilityNotSupported { .. }));
}

#[tokio::test]
async fn resources_prompts_and_completion() {
    let server = server();
    server.set_completion(Upper);
    let client = connect(&server).await;
    let options = RequestOptions::default();

    assert_eq!(client.read_resource("clock", options).await.unwrap(), "42");
    assert_eq!(
        client
            .get_prompt("greet", &json!({"name": "Ada"}), options)
            .await
            .unwrap(),
        "Hello, Ada!"
    );
    assert_eq!(client.complete(&"abc", options).await.unwrap(), "ABC");
}

#[tokio::test]
async fn every_logging_level_is_accepted() {
    let client = connect(&server()).await;
    for level in LoggingLevel::ALL {
        client
            .set_logging_level(level, RequestOptions::default())
            .await
            .unwrap();
    }
    assert_eq!(client.list_tools(RequestOptions::default()).await.unwrap().len(), 1);
}

// =============================================================================
// Notifications
// =============================================================================

#[tokio::test]
async fn subscribed_client_receives_updates() {
    let server = server();
    let client = connect(&server).await;
    let mut updates = client.notifications();

    client
        .subscribe_resource("mem://clock", RequestOptions::default())
        .await
        .unwrap();
    assert_eq!(server.notify_resource_updated("mem://clock").await, 1);

    let notification = timeout(WAIT, updates.recv()).await.unwrap().unwrap();
    assert_eq!(notification.method(), notifications::RESOURCES_UPDATED);
    assert_eq!(notification.params, Some(json!({"uri": "mem://clock"})));

    client
        .unsubscribe_resource("mem://clock", RequestOptions::default())
        .await
        .unwrap();
    assert_eq!(server.notify_resource_updated("mem://clock").await, 0);
}

#[tokio::test]
async fn roots_changes_reach_the_server_session() {
    let server = server();
    let (client_end, server_end) = MemoryTransport::pair();
    let server_end = Arc::new(server_end);
    let session = Arc::new(Session::with_peer(
        Arc::clone(server.state()),
        Arc::new(TransportPeer::new(Arc::clone(&server_end))),
    ));
    let runtime = ConnectionRuntime::new(server_end, Arc::clone(&session));
    tokio::spawn(async move { runtime.run().await });

    let client = ClientBuilder::new().with_roots().build(client_end).await.unwrap();
    client.send_roots_list_changed().await.unwrap();
    client.send_roots_list_changed().await.unwrap();
    // Requests and notifications are read in order, so a ping flushes both.
    client.ping(RequestOptions::default()).await.unwrap();

    assert_eq!(session.roots_changed_count(), 2);
    assert!(session.client().unwrap().capabilities.contains_key("roots"));
}

// =============================================================================
// Timeouts and shutdown
// =============================================================================

#[tokio::test]
async fn timeout_is_reported_to_the_caller() {
    let server = server();
    server
        .register_resource(FnResource::new(
            "slow",
            Url::parse("mem://slow").unwrap(),
            |(): ()| async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok::<_, HandlerError>("late")
            },
        ))
        .unwrap();
    let client = connect(&server).await;

    let options = RequestOptions::with_timeout(Duration::ZERO);
    let err = timeout(WAIT, client.read_resource("slow", options))
        .await
        .expect("timeout must not hang")
        .unwrap_err();
    assert!(matches!(err, CtxError::Timeout { .. }));

    // The session keeps serving.
    assert_eq!(client.ping(RequestOptions::default()).await.unwrap(), "pong");
}

#[tokio::test]
async fn calls_fail_after_the_server_goes_away() {
    let (client_end, server_end) = MemoryTransport::pair();
    let server = server();
    let serving = tokio::spawn({
        let server = server.clone();
        async move { server.serve(server_end).await }
    });
    let client = ClientBuilder::new().build(client_end).await.unwrap();

    serving.abort();
    let _ = serving.await;

    let err = timeout(WAIT, client.ping(RequestOptions::default()))
        .await
        .expect("pending call must be released")
        .unwrap_err();
    assert!(matches!(err, CtxError::Transport(_)));
    assert!(!client.is_connected());
}
