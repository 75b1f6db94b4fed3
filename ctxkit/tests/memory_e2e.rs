//! Full client/server round trips over the in-memory transport.

use std::time::Duration;

use ctxkit::prelude::*;
use ctxkit::transport::MemoryTransport;
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

async fn connect(server: &ContextServer) -> ContextClient<MemoryTransport> {
    let (client_end, server_end) = MemoryTransport::pair();
    tokio::spawn({
        let server = server.clone();
        async move { server.serve(server_end).await }
    });
    timeout(WAIT, ClientBuilder::new().build(client_end))
        .await
        .unwrap()
        .unwrap()
}

#[tokio::test]
async fn echo_tool_with_only_echo_registered() {
    let server = ContextServer::new(ServerConfig::default());
    server.register_tool(Typed(EchoTool)).unwrap();
    let client = connect(&server).await;

    let tools = client.list_tools(RequestOptions::default()).await.unwrap();
    assert_eq!(tools.len(), 1);
    assert_eq!(
        tools.find("echo").and_then(|t| t.description.as_deref()),
        Some("A tool that echoes the provided input.")
    );

    let out = client
        .call_tool("echo", &Envelope::new("Hello, World!"), RequestOptions::default())
        .await
        .unwrap();
    assert_eq!(out, "Hello, World!");
}

#[tokio::test]
async fn dynamic_registration_is_visible_to_connected_clients() {
    let server = ContextServer::new(ServerConfig::default());
    let client = connect(&server).await;
    assert!(client.list_tools(RequestOptions::default()).await.unwrap().is_empty());

    server.register_tool(Typed(EchoTool)).unwrap();
    let err = server.register_tool(Typed(EchoTool)).unwrap_err();
    assert!(matches!(err, CtxError::DuplicateRegistration { .. }));

    let tools = client.list_tools(RequestOptions::default()).await.unwrap();
    assert_eq!(tools.ids(), vec!["echo"]);
}

#[tokio::test]
async fn set_prompts_replaces_the_initial_list() {
    let server = ContextServer::new(ServerConfig::default());
    server
        .register_prompt(TemplatePrompt::new("old", "gone"))
        .unwrap();
    server
        .set_prompts([
            std::sync::Arc::new(TemplatePrompt::new("summary", "Summarize {topic}."))
                as std::sync::Arc<dyn Prompt>,
        ])
        .unwrap();

    let client = connect(&server).await;
    let prompts = client.list_prompts(RequestOptions::default()).await.unwrap();
    assert_eq!(prompts.to_string(), "summary");

    let text = client
        .get_prompt("summary", &json!({"topic": "the {{braces}}"}), RequestOptions::default())
        .await
        .unwrap();
    assert_eq!(text, "Summarize the {{braces}}.");
}

#[tokio::test]
async fn many_clients_share_one_server() {
    let server = ContextServer::new(ServerConfig::default());
    server.register_tool(Typed(EchoTool)).unwrap();

    let mut calls = Vec::new();
    for n in 0..8 {
        let client = connect(&server).await;
        calls.push(tokio::spawn(async move {
            client
                .call_tool("echo", &Envelope::new(format!("client {n}")), RequestOptions::default())
                .await
        }));
    }
    for (n, call) in calls.into_iter().enumerate() {
        assert_eq!(call.await.unwrap().unwrap(), format!("client {n}"));
    }
}
