//! WebSocket transport over a real loopback socket.

use std::time::Duration;

use ctxkit_core::protocol::{Message, Notification, Request, Response};
use ctxkit_transport::{
    Transport, TransportListener, WebSocketConfig, WebSocketListener, WebSocketServerConfig,
    WebSocketTransport,
};
use serde_json::json;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

async fn listener() -> WebSocketListener {
    WebSocketListener::bind("127.0.0.1:0", WebSocketServerConfig::new())
        .await
        .expect("bind")
}

fn url(listener: &WebSocketListener, path: &str) -> String {
    format!("ws://{}{path}", listener.local_socket_addr())
}

#[tokio::test]
async fn request_and_response_cross_the_socket() {
    let listener = listener().await;
    let client = WebSocketTransport::connect(WebSocketConfig::new(url(&listener, "/server")))
        .await
        .unwrap();
    let server = timeout(WAIT, listener.accept()).await.unwrap().unwrap();

    client
        .send(Request::with_params("tools/call", 1u64, json!({"name": "echo"})).into())
        .await
        .unwrap();

    let received = timeout(WAIT, server.recv()).await.unwrap().unwrap().unwrap();
    let Message::Request(request) = received else {
        panic!("expected a request");
    };
    assert_eq!(request.method(), "tools/call");

    server
        .send(Response::success(request.id, json!("Hello")).into())
        .await
        .unwrap();

    let reply = timeout(WAIT, client.recv()).await.unwrap().unwrap().unwrap();
    assert!(reply.is_response());
    assert_eq!(client.messages_sent(), 1);
    assert_eq!(client.messages_received(), 1);
}

#[tokio::test]
async fn send_is_not_blocked_by_pending_recv() {
    let listener = listener().await;
    let client = std::sync::Arc::new(
        WebSocketTransport::connect(WebSocketConfig::new(url(&listener, "/server")))
            .await
            .unwrap(),
    );
    let server = timeout(WAIT, listener.accept()).await.unwrap().unwrap();

    let reader = {
        let client = std::sync::Arc::clone(&client);
        tokio::spawn(async move { client.recv().await })
    };
    tokio::task::yield_now().await;

    timeout(WAIT, client.send(Notification::new("notifications/roots/list_changed").into()))
        .await
        .expect("send must not wait for the reader")
        .unwrap();

    let got = timeout(WAIT, server.recv()).await.unwrap().unwrap().unwrap();
    assert_eq!(got.method(), Some("notifications/roots/list_changed"));
    reader.abort();
}

#[tokio::test]
async fn close_ends_peer_stream() {
    let listener = listener().await;
    let client = WebSocketTransport::connect(WebSocketConfig::new(url(&listener, "/server")))
        .await
        .unwrap();
    let server = timeout(WAIT, listener.accept()).await.unwrap().unwrap();

    client.close().await.unwrap();
    assert!(!client.is_connected());

    let end = timeout(WAIT, server.recv()).await.unwrap().unwrap();
    assert!(end.is_none());
    assert!(!server.is_connected());
}

#[tokio::test]
async fn unknown_path_is_refused() {
    let listener = listener().await;
    let config = WebSocketConfig::new(url(&listener, "/elsewhere"));
    let result = WebSocketTransport::connect(config).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn listener_reports_its_address() {
    let listener = listener().await;
    let addr = TransportListener::local_addr(&listener).unwrap();
    assert!(addr.starts_with("127.0.0.1:"));
}
