//! Request dispatch through a session.
//!
//! Run with: `cargo bench --package ctxkit-benches --bench dispatch`

// Allow missing docs for criterion_group! macro generated functions
#![allow(missing_docs)]

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use ctxkit_client::ClientBuilder;
use ctxkit_core::protocol::methods;
use ctxkit_core::{Capabilities, ClientInfo, Envelope, InitializeRequest, Request, RequestOptions};
use ctxkit_server::builtin::EchoTool;
use ctxkit_server::{ContextServer, ServerConfig, Typed, router};
use ctxkit_transport::MemoryTransport;
use serde_json::json;
use tokio::runtime::Runtime;

fn server() -> ContextServer {
    let server = ContextServer::new(ServerConfig::default());
    let _ = server.register_tool(Typed(EchoTool));
    server
}

fn bench_in_process(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch_in_process");
    let rt = Runtime::new().expect("runtime");

    let server = server();
    let session = server.session();
    let _ = session.initialize(InitializeRequest::new(ClientInfo::default(), Capabilities::new()));

    let call = Request::with_params(
        methods::TOOLS_CALL,
        1u64,
        json!({"name": "echo", "arguments": {"data": "Hello, World!"}}),
    );
    let list = Request::new(methods::TOOLS_LIST, 2u64);
    let bounded = Request::with_params(
        methods::TOOLS_CALL,
        3u64,
        json!({"name": "echo", "arguments": {"data": "x"}, "options": {"timeout": 5.0}}),
    );

    group.bench_function("tools_call", |b| {
        b.to_async(&rt)
            .iter(|| async { black_box(router::dispatch(&session, &call).await) });
    });
    group.bench_function("tools_call_with_timeout", |b| {
        b.to_async(&rt)
            .iter(|| async { black_box(router::dispatch(&session, &bounded).await) });
    });
    group.bench_function("tools_list", |b| {
        b.to_async(&rt)
            .iter(|| async { black_box(router::dispatch(&session, &list).await) });
    });

    group.finish();
}

fn bench_memory_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch_memory_transport");
    let rt = Runtime::new().expect("runtime");

    let client = rt.block_on(async {
        let (client_end, server_end) = MemoryTransport::pair();
        let server = server();
        tokio::spawn(async move { server.serve(server_end).await });
        ClientBuilder::new().build(client_end).await.expect("handshake")
    });
    let payload = Envelope::new("Hello, World!");

    group.bench_function("call_tool", |b| {
        b.to_async(&rt).iter(|| async {
            black_box(
                client
                    .call_tool("echo", &payload, RequestOptions::default())
                    .await,
            )
        });
    });
    group.bench_function("ping", |b| {
        b.to_async(&rt)
            .iter(|| async { black_box(client.ping(RequestOptions::default()).await) });
    });

    group.finish();
}

criterion_group!(benches, bench_in_process, bench_memory_round_trip);
criterion_main!(benches);
