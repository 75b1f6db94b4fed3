//! Context client demo.
//!
//! Connects to a context server, prints the connection banner and calls
//! `echo` with `{"data": "Hello, World!"}`.
//!
//! ```bash
//! cargo run -p context-client -- --host 127.0.0.1 --port 8888
//! ```

use std::time::Duration;

use clap::Parser;
use ctxkit::client::ClientBuilder;
use ctxkit::{Envelope, RequestOptions};
use miette::IntoDiagnostic;

#[derive(Debug, Parser)]
#[command(name = "context-client", version, about = "Call the echo tool on a context server")]
struct Args {
    /// Server host.
    #[arg(long, env = "CTX_HOST", default_value = ctxkit::DEFAULT_HOST)]
    host: String,

    /// Server port.
    #[arg(long, env = "CTX_PORT", default_value_t = ctxkit::DEFAULT_PORT)]
    port: u16,

    /// Text to echo.
    #[arg(long, default_value = "Hello, World!")]
    message: String,

    /// Per-call timeout in seconds.
    #[arg(long)]
    timeout: Option<f64>,
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();

    tracing::debug!(host = %args.host, port = args.port, "connecting to context server");
    let client = ClientBuilder::new()
        .host(args.host)
        .port(args.port)
        .connect()
        .await?;
    tracing::info!(
        server = %client.server_info().name,
        protocol = %client.protocol_version(),
        "connected"
    );
    println!("{}", client.banner());

    let options = match args.timeout {
        Some(secs) => {
            RequestOptions::with_timeout(Duration::try_from_secs_f64(secs).into_diagnostic()?)
        }
        None => RequestOptions::default(),
    };
    let echoed = client
        .call_tool("echo", &Envelope::new(args.message), options)
        .await?;
    tracing::debug!(bytes = echoed.len(), "echo returned");
    println!("{echoed}");

    client.close().await?;
    tracing::debug!("connection closed");
    Ok(())
}
