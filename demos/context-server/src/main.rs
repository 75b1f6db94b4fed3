//! Context server demo.
//!
//! Serves the built-in `echo` tool at `ws://<host>:<port>/server`.
//!
//! ```bash
//! cargo run -p context-server -- --port 8888
//! RUST_LOG=ctxkit_server=debug cargo run -p context-server
//! ```

use clap::Parser;
use ctxkit::server::builtin::EchoTool;
use ctxkit::server::{ContextServer, ServerConfig, Typed};
use miette::IntoDiagnostic;

#[derive(Debug, Parser)]
#[command(name = "context-server", version, about = "Serve tools over the context protocol")]
struct Args {
    /// Interface to bind.
    #[arg(long, env = "CTX_HOST", default_value = ctxkit::DEFAULT_HOST)]
    host: String,

    /// Port to bind.
    #[arg(long, env = "CTX_PORT", default_value_t = ctxkit::DEFAULT_PORT)]
    port: u16,

    /// Instructions sent to clients during the handshake.
    #[arg(long)]
    instructions: Option<String>,
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("context_server=info".parse().into_diagnostic()?)
                .add_directive("ctxkit_server=info".parse().into_diagnostic()?),
        )
        .init();

    let args = Args::parse();

    let mut config = ServerConfig::default()
        .with_host(args.host)
        .with_port(args.port);
    if let Some(instructions) = args.instructions {
        config = config.with_instructions(instructions);
    }

    let server = ContextServer::new(config);
    server.register_tool(Typed(EchoTool))?;
    tracing::debug!(tools = %server.state().tools().list(), "registered tools");

    tracing::info!(url = %server.config().address().url(), "starting context server");
    server.run().await?;
    Ok(())
}
