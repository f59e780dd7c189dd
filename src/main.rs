//! Autonomous Operations Agent - Rust Implementation
//!
//! Serves the workflow event relay: accepted order requests run the
//! order-processing workflow against the configured MCP tool servers and
//! stream progress events back to the caller.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use ops_agent::config::Config;
use ops_agent::error::Result;
use ops_agent::relay;

/// Autonomous Operations Agent
#[derive(Parser)]
#[command(name = "ops-agent")]
#[command(author, version, about = "Operations agent - processes orders via MCP tool servers")]
struct Cli {
    /// Port for the workflow event relay (overrides OPS_AGENT_PORT)
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Load configuration
    let mut config = Config::from_env()?;
    if let Some(port) = cli.port {
        config.relay_port = port;
    }

    info!(
        crm = %config.crm_server_url,
        email = %config.email_server_url,
        port = config.relay_port,
        "starting workflow event relay"
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.relay_port));
    let app = relay::router(Arc::new(config));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
