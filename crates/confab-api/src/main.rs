//! Confab gateway server binary.
//!
//! Wires the session store, LLM failover pair, and connection registry into
//! an axum application, then serves it until SIGINT/SIGTERM.

use std::path::PathBuf;

use clap::Parser;
use confab_observe::tracing_setup::{init_tracing, shutdown_tracing};

mod http;
mod state;

use state::AppState;

#[derive(Debug, Parser)]
#[command(name = "confab", version, about = "Conversational LLM gateway")]
struct Cli {
    /// Address to bind, overriding the config file.
    #[arg(long, env = "CONFAB_HOST")]
    host: Option<String>,

    /// Port to bind, overriding the config file.
    #[arg(long, env = "CONFAB_PORT")]
    port: Option<u16>,

    /// Path to the TOML config file.
    #[arg(long, env = "CONFAB_CONFIG", default_value = "confab.toml")]
    config: PathBuf,

    /// Emit OpenTelemetry spans to stdout alongside the log output.
    #[arg(long)]
    otel: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.otel).map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let mut config = confab_infra::config::load_config(&cli.config).await;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::init(config).await?;
    let router = http::router::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("confab gateway listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    shutdown_tracing();
    Ok(())
}

/// Resolves when the process receives SIGINT or, on unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received, draining connections");
}
