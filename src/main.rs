//! Self-looping rewriting proxy (v1)
//!
//! # Architecture Overview
//!
//! ```text
//!   Client                    ┌──────────────────────────────────────────────┐
//!   GET /proxy?url=...  ─────▶│ http::server ─▶ proxy::target (validate)     │
//!                             │                      │                       │
//!                             │                      ▼                       │
//!                             │               proxy::engine ──── GET ───────┼──▶ Origin
//!                             │                      │                       │
//!                             │        text/html?    ▼                       │
//!                             │   yes ─▶ proxy::rewrite    no ─▶ raw bytes   │
//!   Response  ◀───────────────│   status + relayed headers + body            │
//!                             └──────────────────────────────────────────────┘
//! ```
//!
//! Any other path is served from the static directory (companion page).

use std::path::PathBuf;

use clap::Parser;

use rewrite_proxy::config::{load_config, validate_config, ConfigError, ProxyConfig};
use rewrite_proxy::lifecycle::startup;
use rewrite_proxy::observability::logging;

#[derive(Parser)]
#[command(name = "rewrite-proxy")]
#[command(about = "Forwarding proxy that rewrites HTML so navigation stays on the proxy", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address (e.g. 127.0.0.1:3000).
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
        validate_config(&config).map_err(ConfigError::Validation)?;
    }

    logging::init(&config.observability.log_level);
    tracing::info!("rewrite-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    startup::start(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
