//! errbind - demo HTTP daemon for errbin.
//!
//! Serves a handful of routes whose failures are mapped to responses by the
//! error hierarchy built in [`catalog`].

#![forbid(unsafe_code)]

mod catalog;
mod config;
mod routes;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use catalog::{Catalog, build_dispatcher};
use config::DaemonConfig;
use routes::{AppState, create_router};

#[derive(Parser)]
#[command(name = "errbind")]
#[command(author, version, about = "errbin demo daemon - error to response mapping")]
struct Cli {
    /// Path to TOML configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, overrides config and environment
    #[arg(short, long)]
    bind: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Print the registered error hierarchy as JSON and exit
    #[arg(long)]
    dump_tree: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = DaemonConfig::load(cli.config.as_deref())?;
    let env_errors = config.apply_env();
    if let Some(bind) = cli.bind {
        config.server.bind = bind;
    }
    config.validate()?;

    init_logging(&config, cli.verbose);
    for err in &env_errors {
        warn!("Ignoring environment override: {}", err);
    }

    let catalog = Catalog::new();
    let dispatcher =
        build_dispatcher(&catalog, &config).context("Failed to build error hierarchy")?;

    if cli.dump_tree {
        let snapshot = dispatcher.hierarchy().snapshot();
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    let addr = config.bind_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on {}", addr);

    let app = create_router(AppState::new(catalog, Arc::new(dispatcher)));
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("errbind stopped");
    Ok(())
}

fn init_logging(config: &DaemonConfig, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level))
    };

    let (json_layer, text_layer) = if config.logging.json {
        (Some(fmt::layer().json()), None)
    } else {
        (None, Some(fmt::layer()))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
