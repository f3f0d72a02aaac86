//! `meshcap-rule-loader`: drains the Queue and installs the descriptors it
//! carries against a mock server's admin API, retrying transient failures
//! and dead-lettering the rest.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use meshcap::config::resolve_rule_loader;
use meshcap::queue::Queue;
use meshcap::rule_loader::RuleLoader;
use meshcap::startup;
use meshcap::{metrics, VERSION};

#[derive(Parser)]
#[command(name = env!("CARGO_PKG_NAME"))]
#[command(about = "Installs queued mock rules against a mock server's admin API")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();

    let resolution = resolve_rule_loader(cli.config.as_deref())?;
    startup::init_logging(&resolution.config.logging);

    let control_plane_addr = resolution.config.control_plane.listen_addr.clone();
    startup::display_startup_info(
        "meshcap-rule-loader",
        VERSION,
        &resolution,
        &[("control-plane", &control_plane_addr)],
    );

    if !resolution.validation.can_start() {
        anyhow::bail!("configuration validation failed; see logged errors");
    }

    let config = Arc::new(resolution.config);
    let prometheus = metrics::install_recorder();

    let queue = Arc::new(Queue::connect(&config.queue).await?);
    let loader = RuleLoader::new(config, queue);
    let health = loader.health();

    let control_plane_task = tokio::spawn(async move {
        if let Err(e) = meshcap::http::serve(&control_plane_addr, health, prometheus).await {
            error!(error = %e, "control-plane HTTP server failed");
        }
    });

    tokio::select! {
        _ = control_plane_task => {}
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    loader.shutdown().await;
    Ok(())
}
