//! `meshcap-collector`: the gRPC ingest edge. Accepts one `IngestCaptures`
//! stream per sidecar, runs each capture through the sanitize/dedup/stage
//! pipeline, and hands surviving descriptors to the Queue for the Rule
//! Loader to install.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tonic::transport::Server;
use tracing::{error, info};

use meshcap::collector::Collector;
use meshcap::config::resolve_collector;
use meshcap::grpc::pb::capture_ingest_server::CaptureIngestServer;
use meshcap::grpc::CaptureIngestService;
use meshcap::queue::Queue;
use meshcap::startup;
use meshcap::{metrics, VERSION};

#[derive(Parser)]
#[command(name = env!("CARGO_PKG_NAME"))]
#[command(about = "Captures sidecar-observed traffic and stages it for mock-rule installation")]
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

    let resolution = resolve_collector(cli.config.as_deref())?;
    startup::init_logging(&resolution.config.logging);

    let grpc_addr = resolution.config.grpc_listen_addr.clone();
    let control_plane_addr = resolution.config.control_plane.listen_addr.clone();
    startup::display_startup_info(
        "meshcap-collector",
        VERSION,
        &resolution,
        &[("grpc", &grpc_addr), ("control-plane", &control_plane_addr)],
    );

    if !resolution.validation.can_start() {
        anyhow::bail!("configuration validation failed; see logged errors");
    }

    let config = Arc::new(resolution.config);
    let prometheus = metrics::install_recorder();

    let queue = Arc::new(Queue::connect(&config.queue).await?);
    let collector = Arc::new(Collector::new(&config, queue.clone())?);
    collector.health.mark_ready();

    let mut grpc_task = {
        let collector = collector.clone();
        let grpc_addr = grpc_addr.parse()?;
        tokio::spawn(async move {
            let service = CaptureIngestServer::new(CaptureIngestService::new(collector));
            info!(%grpc_addr, "gRPC ingest server starting");
            if let Err(e) = Server::builder().add_service(service).serve(grpc_addr).await {
                error!(error = %e, "gRPC server failed");
            }
        })
    };

    let mut control_plane_task = {
        let health = collector.health.clone();
        tokio::spawn(async move {
            if let Err(e) = meshcap::http::serve(&control_plane_addr, health, prometheus).await {
                error!(error = %e, "control-plane HTTP server failed");
            }
        })
    };

    tokio::select! {
        _ = &mut grpc_task => {}
        _ = &mut control_plane_task => {}
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received; stopping the gRPC server before draining the staging channel");
        }
    }

    grpc_task.abort();
    control_plane_task.abort();
    let _ = grpc_task.await;

    match Arc::try_unwrap(collector) {
        Ok(collector) => collector.shutdown().await,
        Err(_) => info!("collector still has active references; skipping graceful drain"),
    }

    Ok(())
}
