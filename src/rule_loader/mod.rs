//! The Rule Loader: drains [`crate::types::MockRuleDescriptor`]s from the
//! Queue and installs them against a mock server's admin API, with retry,
//! dead-lettering, and an optional on-disk backup trail.

pub mod backup;
pub mod health;
pub mod mock_client;
pub mod worker;

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

use crate::config::RuleLoaderConfig;
use crate::queue::Queue;

pub use health::RuleLoaderHealth;
pub use mock_client::MockServerClient;

pub struct RuleLoader {
    health: RuleLoaderHealth,
    worker_handles: Vec<tokio::task::JoinHandle<()>>,
    shutdown_tx: watch::Sender<bool>,
}

impl RuleLoader {
    /// Build the mock-server client and optional backup sink, then spawn
    /// `config.workers` install workers against `queue`.
    pub fn new(config: Arc<RuleLoaderConfig>, queue: Arc<Queue>) -> Self {
        let client = Arc::new(MockServerClient::new(
            config.mock_server_url.clone(),
            config.mock_server_timeout(),
            config.mock_server_auth_token.clone(),
        ));

        let backup = Arc::new(config.backup_sink_path.as_ref().map(|path| backup::BackupSink::new(PathBuf::from(path))));

        let health = RuleLoaderHealth::new();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let worker_handles = worker::spawn_workers(config, queue, client, backup, health.clone(), shutdown_rx);

        health.mark_ready();
        Self { health, worker_handles, shutdown_tx }
    }

    pub fn health(&self) -> RuleLoaderHealth {
        self.health.clone()
    }

    /// Signal all workers to stop after finishing any descriptor they're
    /// mid-install on, then wait for them to exit.
    pub async fn shutdown(self) {
        info!("rule loader shutting down");
        let _ = self.shutdown_tx.send(true);
        for handle in self.worker_handles {
            let _ = handle.await;
        }
    }
}
