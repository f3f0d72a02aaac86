//! The Rule Loader's install loop: pop a batch of descriptors off the Queue,
//! install each against the mock server's admin API with retry/backoff, and
//! dead-letter whatever doesn't make it. A pool of these run concurrently,
//! each popping from the same `Queue` handle.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::RuleLoaderConfig;
use crate::error::InstallErrorKind;
use crate::metrics;
use crate::queue::Queue;
use crate::rule_loader::backup::BackupSink;
use crate::rule_loader::health::RuleLoaderHealth;
use crate::rule_loader::mock_client::MockServerClient;
use crate::types::MockRuleDescriptor;

/// Install retry schedule: 100ms, 200ms, 400ms, ... capped at 10s.
const INSTALL_BACKOFF_BASE: Duration = Duration::from_millis(100);
const INSTALL_BACKOFF_MAX: Duration = Duration::from_secs(10);

fn backoff_delay(attempt: u32) -> Duration {
    let scaled = INSTALL_BACKOFF_BASE.saturating_mul(1u32.checked_shl(attempt).unwrap_or(u32::MAX));
    std::cmp::min(scaled, INSTALL_BACKOFF_MAX)
}

/// Spawn `config.workers` install workers sharing `queue`, `client`, and
/// `backup`. Each runs until `shutdown` is cancelled, at which point it
/// finishes any descriptor it's mid-install on and exits.
pub fn spawn_workers(
    config: Arc<RuleLoaderConfig>,
    queue: Arc<Queue>,
    client: Arc<MockServerClient>,
    backup: Arc<Option<BackupSink>>,
    health: RuleLoaderHealth,
    shutdown: watch::Receiver<bool>,
) -> Vec<tokio::task::JoinHandle<()>> {
    (0..config.workers)
        .map(|id| {
            let config = config.clone();
            let queue = queue.clone();
            let client = client.clone();
            let backup = backup.clone();
            let health = health.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                worker_loop(id, config, queue, client, backup, health, shutdown).await;
            })
        })
        .collect()
}

async fn worker_loop(
    id: usize,
    config: Arc<RuleLoaderConfig>,
    queue: Arc<Queue>,
    client: Arc<MockServerClient>,
    backup: Arc<Option<BackupSink>>,
    health: RuleLoaderHealth,
    mut shutdown: watch::Receiver<bool>,
) {
    info!(worker_id = id, "rule loader worker starting");
    loop {
        if *shutdown.borrow() {
            break;
        }
        let batch = tokio::select! {
            _ = shutdown.changed() => break,
            batch = queue.pop_batch(config.batch_size) => batch,
        };

        let batch = match batch {
            Ok(batch) => batch,
            Err(err) => {
                warn!(worker_id = id, error = %err, "failed to pop batch from queue");
                health.set_degraded(true);
                sleep(Duration::from_millis(500)).await;
                continue;
            }
        };

        if batch.is_empty() {
            health.set_degraded(false);
            continue;
        }

        for descriptor in batch {
            install_with_retry(&config, &queue, &client, &backup, &health, descriptor).await;
        }
    }
    info!(worker_id = id, "rule loader worker stopped");
}

/// Install one descriptor, retrying transient failures up to
/// `config.retry_attempts` times before dead-lettering. Permanent failures
/// dead-letter on the first attempt.
async fn install_with_retry(
    config: &RuleLoaderConfig,
    queue: &Queue,
    client: &MockServerClient,
    backup: &Option<BackupSink>,
    health: &RuleLoaderHealth,
    descriptor: MockRuleDescriptor,
) {
    let started = Instant::now();
    let mut last_error = String::new();
    let mut last_kind = InstallErrorKind::Transient;
    let mut attempts_made = 0u32;

    for attempt in 0..config.retry_attempts {
        attempts_made = attempt + 1;
        match client.install(&descriptor).await {
            Ok(()) => {
                metrics::record_install_duration(started.elapsed());
                metrics::record_mapping_processed("success");
                health.set_degraded(false);
                if let Some(sink) = backup {
                    sink.append(&descriptor).await;
                }
                return;
            }
            Err(InstallErrorKind::Permanent) => {
                last_error = "mock server rejected the rule".to_string();
                last_kind = InstallErrorKind::Permanent;
                metrics::record_install_error("permanent");
                break;
            }
            Err(InstallErrorKind::Transient) => {
                last_error = "mock server unreachable or returned a server error".to_string();
                last_kind = InstallErrorKind::Transient;
                metrics::record_install_error("transient");
                health.set_degraded(true);
                if attempt + 1 < config.retry_attempts {
                    sleep(backoff_delay(attempt)).await;
                }
            }
        }
    }

    metrics::record_install_duration(started.elapsed());
    metrics::record_mapping_processed("dead_lettered");
    let reason = last_kind.to_string();
    warn!(fingerprint = %descriptor.fingerprint, reason = %reason, attempts = attempts_made, "dead-lettering descriptor after install failure");
    if let Err(err) = queue.dead_letter(descriptor, &reason, &last_error, attempts_made).await {
        warn!(error = %err, "failed to write dead letter entry");
    }
}
