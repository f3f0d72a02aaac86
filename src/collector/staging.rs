//! The bounded in-process staging channel and its enqueue-worker fleet.
//!
//! The ingest handler (via [`crate::collector::pipeline::Pipeline`]) only ever
//! does a bounded send into this channel; a fixed pool of background workers
//! drains it into the Queue. This keeps the RPC handler's worker free of any
//! per-record task spawn — the spec's "no goroutine/task explosion beyond
//! staging" scheduling rule.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tracing::{error, info};

use crate::collector::health::CollectorHealth;
use crate::queue::Queue;
use crate::types::MockRuleDescriptor;

/// Spawn `worker_count` tasks that drain `rx` into `queue`, returning their
/// join handles so the caller can await a clean shutdown.
pub fn spawn_enqueue_workers(
    worker_count: usize,
    rx: mpsc::Receiver<MockRuleDescriptor>,
    queue: Arc<Queue>,
    health: CollectorHealth,
) -> Vec<tokio::task::JoinHandle<()>> {
    let rx = Arc::new(Mutex::new(rx));
    (0..worker_count)
        .map(|worker_id| {
            let rx = rx.clone();
            let queue = queue.clone();
            let health = health.clone();
            tokio::spawn(async move { enqueue_worker_loop(worker_id, rx, queue, health).await })
        })
        .collect()
}

async fn enqueue_worker_loop(
    worker_id: usize,
    rx: Arc<Mutex<mpsc::Receiver<MockRuleDescriptor>>>,
    queue: Arc<Queue>,
    health: CollectorHealth,
) {
    info!(worker_id, "enqueue worker started");
    loop {
        let descriptor = {
            let mut rx = rx.lock().await;
            rx.recv().await
        };

        let Some(descriptor) = descriptor else {
            info!(worker_id, "staging channel closed; enqueue worker exiting");
            return;
        };

        match queue.push(&descriptor).await {
            Ok(()) => {
                health.set_degraded(false);
            }
            Err(e) => {
                error!(worker_id, fingerprint = %descriptor.fingerprint, error = %e, "dropping descriptor: queue push exhausted retries");
                crate::metrics::record_request("queue_push_failed");
                health.set_degraded(true);
            }
        }
    }
}

/// Poll `queue.depth()` on an interval and publish it as the
/// `collector_queue_depth` gauge, until `rx` is dropped.
pub fn spawn_queue_depth_reporter(queue: Arc<Queue>, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            match queue.depth().await {
                Ok(depth) => crate::metrics::set_queue_depth(depth),
                Err(e) => error!(error = %e, "failed to read queue depth"),
            }
        }
    })
}
