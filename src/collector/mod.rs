//! The Collector: network edge of the pipeline. Bundles the Sanitizer and
//! Deduplicator (invoked synchronously on the ingest handler's task), the
//! staging channel and its enqueue-worker fleet, and the shared health state
//! exposed on the control-plane HTTP server.

pub mod health;
pub mod pipeline;
mod staging;

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::config::CollectorConfig;
use crate::dedup::Deduplicator;
use crate::error::{CaptureError, Result};
use crate::queue::Queue;
use crate::sanitizer::Sanitizer;
use crate::sanitizer::patterns::PatternCatalog;

pub use health::CollectorHealth;
pub use pipeline::{Outcome, Pipeline};

/// Everything the gRPC ingest service needs to process one capture: the
/// pipeline itself plus the background workers and shared state it was
/// constructed alongside.
pub struct Collector {
    pub pipeline: Pipeline,
    pub health: CollectorHealth,
    worker_handles: Vec<tokio::task::JoinHandle<()>>,
    depth_reporter: tokio::task::JoinHandle<()>,
}

impl Collector {
    /// Build the Sanitizer, Deduplicator, staging channel, and enqueue-worker
    /// fleet from a resolved [`CollectorConfig`] and an already-connected Queue.
    pub fn new(config: &CollectorConfig, queue: Arc<Queue>) -> Result<Self> {
        let catalog = PatternCatalog::compile(&config.sanitizer.patterns)
            .map_err(|e| CaptureError::config(format!("sanitizer pattern catalog: {e}")))?;
        let sanitizer = Sanitizer::new(
            catalog,
            config.sanitizer.header_denylist.clone(),
            config.sanitizer.field_name_denylist.clone(),
        );

        let cache_size = std::num::NonZeroUsize::new(config.dedup_cache_size)
            .ok_or_else(|| CaptureError::config("dedup_cache_size must be greater than 0"))?;
        let dedup = Deduplicator::new(cache_size);

        let (staging_tx, staging_rx) = mpsc::channel(config.staging_channel_depth);
        let health = CollectorHealth::new();

        let pipeline = Pipeline::new(
            sanitizer,
            dedup,
            staging_tx,
            config.max_body_bytes,
            config.dedup_body_limit,
            config.enqueue_timeout(),
            config.static_source_labels.clone(),
        );

        let worker_handles =
            staging::spawn_enqueue_workers(config.enqueue_workers, staging_rx, queue.clone(), health.clone());
        let depth_reporter = staging::spawn_queue_depth_reporter(queue, std::time::Duration::from_secs(5));

        Ok(Self { pipeline, health, worker_handles, depth_reporter })
    }

    /// Await every background worker. Only returns once the staging channel has
    /// been closed (by dropping the pipeline) and workers have drained it.
    pub async fn shutdown(self) {
        drop(self.pipeline);
        for handle in self.worker_handles {
            let _ = handle.await;
        }
        self.depth_reporter.abort();
    }
}
