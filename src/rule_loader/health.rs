//! Shared readiness/degradation state for the Rule Loader's control-plane
//! `/health` and `/ready` endpoints.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Clone)]
pub struct RuleLoaderHealth {
    inner: Arc<Inner>,
}

struct Inner {
    ready: AtomicBool,
    degraded: AtomicBool,
}

impl RuleLoaderHealth {
    pub fn new() -> Self {
        Self { inner: Arc::new(Inner { ready: AtomicBool::new(false), degraded: AtomicBool::new(false) }) }
    }

    /// Flip once startup configuration validation and the initial Queue
    /// connection have both succeeded.
    pub fn mark_ready(&self) {
        self.inner.ready.store(true, Ordering::SeqCst);
    }

    pub fn is_ready(&self) -> bool {
        self.inner.ready.load(Ordering::SeqCst)
    }

    /// Set while the install pipeline is in retry exhaustion against the mock
    /// server (i.e. descriptors are currently being dead-lettered due to
    /// transport failure rather than policy rejection).
    pub fn set_degraded(&self, degraded: bool) {
        self.inner.degraded.store(degraded, Ordering::SeqCst);
    }

    pub fn is_degraded(&self) -> bool {
        self.inner.degraded.load(Ordering::SeqCst)
    }
}

impl Default for RuleLoaderHealth {
    fn default() -> Self {
        Self::new()
    }
}

impl crate::http::HealthSource for RuleLoaderHealth {
    fn is_ready(&self) -> bool {
        self.is_ready()
    }

    fn is_degraded(&self) -> bool {
        self.is_degraded()
    }
}
