//! Shared readiness/degradation state for the Collector's control-plane `/health`
//! and `/ready` endpoints. Plain atomics: both flags are touched far more often
//! than they're read, and neither needs more than single-bit granularity.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Clone)]
pub struct CollectorHealth {
    inner: Arc<Inner>,
}

struct Inner {
    ready: AtomicBool,
    degraded: AtomicBool,
}

impl CollectorHealth {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                ready: AtomicBool::new(false),
                degraded: AtomicBool::new(false),
            }),
        }
    }

    /// Flip once startup validation and the initial Queue connection both succeed.
    pub fn mark_ready(&self) {
        self.inner.ready.store(true, Ordering::SeqCst);
    }

    pub fn is_ready(&self) -> bool {
        self.inner.ready.load(Ordering::SeqCst)
    }

    /// Set when the Queue adapter's push retry budget has been exhausted; cleared
    /// the next time a push succeeds. `/health` returns 503 while this is set.
    pub fn set_degraded(&self, degraded: bool) {
        self.inner.degraded.store(degraded, Ordering::SeqCst);
    }

    pub fn is_degraded(&self) -> bool {
        self.inner.degraded.load(Ordering::SeqCst)
    }
}

impl Default for CollectorHealth {
    fn default() -> Self {
        Self::new()
    }
}

impl crate::http::HealthSource for CollectorHealth {
    fn is_ready(&self) -> bool {
        self.is_ready()
    }

    fn is_degraded(&self) -> bool {
        self.is_degraded()
    }
}
