use serde::Serialize;
use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

#[derive(Debug, Default)]
struct InnerMetrics {
    units_completed: AtomicU64,
    units_recovered: AtomicU64,
    rows_processed: AtomicU64,
}

/// Live run counters, shared across workers. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct Metrics {
    inner: Arc<InnerMetrics>,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct MetricsSnapshot {
    pub units_completed: u64,
    pub units_recovered: u64,
    pub rows_processed: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Metrics {
            inner: Arc::new(InnerMetrics::default()),
        }
    }

    /// Increment the completion counter; returns the new count so the caller
    /// can drive a progress indicator.
    pub fn increment_units(&self) -> u64 {
        self.inner.units_completed.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn increment_recovered(&self) {
        self.inner.units_recovered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_rows(&self, count: u64) {
        self.inner.rows_processed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            units_completed: self.inner.units_completed.load(Ordering::Relaxed),
            units_recovered: self.inner.units_recovered.load(Ordering::Relaxed),
            rows_processed: self.inner.rows_processed.load(Ordering::Relaxed),
        }
    }
}

/// Aggregate result of one run. Derived from the output table at the end of
/// assembly, never stored.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RunSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed: Duration,
}
