//! Observability (tracing setup, upload counters)

use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` wins over `default_filter` when set. Calling this twice is
/// harmless; the second install is ignored.
pub fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// Cumulative counters across every upload run by one manager
#[derive(Debug, Default)]
pub struct UploadMetrics {
    uploads_started: AtomicU64,
    uploads_completed: AtomicU64,
    uploads_failed: AtomicU64,
    chunks_uploaded: AtomicU64,
    chunks_failed: AtomicU64,
    chunk_retries: AtomicU64,
    bytes_uploaded: AtomicU64,
}

impl UploadMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upload_started(&self) {
        self.uploads_started.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "uploads_started", "Metric incremented");
    }

    pub fn upload_completed(&self) {
        self.uploads_completed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "uploads_completed", "Metric incremented");
    }

    pub fn upload_failed(&self) {
        self.uploads_failed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "uploads_failed", "Metric incremented");
    }

    /// One acknowledged chunk of `bytes` length that needed `retries` extra attempts
    pub fn chunk_uploaded(&self, bytes: u64, retries: u64) {
        self.chunks_uploaded.fetch_add(1, Ordering::Relaxed);
        self.bytes_uploaded.fetch_add(bytes, Ordering::Relaxed);
        if retries > 0 {
            self.chunk_retries.fetch_add(retries, Ordering::Relaxed);
        }
    }

    /// A chunk that failed terminally after `retries` extra attempts
    pub fn chunk_failed(&self, retries: u64) {
        self.chunks_failed.fetch_add(1, Ordering::Relaxed);
        self.chunk_retries.fetch_add(retries, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uploads_started: self.uploads_started.load(Ordering::Relaxed),
            uploads_completed: self.uploads_completed.load(Ordering::Relaxed),
            uploads_failed: self.uploads_failed.load(Ordering::Relaxed),
            chunks_uploaded: self.chunks_uploaded.load(Ordering::Relaxed),
            chunks_failed: self.chunks_failed.load(Ordering::Relaxed),
            chunk_retries: self.chunk_retries.load(Ordering::Relaxed),
            bytes_uploaded: self.bytes_uploaded.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub uploads_started: u64,
    pub uploads_completed: u64,
    pub uploads_failed: u64,
    pub chunks_uploaded: u64,
    pub chunks_failed: u64,
    pub chunk_retries: u64,
    pub bytes_uploaded: u64,
}
