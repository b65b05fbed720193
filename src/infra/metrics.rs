//! Lock-free request metrics
//!
//! Counters are updated with Relaxed ordering and only ever read for
//! reporting; request handling never branches on them.

use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

/// Lock-free metrics collector for the board API
#[derive(Debug, Default)]
pub struct Metrics {
    /// Every HTTP request handled
    requests_total: AtomicU64,
    /// Progress views returned with rows
    progress_served: AtomicU64,
    /// Progress views with no rows for the pathway
    no_data_served: AtomicU64,
    /// Requests refused by validation (bad branch, pathway or id)
    requests_rejected: AtomicU64,
    /// Requests that failed with a 500 (event store or response encoding)
    server_errors: AtomicU64,
    /// Scan log lines excluded before reaching the engine
    scans_skipped: AtomicU64,
}

/// Point-in-time copy of all counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSummary {
    pub requests_total: u64,
    pub progress_served: u64,
    pub no_data_served: u64,
    pub requests_rejected: u64,
    pub server_errors: u64,
    pub scans_skipped: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record_request(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_progress_served(&self) {
        self.progress_served.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_no_data(&self) {
        self.no_data_served.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_rejected(&self) {
        self.requests_rejected.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_server_error(&self) {
        self.server_errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_scans_skipped(&self, count: u64) {
        if count > 0 {
            self.scans_skipped.fetch_add(count, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> MetricsSummary {
        MetricsSummary {
            requests_total: self.requests_total.load(Ordering::Relaxed),
            progress_served: self.progress_served.load(Ordering::Relaxed),
            no_data_served: self.no_data_served.load(Ordering::Relaxed),
            requests_rejected: self.requests_rejected.load(Ordering::Relaxed),
            server_errors: self.server_errors.load(Ordering::Relaxed),
            scans_skipped: self.scans_skipped.load(Ordering::Relaxed),
        }
    }
}

impl MetricsSummary {
    pub fn log(&self) {
        info!(
            requests = %self.requests_total,
            served = %self.progress_served,
            no_data = %self.no_data_served,
            rejected = %self.requests_rejected,
            server_errors = %self.server_errors,
            scans_skipped = %self.scans_skipped,
            "metrics"
        );
    }
}
