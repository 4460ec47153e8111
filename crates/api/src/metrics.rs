use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

pub struct Metrics {
    // Counters
    total_runs: AtomicUsize,
    successful_runs: AtomicUsize,
    failed_runs: AtomicUsize,
    extract_attempts: AtomicUsize,

    // Timing (in microseconds)
    total_extract_time_us: AtomicU64,
    total_layout_time_us: AtomicU64,

    // Counts
    total_documents: AtomicUsize,
    total_shareholders_rendered: AtomicUsize,
}

impl Metrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            total_runs: AtomicUsize::new(0),
            successful_runs: AtomicUsize::new(0),
            failed_runs: AtomicUsize::new(0),
            extract_attempts: AtomicUsize::new(0),
            total_extract_time_us: AtomicU64::new(0),
            total_layout_time_us: AtomicU64::new(0),
            total_documents: AtomicUsize::new(0),
            total_shareholders_rendered: AtomicUsize::new(0),
        })
    }

    pub fn record_run(&self, success: bool) {
        self.total_runs.fetch_add(1, Ordering::Relaxed);
        if success {
            self.successful_runs.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_runs.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_extract(&self, duration: Duration, documents: usize) {
        self.extract_attempts.fetch_add(1, Ordering::Relaxed);
        self.total_extract_time_us.fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
        self.total_documents.fetch_add(documents, Ordering::Relaxed);
    }

    pub fn record_layout(&self, duration: Duration, shareholders: usize) {
        self.total_layout_time_us.fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
        self.total_shareholders_rendered.fetch_add(shareholders, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_runs: self.total_runs.load(Ordering::Relaxed),
            successful_runs: self.successful_runs.load(Ordering::Relaxed),
            failed_runs: self.failed_runs.load(Ordering::Relaxed),
            avg_extract_time_ms: self.avg_time_ms(&self.total_extract_time_us, &self.extract_attempts),
            avg_layout_time_ms: self.avg_time_ms(&self.total_layout_time_us, &self.successful_runs),
            total_documents: self.total_documents.load(Ordering::Relaxed),
            total_shareholders_rendered: self.total_shareholders_rendered.load(Ordering::Relaxed),
        }
    }

    fn avg_time_ms(&self, total_us: &AtomicU64, count: &AtomicUsize) -> f64 {
        let total = total_us.load(Ordering::Relaxed) as f64;
        let cnt = count.load(Ordering::Relaxed) as f64;
        if cnt > 0.0 {
            total / cnt / 1000.0 // Convert to ms
        } else {
            0.0
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub total_runs: usize,
    pub successful_runs: usize,
    pub failed_runs: usize,
    pub avg_extract_time_ms: f64,
    pub avg_layout_time_ms: f64,
    pub total_documents: usize,
    pub total_shareholders_rendered: usize,
}

pub struct TimedOperation {
    start: Instant,
}

impl TimedOperation {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}
