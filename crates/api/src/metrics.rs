use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

pub struct Metrics {
    // Requests
    total_requests: AtomicUsize,
    successful_requests: AtomicUsize,
    failed_requests: AtomicUsize,

    // Jobs
    jobs_submitted: AtomicUsize,
    jobs_completed: AtomicUsize,
    jobs_failed: AtomicUsize,

    // Pipeline
    pipeline_runs: AtomicUsize,
    total_pipeline_time_us: AtomicU64,
    total_chunks_processed: AtomicUsize,
    total_chunks_failed: AtomicUsize,
    total_entities_extracted: AtomicUsize,
    total_relations_extracted: AtomicUsize,
    validation_failures: AtomicUsize,
    persistence_failures: AtomicUsize,
}

/// Counts from one completed pipeline run
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineSample {
    pub duration: Duration,
    pub chunks: usize,
    pub failed_chunks: usize,
    pub entities: usize,
    pub relations: usize,
    pub conforms: bool,
    pub persisted: bool,
}

impl Metrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            total_requests: AtomicUsize::new(0),
            successful_requests: AtomicUsize::new(0),
            failed_requests: AtomicUsize::new(0),
            jobs_submitted: AtomicUsize::new(0),
            jobs_completed: AtomicUsize::new(0),
            jobs_failed: AtomicUsize::new(0),
            pipeline_runs: AtomicUsize::new(0),
            total_pipeline_time_us: AtomicU64::new(0),
            total_chunks_processed: AtomicUsize::new(0),
            total_chunks_failed: AtomicUsize::new(0),
            total_entities_extracted: AtomicUsize::new(0),
            total_relations_extracted: AtomicUsize::new(0),
            validation_failures: AtomicUsize::new(0),
            persistence_failures: AtomicUsize::new(0),
        })
    }

    pub fn record_request(&self, success: bool) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        if success {
            self.successful_requests.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_requests.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_job_submitted(&self) {
        self.jobs_submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_job_finished(&self, success: bool) {
        if success {
            self.jobs_completed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.jobs_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_pipeline(&self, sample: PipelineSample) {
        self.pipeline_runs.fetch_add(1, Ordering::Relaxed);
        self.total_pipeline_time_us
            .fetch_add(sample.duration.as_micros() as u64, Ordering::Relaxed);
        self.total_chunks_processed.fetch_add(sample.chunks, Ordering::Relaxed);
        self.total_chunks_failed.fetch_add(sample.failed_chunks, Ordering::Relaxed);
        self.total_entities_extracted.fetch_add(sample.entities, Ordering::Relaxed);
        self.total_relations_extracted.fetch_add(sample.relations, Ordering::Relaxed);
        if !sample.conforms {
            self.validation_failures.fetch_add(1, Ordering::Relaxed);
        }
        if !sample.persisted {
            self.persistence_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            successful_requests: self.successful_requests.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
            jobs_submitted: self.jobs_submitted.load(Ordering::Relaxed),
            jobs_completed: self.jobs_completed.load(Ordering::Relaxed),
            jobs_failed: self.jobs_failed.load(Ordering::Relaxed),
            pipeline_runs: self.pipeline_runs.load(Ordering::Relaxed),
            avg_pipeline_time_ms: self.avg_time_ms(&self.total_pipeline_time_us, &self.pipeline_runs),
            total_chunks_processed: self.total_chunks_processed.load(Ordering::Relaxed),
            total_chunks_failed: self.total_chunks_failed.load(Ordering::Relaxed),
            total_entities_extracted: self.total_entities_extracted.load(Ordering::Relaxed),
            total_relations_extracted: self.total_relations_extracted.load(Ordering::Relaxed),
            validation_failures: self.validation_failures.load(Ordering::Relaxed),
            persistence_failures: self.persistence_failures.load(Ordering::Relaxed),
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
    pub total_requests: usize,
    pub successful_requests: usize,
    pub failed_requests: usize,
    pub jobs_submitted: usize,
    pub jobs_completed: usize,
    pub jobs_failed: usize,
    pub pipeline_runs: usize,
    pub avg_pipeline_time_ms: f64,
    pub total_chunks_processed: usize,
    pub total_chunks_failed: usize,
    pub total_entities_extracted: usize,
    pub total_relations_extracted: usize,
    pub validation_failures: usize,
    pub persistence_failures: usize,
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_sample_accumulates() {
        let metrics = Metrics::new();
        metrics.record_pipeline(PipelineSample {
            duration: Duration::from_millis(4),
            chunks: 3,
            failed_chunks: 1,
            entities: 5,
            relations: 2,
            conforms: false,
            persisted: true,
        });
        metrics.record_pipeline(PipelineSample {
            duration: Duration::from_millis(2),
            chunks: 1,
            conforms: true,
            persisted: false,
            ..Default::default()
        });

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.pipeline_runs, 2);
        assert_eq!(snapshot.total_chunks_processed, 4);
        assert_eq!(snapshot.total_chunks_failed, 1);
        assert_eq!(snapshot.total_entities_extracted, 5);
        assert_eq!(snapshot.validation_failures, 1);
        assert_eq!(snapshot.persistence_failures, 1);
        assert!((snapshot.avg_pipeline_time_ms - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_requests_and_jobs() {
        let metrics = Metrics::new();
        metrics.record_request(true);
        metrics.record_request(false);
        metrics.record_job_submitted();
        metrics.record_job_finished(false);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_requests, 2);
        assert_eq!(snapshot.failed_requests, 1);
        assert_eq!(snapshot.jobs_submitted, 1);
        assert_eq!(snapshot.jobs_failed, 1);
        assert_eq!(snapshot.avg_pipeline_time_ms, 0.0);
    }
}
