use std::any::Any;
use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinError;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::metrics::Metrics;
use crate::pipeline::{IngestOutcome, NoProgress, PROGRESS_DONE, PROGRESS_STARTED, Pipeline};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Job {
    pub job_id: String,
    pub filename: String,
    pub status: JobStatus,
    pub progress: f64,
    pub result: Option<IngestOutcome>,
    pub error: Option<String>,
}

/// In-memory job table. Entries live as long as the process.
#[derive(Default)]
pub struct JobRegistry {
    jobs: DashMap<String, Job>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, filename: &str) -> String {
        let job_id = Uuid::new_v4().to_string();
        self.jobs.insert(
            job_id.clone(),
            Job {
                job_id: job_id.clone(),
                filename: filename.to_string(),
                status: JobStatus::Pending,
                progress: 0.0,
                result: None,
                error: None,
            },
        );
        job_id
    }

    pub fn get(&self, job_id: &str) -> Option<Job> {
        self.jobs.get(job_id).map(|job| job.clone())
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Pending → processing; progress leaves zero at once
    pub fn start(&self, job_id: &str) -> bool {
        self.transition(job_id, "start", |job| {
            if job.status != JobStatus::Pending {
                return false;
            }
            job.status = JobStatus::Processing;
            job.progress = job.progress.max(PROGRESS_STARTED);
            true
        })
    }

    /// Raise progress while processing. Lower values are ignored.
    pub fn update_progress(&self, job_id: &str, progress: f64) -> bool {
        let Some(mut job) = self.jobs.get_mut(job_id) else {
            return false;
        };
        if job.status != JobStatus::Processing {
            return false;
        }
        let progress = progress.clamp(0.0, PROGRESS_DONE);
        if progress > job.progress {
            job.progress = progress;
        }
        true
    }

    /// Processing → completed, with progress pinned to 100
    pub fn complete(&self, job_id: &str, outcome: IngestOutcome) -> bool {
        self.transition(job_id, "complete", |job| {
            if job.status != JobStatus::Processing {
                return false;
            }
            job.status = JobStatus::Completed;
            job.progress = PROGRESS_DONE;
            job.result = Some(outcome);
            true
        })
    }

    /// Any non-terminal state → failed; progress keeps its last value
    pub fn fail(&self, job_id: &str, message: String) -> bool {
        self.transition(job_id, "fail", |job| {
            if job.status.is_terminal() {
                return false;
            }
            job.status = JobStatus::Failed;
            job.error = Some(message);
            true
        })
    }

    fn transition<F>(&self, job_id: &str, action: &str, apply: F) -> bool
    where
        F: FnOnce(&mut Job) -> bool,
    {
        let Some(mut job) = self.jobs.get_mut(job_id) else {
            warn!(job_id, action, "Transition on unknown job");
            return false;
        };
        let from = job.status;
        let applied = apply(job.value_mut());
        if !applied {
            warn!(job_id, action, status = ?from, "Illegal job transition rejected");
        }
        applied
    }
}

fn join_failure_message(join_error: JoinError) -> String {
    if join_error.is_panic() {
        panic_message(join_error.into_panic())
    } else {
        join_error.to_string()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "pipeline panicked".to_string()
    }
}

/// Runs uploads through the pipeline in the background. At most
/// `max_concurrent` jobs process at once; the rest wait as pending.
pub struct JobManager {
    registry: Arc<JobRegistry>,
    pipeline: Arc<Pipeline>,
    workers: Arc<Semaphore>,
    metrics: Arc<Metrics>,
}

impl JobManager {
    pub fn new(pipeline: Arc<Pipeline>, max_concurrent: usize, metrics: Arc<Metrics>) -> Self {
        Self {
            registry: Arc::new(JobRegistry::new()),
            pipeline,
            workers: Arc::new(Semaphore::new(max_concurrent.max(1))),
            metrics,
        }
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    pub fn get(&self, job_id: &str) -> Option<Job> {
        self.registry.get(job_id)
    }

    /// Register a pending job and return its id at once; the document is
    /// processed on a background task.
    pub fn submit(&self, filename: String, bytes: Vec<u8>) -> String {
        let job_id = self.registry.create(&filename);
        self.metrics.record_job_submitted();
        info!(job_id = %job_id, filename = %filename, bytes = bytes.len(), "Job submitted");

        let registry = Arc::clone(&self.registry);
        let pipeline = Arc::clone(&self.pipeline);
        let workers = Arc::clone(&self.workers);
        let metrics = Arc::clone(&self.metrics);
        let id = job_id.clone();

        tokio::spawn(async move {
            let _permit = match workers.acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    registry.fail(&id, format!("Worker pool closed: {}", e));
                    metrics.record_job_finished(false);
                    return;
                }
            };

            registry.start(&id);
            info!(job_id = %id, "Job started");

            // Inner task so a panic in the pipeline surfaces as a JoinError
            let run = {
                let registry = Arc::clone(&registry);
                let id = id.clone();
                tokio::spawn(async move {
                    let progress = |percent: f64| {
                        registry.update_progress(&id, percent);
                    };
                    pipeline.run(&filename, &bytes, &progress).await
                })
            };

            match run.await {
                Ok(Ok(outcome)) => {
                    registry.complete(&id, outcome);
                    metrics.record_job_finished(true);
                    info!(job_id = %id, "Job completed");
                }
                Ok(Err(e)) => {
                    error!(job_id = %id, error = %e, "Job failed");
                    registry.fail(&id, e.to_string());
                    metrics.record_job_finished(false);
                }
                Err(join_error) => {
                    let message = join_failure_message(join_error);
                    error!(job_id = %id, error = %message, "Job aborted");
                    registry.fail(&id, message);
                    metrics.record_job_finished(false);
                }
            }
        });

        job_id
    }

    /// Process an upload on the caller's behalf, outside the worker pool.
    /// Runs on its own task so a panic comes back as an error.
    pub async fn run_now(&self, filename: String, bytes: Vec<u8>) -> Result<IngestOutcome, ApiError> {
        let pipeline = Arc::clone(&self.pipeline);
        let run = tokio::spawn(async move { pipeline.run(&filename, &bytes, &NoProgress).await });

        match run.await {
            Ok(result) => Ok(result?),
            Err(join_error) => {
                let message = join_failure_message(join_error);
                error!(error = %message, "Synchronous ingest aborted");
                Err(ApiError::Internal(anyhow::anyhow!("Ingestion aborted: {}", message)))
            }
        }
    }
}
