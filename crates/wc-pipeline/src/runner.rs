//! Pipeline runner: executes a job's stages in order and always tears down.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};

use futures::FutureExt;
use wc_core::{Error, FailureKind, ProgressEvent, WorkerConfig};

use crate::context::{StageContext, WorkerContext};
use crate::factory::create_stages;
use crate::job::{Job, JobState};
use crate::lifecycle::{JobScope, TeardownReport};
use crate::stage::Stage;

/// Extra time a stage gets past its budget before the runner cancels it.
///
/// Stages that enforce the budget themselves (the tool commands) hit their
/// own limit first and can still publish their failure notification.
const STAGE_GRACE: Duration = Duration::from_secs(2);

/// How a pipeline run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failed {
        stage: &'static str,
        kind: FailureKind,
        message: String,
    },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }
}

/// Everything known about a job once it has been torn down.
#[derive(Debug, Clone)]
pub struct JobReport {
    pub job: Job,
    pub outcome: Outcome,
    pub teardown: TeardownReport,
}

/// Runs stages strictly in order, stopping at the first failure.
///
/// Each stage is bounded by a timeout and shielded from panics; both count
/// as ordinary failures. No stage is retried.
pub struct PipelineRunner {
    stages: Vec<Box<dyn Stage>>,
    timeout: Duration,
}

impl PipelineRunner {
    pub fn new(stages: Vec<Box<dyn Stage>>) -> Self {
        Self {
            stages,
            timeout: wc_core::config::StageConfig::default().timeout(),
        }
    }

    /// The standard stage list with the configured per-stage timeout.
    pub fn from_config(config: &WorkerConfig) -> Self {
        Self::new(create_stages(config)).with_timeout(config.stages.timeout())
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run every stage against `job`.
    ///
    /// On the first failure a forced abort notification is sent, the job is
    /// marked [`JobState::Failed`], and the remaining stages are skipped.
    /// Teardown is not part of this call; see [`PipelineRunner::run_job`].
    pub async fn run(&self, job: &mut Job, ctx: &StageContext) -> Outcome {
        for stage in &self.stages {
            let name = stage.name();
            let started = Instant::now();
            tracing::info!(key = %job.key, stage = name, "Starting stage");

            let guarded = AssertUnwindSafe(stage.run(job, ctx)).catch_unwind();
            let result = match tokio::time::timeout(self.timeout + STAGE_GRACE, guarded).await {
                Ok(Ok(result)) => result,
                Ok(Err(panic)) => Err(Error::stage(
                    name,
                    format!("panicked: {}", panic_message(panic.as_ref())),
                )),
                Err(_elapsed) => Err(Error::Timeout(self.timeout)),
            };

            match result {
                Ok(()) => {
                    job.advance(stage.completes());
                    tracing::info!(
                        key = %job.key,
                        stage = name,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Stage finished"
                    );
                }
                Err(e) => {
                    let kind = e.failure_kind();
                    tracing::error!(key = %job.key, stage = name, %kind, "Stage failed: {e}");
                    ctx.notifier.notify(&ProgressEvent::Aborted, true).await;
                    job.advance(JobState::Failed);
                    return Outcome::Failed {
                        stage: name,
                        kind,
                        message: e.to_string(),
                    };
                }
            }
        }
        Outcome::Success
    }

    /// Create, run, and tear down one job for `bucket/key`.
    ///
    /// Teardown happens on every path out of the run. If this future is
    /// dropped early the scope's `Drop` releases local state instead.
    pub async fn run_job(&self, worker: &WorkerContext, key: &str, bucket: &str) -> JobReport {
        let config = &worker.config;
        let mut job = Job::new(key, bucket, &config.work_dir);
        tracing::info!(key = %job.key, bucket = %job.bucket, work_dir = %job.work_dir.display(), "Job created");

        let scope = JobScope::open(&job, &config.work_dir, worker.store.clone(), config.delete_source);
        let ctx = worker.for_job(&job.key);

        let outcome = self.run(&mut job, &ctx).await;

        let teardown = scope.teardown().await;
        job.advance(JobState::TornDown);

        match &outcome {
            Outcome::Success => tracing::info!(key = %job.key, "Job succeeded"),
            Outcome::Failed { stage, kind, .. } => {
                tracing::warn!(key = %job.key, stage, %kind, "Job failed")
            }
        }

        JobReport {
            job,
            outcome,
            teardown,
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".into()
    }
}
