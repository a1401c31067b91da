//! The [`Stage`] trait defines one step of a job.

use async_trait::async_trait;

use crate::context::StageContext;
use crate::job::{Job, JobState};

/// A single step in the per-job pipeline.
///
/// Stages record what they learn on the [`Job`]. An `Err` halts the
/// pipeline; the runner notifies, marks the job failed, and tears down.
#[async_trait]
pub trait Stage: Send + Sync {
    /// A short name for logs (e.g. "probe").
    fn name(&self) -> &'static str;

    /// State the job reaches when this stage succeeds.
    fn completes(&self) -> JobState;

    async fn run(&self, job: &mut Job, ctx: &StageContext) -> wc_core::Result<()>;
}
