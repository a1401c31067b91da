//! Fetch the source object into the job's local input file.

use async_trait::async_trait;

use crate::context::StageContext;
use crate::job::{Job, JobState};
use crate::stage::Stage;

#[derive(Debug, Default)]
pub struct DownloadStage;

#[async_trait]
impl Stage for DownloadStage {
    fn name(&self) -> &'static str {
        "download"
    }

    fn completes(&self) -> JobState {
        JobState::Downloaded
    }

    async fn run(&self, job: &mut Job, ctx: &StageContext) -> wc_core::Result<()> {
        if !job.work_dir.is_dir() {
            return Err(wc_core::Error::Download(format!(
                "work dir {} is missing",
                job.work_dir.display()
            )));
        }

        ctx.store
            .download(&job.bucket, &job.key, &job.input_path)
            .await
            .map_err(|e| super::relabel(e, wc_core::Error::Download))?;

        tracing::info!(key = %job.key, bucket = %job.bucket, "Downloaded source");
        Ok(())
    }
}
