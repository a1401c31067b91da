//! Learn the input's duration and sample rate from the probe tool.

use async_trait::async_trait;
use wc_av::tools::FFPROBE;
use wc_av::{probe_args, TextStreamScanner, ToolCommand};
use wc_core::Error;

use crate::context::StageContext;
use crate::job::{Job, JobState};
use crate::stage::Stage;

/// Succeeds only when the probe exits 0 *and* reported a duration.
#[derive(Debug, Default)]
pub struct ProbeStage;

#[async_trait]
impl Stage for ProbeStage {
    fn name(&self) -> &'static str {
        "probe"
    }

    fn completes(&self) -> JobState {
        JobState::Probed
    }

    async fn run(&self, job: &mut Job, ctx: &StageContext) -> wc_core::Result<()> {
        let tool = ctx
            .tools
            .require(FFPROBE)
            .map_err(|e| Error::Probe(e.to_string()))?;

        let mut scanner = TextStreamScanner::new();
        let mut cmd = ToolCommand::new(tool.path.clone());
        cmd.args(probe_args(&job.input_path))
            .timeout(ctx.config.stages.timeout());
        let output = cmd
            .stream(|line| {
                scanner.feed(line);
            })
            .await
            .map_err(|e| super::relabel(e, Error::Probe))?;

        job.duration_ms = scanner.duration_ms();
        job.sample_rate_hz = scanner.sample_rate_hz();
        tracing::info!(
            key = %job.key,
            duration_ms = ?job.duration_ms,
            sample_rate_hz = ?job.sample_rate_hz,
            status = %output.status,
            "Probed input"
        );

        if job.duration_ms.is_none() {
            return Err(Error::Probe("no duration reported".into()));
        }
        if !output.success() {
            return Err(Error::Probe(format!("probe exited with {}", output.status)));
        }
        Ok(())
    }
}
