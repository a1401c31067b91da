//! Transcode the input while reporting progress and dumping the sample table.

use async_trait::async_trait;
use tokio::sync::mpsc;
use wc_av::tools::FFMPEG;
use wc_av::{samples_per_pixel, transcode_args, ProgressTracker, TextStreamScanner, ToolCommand};
use wc_core::{Error, ProgressEvent};

use crate::context::StageContext;
use crate::job::{Job, JobState};
use crate::stage::Stage;

/// Runs the transcode tool, publishing edge-triggered, throttled percentages.
///
/// Success is followed by a forced `100`; any failure by a forced `error`.
#[derive(Debug, Default)]
pub struct TranscodeStage;

impl TranscodeStage {
    async fn transcode(&self, job: &Job, ctx: &StageContext) -> wc_core::Result<()> {
        let tool = ctx
            .tools
            .require(FFMPEG)
            .map_err(|e| Error::Transcode(e.to_string()))?;
        let duration_ms = job
            .duration_ms
            .ok_or_else(|| Error::Transcode("duration unknown".into()))?;
        let sample_rate_hz = job
            .sample_rate_hz
            .ok_or_else(|| Error::Transcode("sample rate unknown".into()))?;

        let width = ctx.config.waveform.width;
        let spp = samples_per_pixel(duration_ms, sample_rate_hz, width);
        let target = super::media_target(job, &ctx.config.output);
        tracing::info!(key = %job.key, duration_ms, sample_rate_hz, samples_per_pixel = spp, "Starting transcode");

        let mut cmd = ToolCommand::new(tool.path.clone());
        cmd.args(transcode_args(
            &job.input_path,
            &target,
            width,
            spp,
            &job.sample_table(),
        ))
        .timeout(ctx.config.stages.timeout());

        // Percentages are computed while reading and published in order by a
        // second future, so the read loop never waits on the sink.
        let (tx, mut rx) = mpsc::unbounded_channel::<u8>();
        let mut scanner = TextStreamScanner::new();
        let mut tracker = ProgressTracker::new(Some(duration_ms));

        let read = cmd.stream(move |line| {
            if scanner.feed(line) {
                if let Some(percent) = tracker.update(scanner.position_ms()) {
                    let _ = tx.send(percent);
                }
            }
        });
        let publish = async {
            while let Some(percent) = rx.recv().await {
                ctx.notifier
                    .notify(&ProgressEvent::percent(percent), false)
                    .await;
            }
        };
        let (output, ()) = tokio::join!(read, publish);
        let output = output.map_err(|e| super::relabel(e, Error::Transcode))?;

        tracing::info!(key = %job.key, status = %output.status, lines = output.lines, "Transcode finished");
        if !output.success() {
            return Err(Error::Transcode(format!("transcode exited with {}", output.status)));
        }
        Ok(())
    }
}

#[async_trait]
impl Stage for TranscodeStage {
    fn name(&self) -> &'static str {
        "transcode"
    }

    fn completes(&self) -> JobState {
        JobState::Processed
    }

    async fn run(&self, job: &mut Job, ctx: &StageContext) -> wc_core::Result<()> {
        let result = self.transcode(job, ctx).await;
        let terminal = match result {
            Ok(()) => ProgressEvent::percent(100),
            Err(_) => ProgressEvent::Error,
        };
        ctx.notifier.notify(&terminal, true).await;
        result
    }
}
