//! Turn the raw sample table into the waveform document.

use async_trait::async_trait;
use wc_av::WaveformConverter;

use crate::context::StageContext;
use crate::job::{Job, JobState};
use crate::stage::Stage;

#[derive(Debug, Default)]
pub struct ConvertStage;

#[async_trait]
impl Stage for ConvertStage {
    fn name(&self) -> &'static str {
        "convert"
    }

    fn completes(&self) -> JobState {
        JobState::Converted
    }

    async fn run(&self, job: &mut Job, ctx: &StageContext) -> wc_core::Result<()> {
        let waveform = &ctx.config.waveform;
        let converter = WaveformConverter::new(waveform.width, waveform.height);
        let json_path = super::waveform_path(job, &ctx.config.output);

        let document = converter.convert_file(&job.sample_table(), &json_path)?;
        tracing::info!(key = %job.key, samples = document.samples.len(), "Converted waveform");
        Ok(())
    }
}
