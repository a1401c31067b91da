//! Announce a finished job on the completion channel.

use async_trait::async_trait;
use wc_core::ProgressEvent;

use crate::context::StageContext;
use crate::job::{Job, JobState};
use crate::stage::Stage;

/// Publishes `{"key": <key>, "duration": <ms>}` to a shared channel.
///
/// Runs on the success path only, before teardown. A completion that cannot
/// be published fails the stage.
#[derive(Debug, Clone)]
pub struct FinalizeStage {
    channel: String,
}

impl FinalizeStage {
    pub fn new(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
        }
    }
}

#[async_trait]
impl Stage for FinalizeStage {
    fn name(&self) -> &'static str {
        "finalize"
    }

    fn completes(&self) -> JobState {
        JobState::Finalized
    }

    async fn run(&self, job: &mut Job, ctx: &StageContext) -> wc_core::Result<()> {
        let duration_ms = job
            .duration_ms
            .ok_or_else(|| wc_core::Error::stage(self.name(), "duration unknown"))?;
        let event = ProgressEvent::Done {
            key: job.key.clone(),
            duration_ms,
        };
        ctx.notifier.publish_channel(&self.channel, &event).await?;
        tracing::info!(key = %job.key, channel = %self.channel, "Sent completion");
        Ok(())
    }
}
