//! The job handler: one trigger event in, the `"ok"` sentinel out.

use std::sync::Arc;

use wc_av::ToolRegistry;
use wc_core::config::SinkConfig;
use wc_core::WorkerConfig;
use wc_pipeline::{JobReport, PipelineRunner, WorkerContext};
use wc_store::{
    CacheSink, FsObjectStore, MemcacheClient, NotificationSink, PubSubSink, QueueSink, Spool,
};

use crate::event::TriggerEvent;

/// Value returned for every handled event, whatever the job outcome.
pub const SENTINEL: &str = "ok";

/// Long-lived worker holding the collaborators shared by every job.
pub struct Worker {
    context: WorkerContext,
    runner: PipelineRunner,
}

impl Worker {
    /// Assemble a worker from explicit collaborators.
    pub fn new(context: WorkerContext) -> Self {
        let runner = PipelineRunner::from_config(&context.config);
        Self { context, runner }
    }

    /// Build the collaborators described by `config`.
    ///
    /// # Errors
    ///
    /// Fails when the config is invalid or cache cluster discovery fails.
    pub async fn from_config(config: WorkerConfig) -> wc_core::Result<Self> {
        config.check()?;

        let store = Arc::new(FsObjectStore::new(&config.store.root));
        let sink = build_sink(&config.sink).await?;
        let tools = Arc::new(ToolRegistry::discover(&config.tools));
        tracing::info!(
            sink = sink.kind(),
            store = %config.store.root.display(),
            work_dir = %config.work_dir.display(),
            "Worker ready"
        );

        Ok(Self::new(WorkerContext::new(
            store,
            sink,
            tools,
            Arc::new(config),
        )))
    }

    pub fn context(&self) -> &WorkerContext {
        &self.context
    }

    /// Run one job to completion, including teardown.
    pub async fn process(&self, event: &TriggerEvent) -> JobReport {
        self.runner
            .run_job(&self.context, &event.key, &event.bucket)
            .await
    }

    /// Handle a trigger event. Failures surface only as notifications; the
    /// return value is always [`SENTINEL`].
    pub async fn handle(&self, event: &TriggerEvent) -> &'static str {
        let report = self.process(event).await;
        tracing::debug!(key = %report.job.key, outcome = ?report.outcome, "Handled event");
        SENTINEL
    }
}

async fn build_sink(config: &SinkConfig) -> wc_core::Result<Arc<dyn NotificationSink>> {
    let sink: Arc<dyn NotificationSink> = match config {
        SinkConfig::Queue { spool_dir } => Arc::new(QueueSink::new(Arc::new(Spool::new(spool_dir)))),
        SinkConfig::Cache {
            endpoint,
            discover,
            ttl_secs,
        } => {
            let client = if *discover {
                MemcacheClient::discover(endpoint, *ttl_secs).await?
            } else {
                MemcacheClient::new(endpoint.as_str(), *ttl_secs)
            };
            tracing::info!(node = client.addr(), "Using cache sink");
            Arc::new(CacheSink::new(Arc::new(client)))
        }
        SinkConfig::PubSub { project, spool_dir } => Arc::new(PubSubSink::new(
            Arc::new(Spool::new(spool_dir)),
            project.as_str(),
        )),
    };
    Ok(sink)
}
