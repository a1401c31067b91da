//! Contexts shared by the stages of a pipeline run.

use std::sync::Arc;

use wc_av::ToolRegistry;
use wc_core::WorkerConfig;
use wc_store::{NotificationSink, ObjectStore};

use crate::notifier::Notifier;
use crate::throttle::NotificationThrottle;

/// Process-wide collaborators, built once and handed to every job.
#[derive(Clone)]
pub struct WorkerContext {
    pub store: Arc<dyn ObjectStore>,
    pub sink: Arc<dyn NotificationSink>,
    pub tools: Arc<ToolRegistry>,
    pub config: Arc<WorkerConfig>,
}

impl WorkerContext {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        sink: Arc<dyn NotificationSink>,
        tools: Arc<ToolRegistry>,
        config: Arc<WorkerConfig>,
    ) -> Self {
        Self {
            store,
            sink,
            tools,
            config,
        }
    }

    /// Context for one job. The job's throttle window starts now.
    pub fn for_job(&self, key: &str) -> StageContext {
        let throttle = NotificationThrottle::new(self.config.notify.throttle_window());
        StageContext {
            store: Arc::clone(&self.store),
            tools: Arc::clone(&self.tools),
            config: Arc::clone(&self.config),
            notifier: Arc::new(Notifier::new(Arc::clone(&self.sink), key, throttle)),
        }
    }
}

impl std::fmt::Debug for WorkerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerContext")
            .field("sink", &self.sink.kind())
            .finish_non_exhaustive()
    }
}

/// Context passed to every stage of one job.
pub struct StageContext {
    pub store: Arc<dyn ObjectStore>,
    pub tools: Arc<ToolRegistry>,
    pub config: Arc<WorkerConfig>,
    /// Notifications for this job, throttled per job.
    pub notifier: Arc<Notifier>,
}
