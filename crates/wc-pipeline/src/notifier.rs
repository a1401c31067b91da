//! Per-job notification front-end.

use std::sync::Arc;

use parking_lot::Mutex;
use wc_core::ProgressEvent;
use wc_store::NotificationSink;

use crate::throttle::NotificationThrottle;

/// Publishes a job's events on its own channel, grouped by the job key.
///
/// Progress delivery through [`Notifier::notify`] is fire-and-forget:
/// publish errors are logged and never reach the caller.
/// [`Notifier::publish_channel`] reports them instead.
pub struct Notifier {
    sink: Arc<dyn NotificationSink>,
    key: String,
    throttle: Mutex<NotificationThrottle>,
}

impl Notifier {
    pub fn new(sink: Arc<dyn NotificationSink>, key: impl Into<String>, throttle: NotificationThrottle) -> Self {
        Self {
            sink,
            key: key.into(),
            throttle: Mutex::new(throttle),
        }
    }

    /// Send `event` on the job channel if the throttle admits it.
    ///
    /// Returns whether a publish was attempted.
    pub async fn notify(&self, event: &ProgressEvent, force: bool) -> bool {
        let permitted = self.throttle.lock().permit(force);
        if !permitted {
            tracing::trace!(key = %self.key, ?event, "Throttled notification dropped");
            return false;
        }
        self.deliver(&self.key, event).await;
        true
    }

    /// Send `event` on another channel, bypassing the throttle.
    ///
    /// Still grouped by the job key.
    pub async fn publish_channel(&self, channel: &str, event: &ProgressEvent) -> wc_core::Result<()> {
        let message = event.to_json();
        self.sink.publish(channel, &self.key, &message).await?;
        tracing::debug!(key = %self.key, channel, sink = self.sink.kind(), %message, "Notification sent");
        Ok(())
    }

    async fn deliver(&self, channel: &str, event: &ProgressEvent) {
        if let Err(e) = self.publish_channel(channel, event).await {
            tracing::warn!(key = %self.key, channel, sink = self.sink.kind(), "Failed to notify: {e}");
        }
    }
}
