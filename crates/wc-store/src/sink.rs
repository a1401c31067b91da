//! Notification sinks.
//!
//! The pipeline only knows [`NotificationSink`]: publish `message` on
//! `channel`, grouped by `group`. Each adapter maps that onto one transport:
//!
//! - [`QueueSink`] -- FIFO queue `<channel>.fifo`, ordered per group.
//! - [`CacheSink`] -- cache slot `<channel>`; last write wins, readers poll.
//! - [`PubSubSink`] -- topic `projects/<project>/topics/<channel>`.

use std::sync::Arc;

use async_trait::async_trait;

/// Capability to publish a keyed message.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn publish(&self, channel: &str, group: &str, message: &str) -> wc_core::Result<()>;

    /// Short transport name for logs.
    fn kind(&self) -> &'static str;
}

/// A queue service client.
#[async_trait]
pub trait QueueClient: Send + Sync {
    async fn send(&self, queue: &str, body: &str, group: &str) -> wc_core::Result<()>;
}

/// A key/value cache client.
#[async_trait]
pub trait CacheClient: Send + Sync {
    async fn set(&self, key: &str, value: &str) -> wc_core::Result<()>;
}

/// A topic-based pub/sub client.
#[async_trait]
pub trait TopicClient: Send + Sync {
    async fn publish(&self, topic: &str, message: &str) -> wc_core::Result<()>;
}

/// Queue name suffix required for ordered delivery.
const FIFO_SUFFIX: &str = ".fifo";

/// Publishes to a FIFO queue per channel.
pub struct QueueSink<C> {
    client: Arc<C>,
}

impl<C: QueueClient> QueueSink<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self { client }
    }

    /// `<channel>.fifo`, unless the channel already names a FIFO queue.
    pub fn queue_name(channel: &str) -> String {
        if channel.ends_with(FIFO_SUFFIX) {
            channel.to_string()
        } else {
            format!("{channel}{FIFO_SUFFIX}")
        }
    }
}

#[async_trait]
impl<C: QueueClient> NotificationSink for QueueSink<C> {
    async fn publish(&self, channel: &str, group: &str, message: &str) -> wc_core::Result<()> {
        self.client
            .send(&Self::queue_name(channel), message, group)
            .await
    }

    fn kind(&self) -> &'static str {
        "queue"
    }
}

/// Writes each message into the cache slot named by the channel.
///
/// The group is not used: a cache slot has no ordering, only the latest
/// value survives.
pub struct CacheSink<C> {
    client: Arc<C>,
}

impl<C: CacheClient> CacheSink<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<C: CacheClient> NotificationSink for CacheSink<C> {
    async fn publish(&self, channel: &str, _group: &str, message: &str) -> wc_core::Result<()> {
        self.client.set(channel, message).await
    }

    fn kind(&self) -> &'static str {
        "cache"
    }
}

/// Publishes to one topic per channel inside a project.
pub struct PubSubSink<C> {
    client: Arc<C>,
    project: String,
}

impl<C: TopicClient> PubSubSink<C> {
    pub fn new(client: Arc<C>, project: impl Into<String>) -> Self {
        Self {
            client,
            project: project.into(),
        }
    }

    pub fn topic_path(&self, channel: &str) -> String {
        format!("projects/{}/topics/{channel}", self.project)
    }
}

#[async_trait]
impl<C: TopicClient> NotificationSink for PubSubSink<C> {
    async fn publish(&self, channel: &str, _group: &str, message: &str) -> wc_core::Result<()> {
        self.client.publish(&self.topic_path(channel), message).await
    }

    fn kind(&self) -> &'static str {
        "pubsub"
    }
}
