//! # wc-store
//!
//! Interfaces to the external systems a job talks to, plus the adapters
//! and clients the worker ships with.
//!
//! - **[`ObjectStore`]** -- download / upload / delete objects, with a
//!   directory-backed [`FsObjectStore`].
//! - **[`NotificationSink`]** -- "publish a keyed message", with adapters
//!   over a FIFO queue ([`QueueSink`]), a keyed cache slot ([`CacheSink`]),
//!   and a topic per key ([`PubSubSink`]).
//! - **Clients** -- a file-backed [`Spool`] for queues and topics, and a
//!   memcached [`MemcacheClient`] with cluster auto-discovery
//!   ([`discover_cluster`]).

pub mod memcache;
pub mod object_store;
pub mod sink;
pub mod spool;

pub use memcache::{discover_cluster, parse_cluster_config, ClusterNode, MemcacheClient};
pub use object_store::{FsObjectStore, ObjectStore, UploadOptions};
pub use sink::{
    CacheClient, CacheSink, NotificationSink, PubSubSink, QueueClient, QueueSink, TopicClient,
};
pub use spool::{Spool, SpoolRecord};
