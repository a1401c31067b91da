//! Object-created trigger events.
//!
//! Two shapes are accepted:
//!
//! - S3 style: `{"Records": [{"s3": {"bucket": {"name": ..}, "object": {"key": ..}}}]}`;
//!   only the first record is used.
//! - GCS style: `{"name": <key>, "bucket": <bucket>}`.

use serde::Deserialize;

/// Errors produced while decoding a trigger event.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("event is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("event has no records")]
    NoRecords,

    #[error("event is missing {0}")]
    Missing(&'static str),
}

/// The object a job is created for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerEvent {
    pub key: String,
    pub bucket: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawEvent {
    S3 {
        #[serde(rename = "Records")]
        records: Vec<S3Record>,
    },
    Gcs {
        name: String,
        bucket: String,
    },
}

#[derive(Deserialize)]
struct S3Record {
    s3: S3Entity,
}

#[derive(Deserialize)]
struct S3Entity {
    bucket: S3Bucket,
    object: S3Object,
}

#[derive(Deserialize)]
struct S3Bucket {
    name: String,
}

#[derive(Deserialize)]
struct S3Object {
    key: String,
}

impl TriggerEvent {
    pub fn new(key: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            bucket: bucket.into(),
        }
    }

    /// Decode either event shape.
    pub fn from_json(raw: &str) -> Result<Self, EventError> {
        let event = match serde_json::from_str::<RawEvent>(raw)? {
            RawEvent::S3 { records } => {
                let record = records.into_iter().next().ok_or(EventError::NoRecords)?;
                Self::new(record.s3.object.key, record.s3.bucket.name)
            }
            RawEvent::Gcs { name, bucket } => Self::new(name, bucket),
        };

        if event.key.is_empty() {
            return Err(EventError::Missing("object key"));
        }
        if event.bucket.is_empty() {
            return Err(EventError::Missing("bucket name"));
        }
        Ok(event)
    }
}
