//! Notification messages published while a job runs.
//!
//! Messages are transient and never persisted. Their wire shapes are fixed
//! by downstream consumers:
//!
//! | Event | JSON |
//! |---|---|
//! | [`ProgressEvent::Percent`] | `{"type": "percent", "value": 42}` |
//! | [`ProgressEvent::Error`] | `{"type": "error"}` |
//! | [`ProgressEvent::Done`] | `{"key": "<job>", "duration": 10000}` |
//! | [`ProgressEvent::Aborted`] | `{"key": "error"}` |

use serde_json::json;

/// Key used in the abort message in place of a job key.
pub const ABORT_KEY: &str = "error";

/// A single notification about a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Transcode progress, 0..=100.
    Percent(u8),
    /// The transcode stage failed.
    Error,
    /// The job completed; carries the probed duration.
    Done { key: String, duration_ms: u64 },
    /// The pipeline halted on a failed stage.
    Aborted,
}

impl ProgressEvent {
    /// Build a percent event, clamping to 100.
    pub fn percent(value: u8) -> Self {
        ProgressEvent::Percent(value.min(100))
    }

    /// Render the wire representation.
    pub fn to_json(&self) -> String {
        let value = match self {
            ProgressEvent::Percent(v) => json!({ "type": "percent", "value": v }),
            ProgressEvent::Error => json!({ "type": "error" }),
            ProgressEvent::Done { key, duration_ms } => {
                json!({ "key": key, "duration": duration_ms })
            }
            ProgressEvent::Aborted => json!({ "key": ABORT_KEY }),
        };
        value.to_string()
    }
}
