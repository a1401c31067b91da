//! Per-job state.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Name of the raw magnitude table inside the working directory.
pub const SAMPLE_TABLE: &str = "samples.csv";
/// Name of the waveform document in the segmented layout.
pub const WAVEFORM_FILE: &str = "waveform.json";

/// Position of a job in its lifecycle.
///
/// ```text
/// Created -> Downloaded -> Probed -> Processed -> Converted -> Uploaded -> Finalized -> TornDown
///    \__________\___________\_________\___________\____________\-> Failed -> TornDown
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Created,
    Downloaded,
    Probed,
    Processed,
    Converted,
    Uploaded,
    Finalized,
    Failed,
    TornDown,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        self == JobState::TornDown
    }

    /// Whether moving to `next` is a legal transition.
    pub fn can_advance_to(self, next: JobState) -> bool {
        use JobState::*;
        match (self, next) {
            (TornDown, _) => false,
            (_, TornDown) => true,
            (Failed, _) => false,
            (_, Failed) => true,
            (Created, Downloaded)
            | (Downloaded, Probed)
            | (Probed, Processed)
            | (Processed, Converted)
            | (Converted, Uploaded)
            | (Uploaded, Finalized) => true,
            _ => false,
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobState::Created => "created",
            JobState::Downloaded => "downloaded",
            JobState::Probed => "probed",
            JobState::Processed => "processed",
            JobState::Converted => "converted",
            JobState::Uploaded => "uploaded",
            JobState::Finalized => "finalized",
            JobState::Failed => "failed",
            JobState::TornDown => "torn_down",
        };
        f.write_str(s)
    }
}

/// One unit of work: a single uploaded object.
#[derive(Debug, Clone, Serialize)]
pub struct Job {
    /// Object key; also the notification channel and group.
    pub key: String,
    /// Bucket the source object lives in.
    pub bucket: String,
    pub duration_ms: Option<u64>,
    pub sample_rate_hz: Option<u32>,
    /// Directory holding every artifact produced for this job.
    pub work_dir: PathBuf,
    /// Local copy of the source object.
    pub input_path: PathBuf,
    pub created_at: DateTime<Utc>,
    pub state: JobState,
}

impl Job {
    /// Lay out a job's local paths under `work_root`.
    ///
    /// Keys may contain `/`; local names use [`Job::slug`] so every job gets
    /// a single flat directory.
    pub fn new(key: impl Into<String>, bucket: impl Into<String>, work_root: &Path) -> Self {
        let key = key.into();
        let slug = slug(&key);
        Self {
            work_dir: work_root.join(&slug),
            input_path: work_root.join(format!("{slug}.source")),
            key,
            bucket: bucket.into(),
            duration_ms: None,
            sample_rate_hz: None,
            created_at: Utc::now(),
            state: JobState::Created,
        }
    }

    /// Filesystem-safe form of the key.
    pub fn slug(&self) -> String {
        slug(&self.key)
    }

    pub fn sample_table(&self) -> PathBuf {
        self.work_dir.join(SAMPLE_TABLE)
    }

    /// Move to `next`, ignoring illegal transitions.
    pub fn advance(&mut self, next: JobState) {
        if self.state.can_advance_to(next) {
            tracing::debug!(key = %self.key, from = %self.state, to = %next, "Job state");
            self.state = next;
        } else {
            tracing::warn!(key = %self.key, from = %self.state, to = %next, "Ignoring illegal job transition");
        }
    }
}

fn slug(key: &str) -> String {
    let flat: String = key
        .chars()
        .map(|c| match c {
            '/' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    // `.`, `..` and the empty key would resolve to the work root or above it.
    if flat.is_empty() || flat.chars().all(|c| c == '.') {
        format!("_{flat}")
    } else {
        flat
    }
}
