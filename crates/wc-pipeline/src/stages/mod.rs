//! Built-in pipeline stages, in the order they run.

mod convert;
mod download;
mod finalize;
mod probe;
mod transcode;
mod upload;

pub use convert::ConvertStage;
pub use download::DownloadStage;
pub use finalize::FinalizeStage;
pub use probe::ProbeStage;
pub use transcode::TranscodeStage;
pub use upload::UploadStage;

use std::path::PathBuf;

use wc_av::TranscodeTarget;
use wc_core::config::{OutputConfig, OutputLayout};
use wc_core::Error;

use crate::job::{Job, WAVEFORM_FILE};

/// Where the transcode writes its media for `job`.
pub fn media_target(job: &Job, output: &OutputConfig) -> TranscodeTarget {
    match output.layout {
        OutputLayout::Hls => TranscodeTarget::Hls {
            dir: job.work_dir.clone(),
            segment_seconds: output.segment_seconds,
        },
        OutputLayout::SingleFile => {
            TranscodeTarget::File(job.work_dir.join(format!("{}.{}", job.slug(), output.extension)))
        }
    }
}

/// Where the waveform document for `job` is written.
pub fn waveform_path(job: &Job, output: &OutputConfig) -> PathBuf {
    match output.layout {
        OutputLayout::Hls => job.work_dir.join(WAVEFORM_FILE),
        OutputLayout::SingleFile => job.work_dir.join(format!("{}.json", job.slug())),
    }
}

/// Re-label a collaborator error as a stage failure, keeping timeouts.
fn relabel(e: Error, wrap: fn(String) -> Error) -> Error {
    match e {
        Error::Timeout(_) => e,
        other => wrap(other.to_string()),
    }
}
