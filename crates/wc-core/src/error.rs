//! Unified error type for the wavecast worker.
//!
//! All crates funnel their failures into [`Error`]. Stage failures carry
//! enough context for the runner to name the failure category via
//! [`Error::failure_kind`].

use std::fmt;
use std::time::Duration;

/// Category of a stage failure, used for logging at the stage boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Download,
    Probe,
    Transcode,
    Convert,
    Upload,
    Notify,
    Timeout,
    Other,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::Download => "download",
            FailureKind::Probe => "probe",
            FailureKind::Transcode => "transcode",
            FailureKind::Convert => "convert",
            FailureKind::Upload => "upload",
            FailureKind::Notify => "notify",
            FailureKind::Timeout => "timeout",
            FailureKind::Other => "other",
        };
        f.write_str(s)
    }
}

/// Unified error type covering all failure modes in wavecast.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Fetching the source object failed.
    #[error("Download failed: {0}")]
    Download(String),

    /// The probe tool failed or never reported a duration.
    #[error("Probe failed: {0}")]
    Probe(String),

    /// The transcode tool exited unsuccessfully.
    #[error("Transcode failed: {0}")]
    Transcode(String),

    /// The raw sample table could not be converted.
    #[error("Convert failed: {0}")]
    Convert(String),

    /// Uploading an artifact failed.
    #[error("Upload failed [{key}]: {message}")]
    Upload {
        /// Remote key of the artifact that failed.
        key: String,
        /// Human-readable error description.
        message: String,
    },

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// An external tool (ffmpeg, ffprobe) could not be run.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// An object-store operation failed.
    #[error("Store error [{bucket}/{key}]: {message}")]
    Store {
        bucket: String,
        key: String,
        message: String,
    },

    /// Publishing a notification failed.
    #[error("Notify error [{channel}]: {message}")]
    Notify { channel: String, message: String },

    /// Configuration could not be loaded or is invalid.
    #[error("Config error: {0}")]
    Config(String),

    /// A stage exceeded its time budget.
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// A pipeline stage failed for a reason not covered above.
    #[error("Stage error [{step}]: {message}")]
    Stage { step: String, message: String },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// The stage-failure category this error belongs to.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Error::Download(_) => FailureKind::Download,
            Error::Probe(_) => FailureKind::Probe,
            Error::Transcode(_) => FailureKind::Transcode,
            Error::Convert(_) => FailureKind::Convert,
            Error::Upload { .. } => FailureKind::Upload,
            Error::Notify { .. } => FailureKind::Notify,
            Error::Timeout(_) => FailureKind::Timeout,
            Error::Io { .. }
            | Error::Tool { .. }
            | Error::Store { .. }
            | Error::Config(_)
            | Error::Stage { .. }
            | Error::Internal(_) => FailureKind::Other,
        }
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::Store`].
    pub fn store(
        bucket: impl Into<String>,
        key: impl Into<String>,
        message: impl fmt::Display,
    ) -> Self {
        Error::Store {
            bucket: bucket.into(),
            key: key.into(),
            message: message.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Upload`].
    pub fn upload(key: impl Into<String>, message: impl fmt::Display) -> Self {
        Error::Upload {
            key: key.into(),
            message: message.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Notify`].
    pub fn notify(channel: impl Into<String>, message: impl fmt::Display) -> Self {
        Error::Notify {
            channel: channel.into(),
            message: message.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Stage`].
    pub fn stage(step: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Stage {
            step: step.into(),
            message: message.into(),
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn download_display() {
        let err = Error::Download("no such key".into());
        assert_eq!(err.to_string(), "Download failed: no such key");
        assert_eq!(err.failure_kind(), FailureKind::Download);
    }

    #[test]
    fn probe_display() {
        let err = Error::Probe("no duration reported".into());
        assert_eq!(err.to_string(), "Probe failed: no duration reported");
        assert_eq!(err.failure_kind(), FailureKind::Probe);
    }

    #[test]
    fn upload_display() {
        let err = Error::upload("song/playlist.m3u8", "connection reset");
        assert_eq!(
            err.to_string(),
            "Upload failed [song/playlist.m3u8]: connection reset"
        );
        assert_eq!(err.failure_kind(), FailureKind::Upload);
    }

    #[test]
    fn store_display() {
        let err = Error::store("in", "song.wav", "access denied");
        assert_eq!(err.to_string(), "Store error [in/song.wav]: access denied");
        assert_eq!(err.failure_kind(), FailureKind::Other);
    }

    #[test]
    fn tool_display() {
        let err = Error::tool("ffmpeg", "failed to spawn");
        assert_eq!(err.to_string(), "Tool error [ffmpeg]: failed to spawn");
    }

    #[test]
    fn timeout_kind() {
        let err = Error::Timeout(Duration::from_secs(3));
        assert_eq!(err.to_string(), "Timed out after 3s");
        assert_eq!(err.failure_kind(), FailureKind::Timeout);
    }

    #[test]
    fn io_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err = Error::from(io_err);
        assert!(matches!(err, Error::Io { .. }));
        assert_eq!(err.failure_kind(), FailureKind::Other);
    }

    #[test]
    fn failure_kind_display() {
        assert_eq!(FailureKind::Transcode.to_string(), "transcode");
        assert_eq!(FailureKind::Convert.to_string(), "convert");
    }
}
