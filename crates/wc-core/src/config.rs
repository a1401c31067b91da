//! Worker configuration.
//!
//! The top-level [`WorkerConfig`] is deserialized from TOML and carries every
//! setting the worker needs. Every section defaults sensibly so an empty file
//! is valid. After loading, the deployment environment variables `BUCKET`
//! and `WORK_DIR` override the file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Default locations searched when no explicit config path is given.
const DEFAULT_PATHS: &[&str] = &[
    "./wavecast.toml",
    "~/.config/wavecast/config.toml",
    "/etc/wavecast/config.toml",
];

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root worker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Root under which per-job working directories are created.
    pub work_dir: PathBuf,
    /// Bucket receiving the transcoded artifacts.
    pub output_bucket: String,
    /// Whether the source object is deleted from the input bucket on teardown.
    pub delete_source: bool,
    pub waveform: WaveformConfig,
    pub notify: NotifyConfig,
    pub stages: StageConfig,
    pub tools: ToolsConfig,
    pub output: OutputConfig,
    pub sink: SinkConfig,
    pub store: StoreConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("/tmp"),
            output_bucket: String::new(),
            delete_source: true,
            waveform: WaveformConfig::default(),
            notify: NotifyConfig::default(),
            stages: StageConfig::default(),
            tools: ToolsConfig::default(),
            output: OutputConfig::default(),
            sink: SinkConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

impl WorkerConfig {
    /// Deserialize a config from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| Error::Config(format!("parse error: {e}")))
    }

    /// Load and check a config file. Hard errors fail; warnings are logged.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;
        let config = Self::from_toml(&contents)?;
        config.check()?;
        for warning in config.validate() {
            tracing::warn!("{}: {warning}", path.display());
        }
        Ok(config)
    }

    /// Load from the explicit path if given, else from the first default
    /// location that exists, else fall back to defaults.
    pub fn load_or_default(custom_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = custom_path {
            return Self::load(path);
        }

        for path_str in DEFAULT_PATHS {
            let expanded = shellexpand::tilde(path_str);
            let path = Path::new(expanded.as_ref());
            if path.exists() {
                return Self::load(path);
            }
        }

        tracing::debug!("No config file found; using defaults");
        Ok(Self::default())
    }

    /// Apply `BUCKET` / `WORK_DIR` overrides from the process environment.
    pub fn apply_process_env(&mut self) {
        self.apply_env(|name| std::env::var(name).ok());
    }

    /// Apply overrides using the given variable lookup.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(bucket) = lookup("BUCKET").filter(|b| !b.is_empty()) {
            self.output_bucket = bucket;
        }
        if let Some(dir) = lookup("WORK_DIR").filter(|d| !d.is_empty()) {
            self.work_dir = PathBuf::from(dir);
        }
    }

    /// Hard errors that make the worker unusable.
    pub fn check(&self) -> Result<()> {
        if self.waveform.width == 0 || self.waveform.height == 0 {
            return Err(Error::Config(format!(
                "waveform dimensions must be non-zero (got {}x{})",
                self.waveform.width, self.waveform.height
            )));
        }
        if self.stages.timeout_secs == 0 {
            return Err(Error::Config("stages.timeout_secs must be non-zero".into()));
        }
        if let SinkConfig::PubSub { project, .. } = &self.sink {
            if project.is_empty() {
                return Err(Error::Config("sink.project is required for pubsub".into()));
            }
        }
        Ok(())
    }

    /// Return a list of non-fatal issues.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.output_bucket.is_empty() {
            warnings.push("output_bucket is empty; set it or export BUCKET".into());
        }

        if self.notify.throttle_window_ms == 0 {
            warnings.push("notify.throttle_window_ms is 0; every progress change is sent".into());
        }

        if self.notify.completion_channel.as_deref() == Some("") {
            warnings.push("notify.completion_channel is empty; no completion will be sent".into());
        }

        if let SinkConfig::Cache { endpoint, .. } = &self.sink {
            if !endpoint.contains(':') {
                warnings.push(format!("sink.endpoint '{endpoint}' has no port"));
            }
        }

        if let OutputLayout::SingleFile = self.output.layout {
            if self.output.extension.is_empty() {
                warnings.push("output.extension is empty".into());
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// Dimensions of the produced waveform document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveformConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for WaveformConfig {
    fn default() -> Self {
        Self {
            width: 1800,
            height: 140,
        }
    }
}

/// Notification behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Minimum spacing between non-forced progress notifications.
    pub throttle_window_ms: u64,
    /// Channel receiving the completion summary; `None` disables the
    /// finalize stage.
    pub completion_channel: Option<String>,
}

impl NotifyConfig {
    pub fn throttle_window(&self) -> Duration {
        Duration::from_millis(self.throttle_window_ms)
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            throttle_window_ms: 2000,
            completion_channel: None,
        }
    }
}

/// Stage execution limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    /// Time budget for each stage.
    pub timeout_secs: u64,
}

impl StageConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for StageConfig {
    fn default() -> Self {
        Self { timeout_secs: 900 }
    }
}

/// Overrides for external tool locations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg_path: Option<PathBuf>,
    pub ffprobe_path: Option<PathBuf>,
}

/// How transcoded media is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputLayout {
    /// Segmented playlist plus segments inside the working directory.
    Hls,
    /// One media file named after the job key.
    SingleFile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub layout: OutputLayout,
    /// Segment length for the `hls` layout.
    pub segment_seconds: u32,
    /// File extension for the `single_file` layout.
    pub extension: String,
    /// Upload artifacts with public read access.
    pub public: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            layout: OutputLayout::Hls,
            segment_seconds: 8,
            extension: "mp3".into(),
            public: true,
        }
    }
}

/// Where notifications are published.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SinkConfig {
    /// FIFO queue per job key, spooled to files.
    Queue { spool_dir: PathBuf },
    /// Keyed memcached slot, optionally resolved through cluster discovery.
    Cache {
        endpoint: String,
        #[serde(default)]
        discover: bool,
        #[serde(default)]
        ttl_secs: u32,
    },
    /// Topic per job key inside a project, spooled to files.
    PubSub { project: String, spool_dir: PathBuf },
}

impl Default for SinkConfig {
    fn default() -> Self {
        SinkConfig::Queue {
            spool_dir: PathBuf::from("/tmp/wavecast-spool"),
        }
    }
}

/// Object store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory whose sub-directories act as buckets.
    pub root: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/tmp/wavecast-store"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::collections::HashMap;

    #[test]
    fn empty_toml_is_default() {
        let cfg = WorkerConfig::from_toml("").unwrap();
        assert_eq!(cfg.waveform.width, 1800);
        assert_eq!(cfg.waveform.height, 140);
        assert_eq!(cfg.notify.throttle_window(), Duration::from_secs(2));
        assert_eq!(cfg.output.layout, OutputLayout::Hls);
        assert_eq!(cfg.output.segment_seconds, 8);
        assert!(cfg.delete_source);
        assert_matches!(cfg.sink, SinkConfig::Queue { .. });
    }

    #[test]
    fn parses_cache_sink() {
        let cfg = WorkerConfig::from_toml(
            r#"
            output_bucket = "waves"

            [waveform]
            width = 900

            [sink]
            kind = "cache"
            endpoint = "cfg.cache.local:11211"
            discover = true
            "#,
        )
        .unwrap();
        assert_eq!(cfg.output_bucket, "waves");
        assert_eq!(cfg.waveform.width, 900);
        assert_eq!(cfg.waveform.height, 140);
        assert_matches!(
            cfg.sink,
            SinkConfig::Cache { ref endpoint, discover: true, ttl_secs: 0 } if endpoint == "cfg.cache.local:11211"
        );
    }

    #[test]
    fn parses_single_file_layout() {
        let cfg = WorkerConfig::from_toml(
            r#"
            [output]
            layout = "single_file"
            extension = "ogg"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.output.layout, OutputLayout::SingleFile);
        assert_eq!(cfg.output.extension, "ogg");
    }

    #[test]
    fn invalid_toml_is_config_error() {
        let err = WorkerConfig::from_toml("waveform = 3").unwrap_err();
        assert_matches!(err, Error::Config(_));
    }

    #[test]
    fn zero_dimensions_rejected() {
        let mut cfg = WorkerConfig::default();
        cfg.waveform.height = 0;
        assert!(cfg.check().is_err());
    }

    #[test]
    fn pubsub_requires_project() {
        let mut cfg = WorkerConfig::default();
        cfg.sink = SinkConfig::PubSub {
            project: String::new(),
            spool_dir: PathBuf::from("/tmp"),
        };
        assert!(cfg.check().is_err());
    }

    #[test]
    fn env_overrides() {
        let vars: HashMap<&str, &str> = [("BUCKET", "out"), ("WORK_DIR", "/scratch")].into();
        let mut cfg = WorkerConfig::default();
        cfg.apply_env(|name| vars.get(name).map(|v| v.to_string()));
        assert_eq!(cfg.output_bucket, "out");
        assert_eq!(cfg.work_dir, PathBuf::from("/scratch"));
    }

    #[test]
    fn empty_env_values_ignored() {
        let mut cfg = WorkerConfig::default();
        cfg.output_bucket = "keep".into();
        cfg.apply_env(|_| Some(String::new()));
        assert_eq!(cfg.output_bucket, "keep");
        assert_eq!(cfg.work_dir, PathBuf::from("/tmp"));
    }

    #[test]
    fn missing_bucket_warns() {
        let cfg = WorkerConfig::default();
        assert!(cfg.validate().iter().any(|w| w.contains("output_bucket")));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wavecast.toml");
        std::fs::write(&path, "output_bucket = \"b\"\n[stages]\ntimeout_secs = 5\n").unwrap();
        let cfg = WorkerConfig::load(&path).unwrap();
        assert_eq!(cfg.output_bucket, "b");
        assert_eq!(cfg.stages.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn load_missing_explicit_path_errors() {
        let result = WorkerConfig::load_or_default(Some(Path::new("/nonexistent/wavecast.toml")));
        assert!(result.is_err());
    }
}
