//! Stage factory: build the stage list a job runs.

use wc_core::WorkerConfig;

use crate::stage::Stage;
use crate::stages::{
    ConvertStage, DownloadStage, FinalizeStage, ProbeStage, TranscodeStage, UploadStage,
};

/// The standard pipeline for `config`.
///
/// `download -> probe -> transcode -> convert -> upload`, followed by
/// `finalize` when a completion channel is configured. Tools are resolved
/// when each stage runs, so a missing tool fails that stage rather than the
/// whole job setup.
pub fn create_stages(config: &WorkerConfig) -> Vec<Box<dyn Stage>> {
    let mut stages: Vec<Box<dyn Stage>> = vec![
        Box::new(DownloadStage),
        Box::new(ProbeStage),
        Box::new(TranscodeStage),
        Box::new(ConvertStage),
        Box::new(UploadStage),
    ];

    match config.notify.completion_channel.as_deref() {
        Some(channel) if !channel.is_empty() => {
            stages.push(Box::new(FinalizeStage::new(channel)));
        }
        _ => {}
    }

    stages
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(stages: &[Box<dyn Stage>]) -> Vec<&'static str> {
        stages.iter().map(|s| s.name()).collect()
    }

    #[test]
    fn default_pipeline_has_no_finalize() {
        let stages = create_stages(&WorkerConfig::default());
        assert_eq!(
            names(&stages),
            vec!["download", "probe", "transcode", "convert", "upload"]
        );
    }

    #[test]
    fn completion_channel_appends_finalize() {
        let mut config = WorkerConfig::default();
        config.notify.completion_channel = Some("transcodings".into());
        let stages = create_stages(&config);
        assert_eq!(names(&stages).last(), Some(&"finalize"));
    }

    #[test]
    fn empty_completion_channel_is_ignored() {
        let mut config = WorkerConfig::default();
        config.notify.completion_channel = Some(String::new());
        assert_eq!(create_stages(&config).len(), 5);
    }
}
