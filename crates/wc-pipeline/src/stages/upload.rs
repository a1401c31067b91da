//! Publish the job's artifacts to the output bucket.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use walkdir::WalkDir;
use wc_core::config::OutputLayout;
use wc_core::Error;
use wc_store::UploadOptions;

use crate::context::StageContext;
use crate::job::{Job, JobState, SAMPLE_TABLE};
use crate::stage::Stage;

/// Uploads every artifact; the first failure aborts the rest.
#[derive(Debug, Default)]
pub struct UploadStage;

#[async_trait]
impl Stage for UploadStage {
    fn name(&self) -> &'static str {
        "upload"
    }

    fn completes(&self) -> JobState {
        JobState::Uploaded
    }

    async fn run(&self, job: &mut Job, ctx: &StageContext) -> wc_core::Result<()> {
        let config = &ctx.config;
        if config.output_bucket.is_empty() {
            return Err(Error::upload(&job.key, "no output bucket configured"));
        }

        let artifacts = match config.output.layout {
            OutputLayout::Hls => collect_dir(job)?,
            OutputLayout::SingleFile => {
                let media = match super::media_target(job, &config.output) {
                    wc_av::TranscodeTarget::File(path) => path,
                    wc_av::TranscodeTarget::Hls { dir, .. } => dir,
                };
                vec![
                    (media, format!("{}.{}", job.key, config.output.extension)),
                    (
                        super::waveform_path(job, &config.output),
                        format!("{}.json", job.key),
                    ),
                ]
            }
        };
        if artifacts.is_empty() {
            return Err(Error::upload(&job.key, "no artifacts produced"));
        }

        for (local, remote) in &artifacts {
            let options = UploadOptions {
                public: config.output.public,
                metadata: metadata(job, local),
            };
            ctx.store
                .upload(&config.output_bucket, remote, local, &options)
                .await
                .map_err(|e| Error::upload(remote, e))?;
            tracing::info!(key = %job.key, object = %remote, "Uploaded");
        }

        tracing::info!(key = %job.key, count = artifacts.len(), bucket = %config.output_bucket, "Upload complete");
        Ok(())
    }
}

/// Every file in the work dir except the raw table, as `<key>/<relative>`.
fn collect_dir(job: &Job) -> wc_core::Result<Vec<(PathBuf, String)>> {
    let mut artifacts = Vec::new();
    for entry in WalkDir::new(&job.work_dir).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::upload(&job.key, e))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(&job.work_dir)
            .map_err(|e| Error::upload(&job.key, e))?;
        if relative == Path::new(SAMPLE_TABLE) {
            continue;
        }
        let relative: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        artifacts.push((
            entry.path().to_path_buf(),
            format!("{}/{}", job.key, relative.join("/")),
        ));
    }
    Ok(artifacts)
}

fn metadata(job: &Job, local: &Path) -> BTreeMap<String, String> {
    let mut metadata = BTreeMap::new();
    if let Some(duration) = job.duration_ms {
        metadata.insert("duration".into(), duration.to_string());
    }
    if let Some(hz) = job.sample_rate_hz {
        metadata.insert("sample-rate".into(), hz.to_string());
    }
    let extension = local
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    metadata.insert("content-type".into(), content_type(&extension).into());
    metadata
}

/// MIME type for an artifact extension.
pub fn content_type(extension: &str) -> &'static str {
    match extension {
        "m3u8" => "application/vnd.apple.mpegurl",
        "ts" => "video/mp2t",
        "json" => "application/json",
        "mp3" => "audio/mpeg",
        "aac" | "m4a" | "mp4" => "audio/mp4",
        "ogg" | "oga" | "opus" => "audio/ogg",
        "wav" => "audio/wav",
        "flac" => "audio/flac",
        _ => "application/octet-stream",
    }
}
