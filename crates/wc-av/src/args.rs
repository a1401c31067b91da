//! Argument lists for the probe and transcode invocations.

use std::path::{Path, PathBuf};

/// Playlist written by the segmented layout.
pub const PLAYLIST_NAME: &str = "playlist.m3u8";
/// Segment file pattern for the segmented layout.
pub const SEGMENT_PATTERN: &str = "seg%d.ts";

/// Where the transcode writes its media output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscodeTarget {
    /// Segmented playlist plus `.ts` segments inside `dir`.
    Hls { dir: PathBuf, segment_seconds: u32 },
    /// A single media file.
    File(PathBuf),
}

/// `ffprobe -i <input>`; the probe writes only diagnostics.
pub fn probe_args(input: &Path) -> Vec<String> {
    vec!["-i".into(), input.to_string_lossy().into_owned()]
}

/// Transcode the first stream of `input` while dumping a `width`-column
/// magnitude table to `table` and writing `-progress` lines to stderr.
pub fn transcode_args(
    input: &Path,
    target: &TranscodeTarget,
    width: u32,
    samples_per_pixel: u64,
    table: &Path,
) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "-y".into(),
        "-i".into(),
        input.to_string_lossy().into_owned(),
        "-map".into(),
        "0:0".into(),
    ];

    if let TranscodeTarget::Hls {
        dir,
        segment_seconds,
    } = target
    {
        args.extend([
            "-hls_time".into(),
            segment_seconds.to_string(),
            "-hls_list_size".into(),
            "0".into(),
            "-hls_segment_filename".into(),
            dir.join(SEGMENT_PATTERN).to_string_lossy().into_owned(),
        ]);
    }

    args.extend([
        "-progress".into(),
        "pipe:2".into(),
        "-af".into(),
        format!(
            "dumpwave=w={width}:n={samples_per_pixel}:f={}",
            table.to_string_lossy()
        ),
    ]);

    let output = match target {
        TranscodeTarget::Hls { dir, .. } => dir.join(PLAYLIST_NAME),
        TranscodeTarget::File(path) => path.clone(),
    };
    args.push(output.to_string_lossy().into_owned());

    args
}
