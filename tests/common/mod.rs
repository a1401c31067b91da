//! Shared fixtures: a scratch deployment with shell-script stand-ins for the
//! probe and transcode tools.

#![allow(dead_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use wc_core::config::SinkConfig;
use wc_core::WorkerConfig;

/// Probe output for a 10 s, 44.1 kHz input.
pub const PROBE_OK: &str = r#"Input #0, wav, from 'input':
  Duration: 00:00:10.00, bitrate: 1411 kb/s
    Stream #0:0: Audio: pcm_s16le ([1][0][0][0] / 0x0001), 44100 Hz, 2 channels, s16, 1411 kb/s"#;

/// Probe output that never mentions a duration.
pub const PROBE_NO_DURATION: &str = r#"Input #0, wav, from 'input':
    Stream #0:0: Audio: pcm_s16le, 44100 Hz, 2 channels"#;

/// Raw table written by the fake transcode.
pub const SAMPLE_ROW: &str = "0.5,0.25,1.0,0.0";

pub struct Deployment {
    pub root: TempDir,
    pub config: WorkerConfig,
}

impl Deployment {
    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.path().join(rel)
    }

    /// Place a source object in the input store.
    pub fn put_source(&self, bucket: &str, key: &str, body: &[u8]) {
        let path = self.path(&format!("store/{bucket}/{key}"));
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, body).unwrap();
    }

    /// Replace the transcode with one that reports 10% and then never exits.
    pub fn hang_transcode(&self) {
        write_script(
            &self.path("bin/ffmpeg"),
            "#!/bin/sh\necho 'out_time_ms=1000000' >&2\nexec sleep 30\n",
        );
    }

    /// Arguments the fake transcode was invoked with.
    pub fn transcode_args(&self) -> String {
        std::fs::read_to_string(self.path("ffmpeg.args")).unwrap_or_default()
    }
}

/// Scratch deployment whose probe prints `probe_output` and exits 0, and
/// whose transcode exits with `transcode_exit`.
pub fn deployment(probe_output: &str, transcode_exit: i32) -> Deployment {
    let root = tempfile::tempdir().unwrap();
    let dir = root.path();

    let ffprobe = dir.join("bin/ffprobe");
    write_script(
        &ffprobe,
        &format!("#!/bin/sh\ncat >&2 <<'EOF'\n{probe_output}\nEOF\nexit 0\n"),
    );

    let ffmpeg = dir.join("bin/ffmpeg");
    write_script(&ffmpeg, &transcode_script(&dir.join("ffmpeg.args"), transcode_exit));

    let mut config = WorkerConfig::default();
    config.work_dir = dir.join("work");
    config.output_bucket = "public".into();
    config.store.root = dir.join("store");
    config.sink = SinkConfig::Queue {
        spool_dir: dir.join("spool"),
    };
    config.notify.throttle_window_ms = 0;
    config.tools.ffprobe_path = Some(ffprobe);
    config.tools.ffmpeg_path = Some(ffmpeg);

    Deployment { root, config }
}

fn transcode_script(args_log: &Path, exit_code: i32) -> String {
    format!(
        r#"#!/bin/sh
echo "$@" > '{log}'
for arg in "$@"; do
  last="$arg"
  case "$arg" in
    dumpwave=*) table="${{arg##*:f=}}" ;;
  esac
done
for t in 2500000 5000000 7500000 10000000; do
  echo "out_time_ms=$t" >&2
  echo "progress=continue" >&2
done
if [ {exit_code} -ne 0 ]; then
  echo "encoder exploded" >&2
  exit {exit_code}
fi
printf '{row}\n' > "$table"
echo '#EXTM3U' > "$last"
echo 'segment' > "$(dirname "$last")/seg0.ts"
echo "progress=end" >&2
exit 0
"#,
        log = args_log.display(),
        row = SAMPLE_ROW,
    )
}

fn write_script(path: &Path, body: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, body).unwrap();
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
}
