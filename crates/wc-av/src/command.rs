//! Builder for running external tools while streaming their diagnostics.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

/// Default command timeout: 15 minutes.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(900);

/// How long to wait before re-checking liveness after an empty read.
const LIVENESS_POLL: Duration = Duration::from_millis(20);

/// Outcome of a streamed tool execution.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Process exit status.
    pub status: ExitStatus,
    /// Number of diagnostic lines delivered to the callback.
    pub lines: usize,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

/// A builder for constructing and executing external tool invocations.
///
/// # Example
///
/// ```no_run
/// use wc_av::ToolCommand;
/// use std::path::PathBuf;
///
/// # async fn example() -> wc_core::Result<()> {
/// let output = ToolCommand::new(PathBuf::from("ffprobe"))
///     .arg("-i")
///     .arg("/tmp/input.wav")
///     .stream(|line| println!("{line}"))
///     .await?;
/// println!("exit: {}", output.status);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl ToolCommand {
    /// Create a new command for the given program path.
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Append a single argument.
    pub fn arg(&mut self, s: impl Into<String>) -> &mut Self {
        self.args.push(s.into());
        self
    }

    /// Append multiple arguments.
    pub fn args(&mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    /// Set the maximum execution time.
    pub fn timeout(&mut self, d: Duration) -> &mut Self {
        self.timeout = d;
        self
    }

    fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    /// Run the command, handing every stderr line to `on_line` in order.
    ///
    /// The stream is finished only when a read returns nothing *and* the
    /// process has exited; an empty read from a live process is followed by
    /// a short pause and another read. A non-zero exit is reported through
    /// [`ToolOutput::status`], not as an error.
    ///
    /// # Errors
    ///
    /// - [`wc_core::Error::Tool`] if spawning or reading fails.
    /// - [`wc_core::Error::Timeout`] if the process outlives the timeout; the
    ///   child is killed.
    pub async fn stream(&self, mut on_line: impl FnMut(&str)) -> wc_core::Result<ToolOutput> {
        let program_name = self.program_name();

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| wc_core::Error::tool(&program_name, format!("failed to spawn: {e}")))?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| wc_core::Error::tool(&program_name, "stderr was not captured"))?;
        let mut reader = BufReader::new(stderr);

        let read_loop = async {
            let mut buf = Vec::new();
            let mut lines = 0usize;
            loop {
                buf.clear();
                let n = reader.read_until(b'\n', &mut buf).await.map_err(|e| {
                    wc_core::Error::tool(&program_name, format!("failed to read stderr: {e}"))
                })?;

                if n == 0 {
                    match child.try_wait() {
                        Ok(Some(status)) => return Ok(ToolOutput { status, lines }),
                        Ok(None) => {
                            tokio::time::sleep(LIVENESS_POLL).await;
                            continue;
                        }
                        Err(e) => {
                            return Err(wc_core::Error::tool(
                                &program_name,
                                format!("failed to poll process: {e}"),
                            ))
                        }
                    }
                }

                let line = String::from_utf8_lossy(&buf);
                on_line(line.trim_end_matches(['\r', '\n']));
                lines += 1;
            }
        };

        let result = tokio::time::timeout(self.timeout, read_loop).await;
        match result {
            Ok(result) => result,
            Err(_elapsed) => {
                if let Err(e) = child.kill().await {
                    tracing::warn!(tool = %program_name, "Failed to kill timed-out process: {e}");
                }
                Err(wc_core::Error::Timeout(self.timeout))
            }
        }
    }
}
