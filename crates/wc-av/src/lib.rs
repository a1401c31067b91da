//! # wc-av
//!
//! External tool handling and the progress-extraction engine for the
//! wavecast worker.
//!
//! This crate provides:
//!
//! - **Tool discovery** ([`ToolRegistry`]) -- find and cache paths to ffmpeg
//!   and ffprobe.
//! - **Command execution** ([`ToolCommand`]) -- async builder that streams a
//!   tool's diagnostic output line by line until the process exits.
//! - **Stream scanning** ([`TextStreamScanner`]) -- turns free-form tool
//!   output into duration, sample rate, and position facts.
//! - **Progress** ([`ratio`], [`ProgressTracker`]) -- bounded percentages
//!   with edge-triggered change detection.
//! - **Waveforms** ([`WaveformConverter`]) -- quantize the raw sample table
//!   produced by the transcode into a [`WaveformDocument`].
//! - **Arguments** ([`args`]) -- probe and transcode invocations.

pub mod args;
pub mod command;
pub mod progress;
pub mod scanner;
pub mod tools;
pub mod waveform;

// ---- Re-exports for convenience ----

pub use args::{probe_args, transcode_args, TranscodeTarget};
pub use command::{ToolCommand, ToolOutput};
pub use progress::{ratio, ProgressTracker};
pub use scanner::{StreamFacts, TextStreamScanner};
pub use tools::{ToolConfig, ToolInfo, ToolRegistry};
pub use waveform::{samples_per_pixel, WaveformConverter, WaveformDocument};
