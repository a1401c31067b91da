use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "wavecast")]
#[command(author, version, about = "Upload-triggered media transcoding worker")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Handle one object-created event (S3 or GCS shape)
    Handle {
        /// Event JSON file, or `-` for stdin
        #[arg(long, default_value = "-")]
        event: PathBuf,
    },

    /// Run one job for an explicit object
    Run {
        /// Bucket holding the source object
        #[arg(long)]
        bucket: String,

        /// Key of the source object
        #[arg(long)]
        key: String,
    },

    /// Extract duration, sample rate, and position from a tool log
    Scan {
        /// Log file (reads stdin if omitted)
        file: Option<PathBuf>,
    },

    /// Convert a raw sample table into waveform JSON
    Waveform {
        /// Sample table produced by the transcode
        #[arg(required = true)]
        file: PathBuf,

        /// Waveform width recorded in the document
        #[arg(long)]
        width: Option<u32>,

        /// Quantization height
        #[arg(long)]
        height: Option<u32>,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses --config or defaults if omitted)
        #[arg(value_name = "CONFIG")]
        path: Option<PathBuf>,
    },

    /// Discover the nodes behind a cache cluster configuration endpoint
    Discover {
        /// Configuration endpoint as host:port
        endpoint: String,
    },
}
