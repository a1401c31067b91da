mod cli;

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use wavecast::{TriggerEvent, Worker};
use wc_av::{TextStreamScanner, ToolRegistry, WaveformConverter};
use wc_core::WorkerConfig;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "wavecast=trace,wc_pipeline=trace,wc_av=debug,wc_store=debug,wc_core=debug".to_string()
        } else {
            "wavecast=info,wc_pipeline=info,wc_av=info,wc_store=info,wc_core=warn".to_string()
        }
    });

    // Logs go to stderr so command output on stdout stays machine-readable.
    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Handle { event } => {
            let raw = read_input(Some(event.as_path()))?;
            let event = TriggerEvent::from_json(&raw).context("Failed to decode event")?;
            run_event(event, cli.config.as_deref())
        }
        Commands::Run { bucket, key } => run_event(TriggerEvent::new(key, bucket), cli.config.as_deref()),
        Commands::Scan { file } => scan(file.as_deref()),
        Commands::Waveform {
            file,
            width,
            height,
        } => waveform(&file, width, height, cli.config.as_deref()),
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Validate { path } => validate_config(path.or(cli.config).as_deref()),
        Commands::Discover { endpoint } => discover(&endpoint),
    }
}

fn load_config(path: Option<&Path>) -> Result<WorkerConfig> {
    let mut config = WorkerConfig::load_or_default(path)?;
    config.apply_process_env();
    Ok(config)
}

/// Read a file, or stdin when the path is absent or `-`.
fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(p) if p != Path::new("-") => {
            std::fs::read_to_string(p).with_context(|| format!("Failed to read {}", p.display()))
        }
        _ => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            Ok(buf)
        }
    }
}

fn run_event(event: TriggerEvent, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let rt = tokio::runtime::Runtime::new()?;
    let sentinel = rt.block_on(async {
        let worker = Worker::from_config(config).await?;
        tracing::info!(key = %event.key, bucket = %event.bucket, "Handling event");
        Ok::<_, anyhow::Error>(worker.handle(&event).await)
    })?;
    println!("{sentinel}");
    Ok(())
}

fn scan(file: Option<&Path>) -> Result<()> {
    let text = read_input(file)?;
    let mut scanner = TextStreamScanner::new();
    scanner.feed_text(&text);
    println!("{}", serde_json::to_string_pretty(&scanner.facts())?);
    Ok(())
}

fn waveform(
    file: &Path,
    width: Option<u32>,
    height: Option<u32>,
    config_path: Option<&Path>,
) -> Result<()> {
    let config = load_config(config_path)?;
    let width = width.unwrap_or(config.waveform.width);
    let height = height.unwrap_or(config.waveform.height);
    if width == 0 || height == 0 {
        anyhow::bail!("Waveform dimensions must be non-zero (got {width}x{height})");
    }

    let table = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let document = WaveformConverter::new(width, height).convert_table(&table)?;
    println!("{}", serde_json::to_string(&document)?);
    Ok(())
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    println!("Checking external tools...\n");

    let tools = ToolRegistry::discover(&config.tools).check_all();
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version.lines().next().unwrap_or(""));
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Jobs will fail at the probe or transcode stage.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {}", p.display());
            let config = WorkerConfig::load(p)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            WorkerConfig::default()
        }
    };

    println!("  Work dir: {}", config.work_dir.display());
    println!("  Output bucket: {}", config.output_bucket);
    println!(
        "  Waveform: {}x{}",
        config.waveform.width, config.waveform.height
    );
    println!("  Layout: {:?}", config.output.layout);
    println!("  Throttle window: {}ms", config.notify.throttle_window_ms);
    println!("  Stage timeout: {}s", config.stages.timeout_secs);

    let warnings = config.validate();
    if !warnings.is_empty() {
        println!("Warnings:");
        for warning in warnings {
            println!("  - {warning}");
        }
    }

    Ok(())
}

fn discover(endpoint: &str) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    let nodes = rt.block_on(wc_store::discover_cluster(endpoint, None))?;
    println!("{}", serde_json::to_string_pretty(&nodes)?);
    Ok(())
}
