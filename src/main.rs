use abrsim::events::{EventFilter, StopReason};
use abrsim::{AbrSimConfig, SimulationController, StatusBoard};
use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;

#[derive(Parser, Debug)]
#[command(name = "abrsim")]
#[command(about = "Adaptive bitrate playback simulator")]
#[command(version)]
#[command(long_about = "Plays a video source while sampling host network throughput, \
switching the rendered resolution through a rendition ladder as the estimate changes. \
An external player provides audio alongside the video.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "abrsim.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit without starting playback")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,

    /// Also write logs to a daily rolling file in this directory
    #[arg(long, value_name = "DIR")]
    log_dir: Option<String>,

    /// Override the media path from the configuration
    #[arg(long, value_name = "PATH")]
    source: Option<String>,

    /// Stop playback after this many seconds
    #[arg(long, value_name = "SECONDS")]
    duration: Option<u64>,

    /// Play without launching the audio player
    #[arg(long)]
    no_audio: bool,

    /// Print the final statistics as JSON on exit
    #[arg(long)]
    stats_json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    let _log_guard = init_logging(&args)?;

    info!("Starting abrsim v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    let mut config = AbrSimConfig::load_from_file(&args.config).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    if let Some(source) = &args.source {
        config.source.path = source.clone();
    }
    if args.no_audio {
        config.audio.enabled = false;
    }

    if args.validate_config {
        match config.validate() {
            Ok(()) => {
                info!("Configuration validation successful");
                println!("✓ Configuration is valid");
                return Ok(());
            }
            Err(e) => {
                error!("Configuration validation failed: {}", e);
                eprintln!("✗ Configuration validation failed: {}", e);
                std::process::exit(1);
            }
        }
    }

    abrsim::paths::apply_plugin_path(&config)?;

    let controller = SimulationController::builder(config)
        .build()
        .map_err(|e| {
            error!("Failed to create controller: {}", e);
            e
        })?;

    let status = Arc::new(StatusBoard::new(controller.current_rendition()));
    let status_task = status.spawn(
        controller.subscribe_filtered(
            EventFilter::EventTypes(vec![
                "playback_started",
                "bandwidth_updated",
                "rendition_changed",
            ]),
            "status",
        ),
        |fields| print!("{} | {}\r\n", fields.bandwidth, fields.resolution),
    );

    let reason = controller
        .run(args.duration.map(Duration::from_secs))
        .await
        .map_err(|e| {
            error!("Playback failed: {}", e);
            e
        })?;
    status_task.abort();

    info!("Playback ended: {}", reason.describe());

    if args.stats_json {
        let stats = serde_json::to_string_pretty(&controller.stats())
            .context("Failed to serialize statistics")?;
        println!("{}", stats);
    }

    if let StopReason::Fatal { .. } = reason {
        std::process::exit(1);
    }
    Ok(())
}

fn init_logging(args: &Args) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    // Determine log level based on flags
    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("abrsim={}", log_level)));

    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("compact") => fmt::layer()
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
        Some("pretty") | None => fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer()
                .with_target(true)
                .with_thread_ids(args.debug)
                .with_file(args.debug)
                .with_line_number(args.debug)
                .boxed()
        }
    };

    let (file_layer, guard) = match &args.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "abrsim.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(file_layer)
        .with(env_filter)
        .init();

    Ok(guard)
}

/// Print default configuration in TOML format
fn print_default_config() -> Result<()> {
    let rendered = AbrSimConfig::default()
        .to_toml()
        .context("Failed to render default configuration")?;

    println!("# abrsim configuration file");
    println!("# Every option with its default value; environment variables such as");
    println!("# ABRSIM_BUFFER__CAPACITY=50 override file values");
    println!();
    println!("{}", rendered);
    Ok(())
}
