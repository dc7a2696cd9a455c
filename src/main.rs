// Sentinel Event Stream - Main Entry Point
//
// You can run it via Cargo:
//
// ```console
// $ cargo build --release
// $ ./target/release/sentinel-event-stream --data-root data/input
// ```
//
// Or replaying two feeds ten times faster, forever:
//
// ```console
// $ ./target/release/sentinel-event-stream --datasets RFID_data pos_transactions --speed 10 --loop
// ```

use clap::Parser;
use sentinel_event_stream::service::{prepare_timeline, LoggingConfig, LoggingGuard, ReplayServer};
use sentinel_event_stream::types::{CliArgs, ReplayConfig};
use sentinel_event_stream::{MergedTimeline, ServiceError};
use std::process;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn, Level};

#[tokio::main]
async fn main() {
    // Parse CLI arguments first to check for special flags
    let args = CliArgs::parse();

    if args.print_config {
        match ReplayConfig::default().print_json() {
            Ok(json) => {
                println!("{}", json);
                return;
            }
            Err(e) => {
                eprintln!("Failed to serialize default configuration: {}", e);
                process::exit(1);
            }
        }
    }

    // Load configuration from CLI arguments and optional config file
    let config = match ReplayConfig::from_cli_args(args.clone()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    let _logging_guard = match init_logging(&args, &config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            process::exit(1);
        }
    };

    info!("Starting {}", config.service_name);

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        process::exit(1);
    }

    if config.speed_outside_documented_range() {
        warn!("Speed factor {} is outside the documented 1-100 range", config.speed);
    }

    info!("Configuration loaded and validated successfully");

    let timeline = match prepare_timeline(&config) {
        Ok(timeline) => Arc::new(timeline),
        Err(e) => {
            error!("{} error: {}", e.category(), e);
            process::exit(1);
        }
    };

    if args.dry_run {
        eprintln!("Configuration validation successful!");
        eprintln!("Dry run mode - the listener will not be started.");
        print_configuration_summary(&config, &timeline);
        return;
    }

    print_configuration_summary(&config, &timeline);

    if let Err(e) = serve(config, timeline).await {
        error!("{} error: {}", e.category(), e);
        process::exit(1);
    }

    info!("Sentinel Event Stream stopped");
}

/// Initialize logging from the CLI flags and the configured level
fn init_logging(
    args: &CliArgs,
    config: &ReplayConfig,
) -> Result<LoggingGuard, Box<dyn std::error::Error + Send + Sync>> {
    // Validation reports a bad level once logging is up
    let level = args.effective_log_level(config.parse_log_level().unwrap_or(Level::INFO));

    let mut logging = LoggingConfig::new().with_level(level);
    if args.debug || args.verbose {
        logging = logging.with_span_events();
    }
    if args.json_logs {
        logging = logging.with_json_format().without_ansi();
    }
    if let Some(dir) = &args.log_dir {
        logging = logging.with_file_logging(dir.clone());
    }
    logging.init()
}

/// Bind the listener and run until Ctrl-C
async fn serve(config: ReplayConfig, timeline: Arc<MergedTimeline>) -> Result<(), ServiceError> {
    let server = ReplayServer::bind(&config, timeline).await?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl-C, shutting down"),
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        }
        if shutdown_tx.send(true).is_err() {
            debug!("No listeners left for the shutdown signal");
        }
    });

    server.run(shutdown_rx).await
}

/// Print configuration summary
fn print_configuration_summary(config: &ReplayConfig, timeline: &MergedTimeline) {
    eprintln!("Configuration:");
    eprintln!("  Service: {}", config.service_name);
    eprintln!("  Listen Address: {}", config.bind_address());
    eprintln!("  Data Root: {}", config.data_root.display());
    eprintln!("  Datasets: {}", timeline.dataset_names().join(", "));
    eprintln!("  Events per Cycle: {}", timeline.len());
    eprintln!(
        "  Window: {} (+{:.3}s)",
        timeline.window_start().to_rfc3339(),
        timeline.window_span().num_milliseconds() as f64 / 1000.0
    );
    eprintln!("  Speed Factor: x{}", config.speed);
    eprintln!("  Loop: {}", if config.loop_enabled { "enabled" } else { "disabled" });
    if config.loop_enabled {
        eprintln!(
            "  Sequence: {}",
            if config.continuous_sequence { "continuous" } else { "reset each loop" }
        );
    }
    eprintln!();
}
