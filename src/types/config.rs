//! Configuration structures for the event replay service
//!
//! This module contains the service configuration structure, its command-line
//! and file sources, and the validation that must pass before any dataset is
//! read or any socket is bound.

use super::DatasetKind;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Documented replay speed range; values outside it are accepted with a warning
pub const DOCUMENTED_SPEED_RANGE: std::ops::RangeInclusive<f64> = 1.0..=100.0;

/// Command line arguments structure
#[derive(Debug, Clone, Parser)]
#[command(
    name = "sentinel-event-stream",
    version,
    about = "Replay JSON datasets as one chronologically ordered TCP stream",
    long_about = "Loads the configured datasets, merges them into a single timeline ordered by timestamp and replays that timeline to every connected client as newline-delimited JSON, paced by a speed factor.

EXAMPLES:
    # Stream every dataset found under the data root in real time
    sentinel-event-stream --data-root data/input

    # Stream two datasets at 25x speed, looping forever
    sentinel-event-stream --datasets POS_Transactions Queue_monitor --speed 25 --loop

    # Generate configuration template
    sentinel-event-stream --print-config > stream.json

    # Validate configuration and datasets without binding
    sentinel-event-stream --config stream.json --dry-run

CONFIGURATION:
    Configuration can be provided via:
    1. Command line arguments (highest priority)
    2. Configuration file (--config flag)
    3. Default values (lowest priority)

    Supported configuration file formats: JSON (.json)"
)]
pub struct CliArgs {
    /// Configuration file path (JSON format)
    #[arg(
        short,
        long,
        help = "Configuration file path (JSON format)",
        long_help = "Path to a JSON configuration file. CLI arguments will override file settings."
    )]
    pub config: Option<String>,

    /// Root directory containing the dataset files
    #[arg(long, help = "Root directory containing JSON/JSONL datasets")]
    pub data_root: Option<PathBuf>,

    /// Subset of datasets to stream
    #[arg(
        long,
        num_args = 1..,
        help = "Dataset names to stream (canonical name or file stem)",
        long_help = "Optional subset of dataset names, either the canonical name (e.g. POS_Transactions) or the file stem (e.g. pos_transactions). Defaults to every known dataset present in the data root."
    )]
    pub datasets: Vec<String>,

    /// TCP port to expose the stream on
    #[arg(short, long, help = "TCP port to expose the stream")]
    pub port: Option<u16>,

    /// Bind address
    #[arg(long, help = "Bind address (use 127.0.0.1 to restrict to local machine)")]
    pub host: Option<String>,

    /// Replay speed multiplier
    #[arg(
        short,
        long,
        help = "Replay speed multiplier (1.0 = real-time)",
        long_help = "Replay speed multiplier. Original gaps between events are divided by this factor. Documented range is 1 to 100; any finite positive value is accepted."
    )]
    pub speed: Option<f64>,

    /// Loop the timeline instead of closing after one pass
    #[arg(long = "loop", help = "Continuously loop the dataset instead of closing after one pass")]
    pub loop_enabled: bool,

    /// Keep counting sequence numbers across loops
    #[arg(long, help = "Do not reset the sequence number at the start of each loop")]
    pub continuous_sequence: bool,

    /// Pad each cycle with the smallest gap between records
    #[arg(long, help = "Pad the loop cycle with the smallest gap between records")]
    pub pad_cycle: bool,

    /// Service name reported in the banner
    #[arg(long, help = "Service name reported in the session banner")]
    pub service_name: Option<String>,

    /// Grace period for sessions to close on shutdown
    #[arg(long, help = "Milliseconds sessions get to close after a shutdown signal")]
    pub shutdown_grace_ms: Option<u64>,

    /// Log level
    #[arg(long, help = "Logging verbosity (error, warn, info, debug, trace)")]
    pub log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,

    /// Directory for rolling log files
    #[arg(long, help = "Also write logs to daily rolling files in this directory")]
    pub log_dir: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, help = "Enable verbose logging")]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(short, long, help = "Enable debug logging")]
    pub debug: bool,

    /// Dry run mode - validate configuration and load datasets without serving
    #[arg(long, help = "Validate configuration and datasets without starting the listener")]
    pub dry_run: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in JSON format and exit")]
    pub print_config: bool,
}

impl CliArgs {
    /// Raise `configured` to the floor requested by `--verbose` / `--debug`.
    ///
    /// The flags never lower a more detailed configured level.
    pub fn effective_log_level(&self, configured: tracing::Level) -> tracing::Level {
        let floor = if self.debug {
            tracing::Level::DEBUG
        } else if self.verbose {
            tracing::Level::INFO
        } else {
            return configured;
        };
        configured.max(floor)
    }
}

/// Configuration file structure (allows partial configuration)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConfigFile {
    /// Bind address
    pub host: Option<String>,

    /// TCP port
    pub port: Option<u16>,

    /// Root directory containing the dataset files
    pub data_root: Option<PathBuf>,

    /// Subset of datasets to stream
    pub datasets: Option<Vec<String>>,

    /// Replay speed multiplier
    pub speed: Option<f64>,

    /// Loop the timeline
    pub loop_enabled: Option<bool>,

    /// Keep counting sequence numbers across loops
    pub continuous_sequence: Option<bool>,

    /// Pad each cycle with the smallest gap between records
    pub pad_cycle: Option<bool>,

    /// Service name reported in the banner
    pub service_name: Option<String>,

    /// Grace period for sessions to close on shutdown
    pub shutdown_grace_ms: Option<u64>,

    /// Log level
    pub log_level: Option<String>,
}

/// Configuration for the replay service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReplayConfig {
    /// Bind address
    pub host: String,

    /// TCP port
    pub port: u16,

    /// Root directory containing the dataset files
    pub data_root: PathBuf,

    /// Subset of datasets to stream; empty means every dataset found
    pub datasets: Vec<String>,

    /// Replay speed multiplier
    pub speed: f64,

    /// Loop the timeline
    pub loop_enabled: bool,

    /// Keep counting sequence numbers across loops
    pub continuous_sequence: bool,

    /// Pad each cycle with the smallest gap between records
    pub pad_cycle: bool,

    /// Service name reported in the banner
    pub service_name: String,

    /// Grace period for sessions to close on shutdown
    pub shutdown_grace_ms: u64,

    /// Log level
    pub log_level: String,
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    /// Configuration file read error
    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    /// JSON parsing error
    #[error("Failed to parse JSON configuration: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Unsupported configuration file format
    #[error("Unsupported configuration file format: {0} (supported: .json)")]
    UnsupportedFormat(String),
}

/// Validation errors for the service configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    /// Speed factor is zero, negative or not finite
    #[error("Speed factor must be a finite number greater than 0, got {0}")]
    InvalidSpeed(f64),

    /// Bind address is empty
    #[error("Bind address must not be empty")]
    EmptyHost,

    /// Dataset filter names an unknown dataset
    #[error("Unknown dataset '{name}' (available: {})", .available.join(", "))]
    UnknownDataset {
        /// The unrecognized identifier
        name: String,
        /// Identifiers that would have been accepted
        available: Vec<String>,
    },

    /// Data root does not exist or is not a directory
    #[error("Data directory not found: {0}")]
    DataRootNotFound(String),

    /// Log level is not recognized
    #[error("Invalid log level '{0}' (expected error, warn, info, debug or trace)")]
    InvalidLogLevel(String),
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8765,
            data_root: PathBuf::from("data/input"),
            datasets: Vec::new(),
            speed: 1.0,
            loop_enabled: false,
            continuous_sequence: false,
            pad_cycle: false,
            service_name: "project-sentinel-event-stream".to_string(),
            shutdown_grace_ms: 2_000,
            log_level: "info".to_string(),
        }
    }
}

impl ReplayConfig {
    /// Create a new configuration from command line arguments and optional config file
    pub fn from_args() -> Result<Self, ConfigError> {
        let args = CliArgs::parse();
        Self::from_cli_args(args)
    }

    /// Create configuration from parsed CLI arguments
    pub fn from_cli_args(args: CliArgs) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(config_path) = &args.config {
            config = Self::from_file(config_path)?;
        }

        // CLI takes precedence
        Self::apply_cli_overrides(&mut config, args);

        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let content = fs::read_to_string(path)?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => {
                let config_file: ConfigFile = serde_json::from_str(&content)?;
                Ok(Self::from_config_file(config_file))
            }
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => Err(ConfigError::UnsupportedFormat("no extension".to_string())),
        }
    }

    /// Create configuration from a config file, merging with defaults
    fn from_config_file(config_file: ConfigFile) -> Self {
        let defaults = Self::default();

        Self {
            host: config_file.host.unwrap_or(defaults.host),
            port: config_file.port.unwrap_or(defaults.port),
            data_root: config_file.data_root.unwrap_or(defaults.data_root),
            datasets: config_file.datasets.unwrap_or(defaults.datasets),
            speed: config_file.speed.unwrap_or(defaults.speed),
            loop_enabled: config_file.loop_enabled.unwrap_or(defaults.loop_enabled),
            continuous_sequence: config_file
                .continuous_sequence
                .unwrap_or(defaults.continuous_sequence),
            pad_cycle: config_file.pad_cycle.unwrap_or(defaults.pad_cycle),
            service_name: config_file.service_name.unwrap_or(defaults.service_name),
            shutdown_grace_ms: config_file
                .shutdown_grace_ms
                .unwrap_or(defaults.shutdown_grace_ms),
            log_level: config_file.log_level.unwrap_or(defaults.log_level),
        }
    }

    /// Apply CLI argument overrides to configuration
    fn apply_cli_overrides(config: &mut Self, args: CliArgs) {
        if let Some(value) = args.host {
            config.host = value;
        }
        if let Some(value) = args.port {
            config.port = value;
        }
        if let Some(value) = args.data_root {
            config.data_root = value;
        }
        if !args.datasets.is_empty() {
            config.datasets = args.datasets;
        }
        if let Some(value) = args.speed {
            config.speed = value;
        }
        if let Some(value) = args.service_name {
            config.service_name = value;
        }
        if let Some(value) = args.shutdown_grace_ms {
            config.shutdown_grace_ms = value;
        }
        if let Some(value) = args.log_level {
            config.log_level = value;
        }

        // Flags can only switch a behavior on
        config.loop_enabled |= args.loop_enabled;
        config.continuous_sequence |= args.continuous_sequence;
        config.pad_cycle |= args.pad_cycle;
    }

    /// Print configuration as JSON
    pub fn print_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validate the configuration parameters
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        validate_speed(self.speed)?;

        if self.host.trim().is_empty() {
            return Err(ConfigValidationError::EmptyHost);
        }

        self.parse_log_level()?;

        // Unknown dataset names are rejected before touching the filesystem
        self.selected_datasets()?;

        if !self.data_root.is_dir() {
            return Err(ConfigValidationError::DataRootNotFound(
                self.data_root.display().to_string(),
            ));
        }

        Ok(())
    }

    /// Resolve the dataset filter to catalog entries, keeping the configured
    /// order and dropping duplicates. An empty result means "all".
    pub fn selected_datasets(&self) -> Result<Vec<DatasetKind>, ConfigValidationError> {
        let mut kinds = Vec::with_capacity(self.datasets.len());
        for name in &self.datasets {
            let kind = DatasetKind::from_identifier(name).ok_or_else(|| {
                ConfigValidationError::UnknownDataset {
                    name: name.clone(),
                    available: DatasetKind::available_identifiers(),
                }
            })?;
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        Ok(kinds)
    }

    /// Parse the configured log level
    pub fn parse_log_level(&self) -> Result<tracing::Level, ConfigValidationError> {
        tracing::Level::from_str(self.log_level.trim())
            .map_err(|_| ConfigValidationError::InvalidLogLevel(self.log_level.clone()))
    }

    /// Whether the speed lies outside the documented 1-100 range
    pub fn speed_outside_documented_range(&self) -> bool {
        !DOCUMENTED_SPEED_RANGE.contains(&self.speed)
    }

    /// Socket address string for the listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Shutdown grace period
    pub fn shutdown_grace(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.shutdown_grace_ms)
    }
}

/// Speed factors must be finite and strictly positive
pub fn validate_speed(speed: f64) -> Result<(), ConfigValidationError> {
    if speed.is_finite() && speed > 0.0 {
        Ok(())
    } else {
        Err(ConfigValidationError::InvalidSpeed(speed))
    }
}
