//! Tests for CLI argument parsing functionality
//!
//! These tests verify that command line arguments are parsed and layered over
//! config files and defaults, and that invalid values are rejected before the
//! service would bind.

use clap::Parser;
use sentinel_event_stream::types::config::{CliArgs, ConfigValidationError, ReplayConfig};
use std::fs;
use tempfile::TempDir;

fn parse(args: &[&str]) -> CliArgs {
    let mut argv = vec!["sentinel-event-stream"];
    argv.extend_from_slice(args);
    CliArgs::try_parse_from(argv).unwrap()
}

/// Defaults apply when nothing is given
#[test]
fn test_default_arguments() {
    let config = ReplayConfig::from_cli_args(parse(&[])).unwrap();
    assert_eq!(config, ReplayConfig::default());
    assert_eq!(config.port, 8765);
    assert_eq!(config.host, "0.0.0.0");
    assert_eq!(config.speed, 1.0);
    assert!(!config.loop_enabled);
    assert!(config.datasets.is_empty());
}

/// Every flag reaches the configuration
#[test]
fn test_all_flags_parse() {
    let args = parse(&[
        "--port",
        "9000",
        "--host",
        "127.0.0.1",
        "--speed",
        "12.5",
        "--loop",
        "--continuous-sequence",
        "--pad-cycle",
        "--data-root",
        "/tmp/feeds",
        "--datasets",
        "POS_Transactions",
        "rfid_readings",
        "--service-name",
        "lab-stream",
        "--shutdown-grace-ms",
        "250",
        "--log-level",
        "debug",
    ]);
    let config = ReplayConfig::from_cli_args(args).unwrap();

    assert_eq!(config.port, 9000);
    assert_eq!(config.host, "127.0.0.1");
    assert_eq!(config.speed, 12.5);
    assert!(config.loop_enabled);
    assert!(config.continuous_sequence);
    assert!(config.pad_cycle);
    assert_eq!(config.data_root.to_str(), Some("/tmp/feeds"));
    assert_eq!(config.datasets, vec!["POS_Transactions", "rfid_readings"]);
    assert_eq!(config.service_name, "lab-stream");
    assert_eq!(config.shutdown_grace_ms, 250);
    assert_eq!(config.log_level, "debug");
}

/// Short flags match their long forms
#[test]
fn test_short_flags() {
    let args = parse(&["-p", "7000", "-s", "3", "-v"]);
    assert_eq!(args.port, Some(7000));
    assert_eq!(args.speed, Some(3.0));
    assert!(args.verbose);
    assert!(!args.debug);
}

/// Unparseable numbers are rejected by the parser
#[test]
fn test_unparseable_values_are_rejected() {
    assert!(CliArgs::try_parse_from(["test", "--port", "eighty"]).is_err());
    assert!(CliArgs::try_parse_from(["test", "--port", "70000"]).is_err());
    assert!(CliArgs::try_parse_from(["test", "--speed", "fast"]).is_err());
}

/// Speeds that parse but make no sense fail validation
#[test]
fn test_invalid_speed_fails_validation() {
    let dir = TempDir::new().unwrap();
    for speed in ["0", "-2", "NaN", "inf"] {
        let flag = format!("--speed={speed}");
        let args = parse(&[flag.as_str(), "--data-root", dir.path().to_str().unwrap()]);
        let config = ReplayConfig::from_cli_args(args).unwrap();
        assert!(
            matches!(config.validate(), Err(ConfigValidationError::InvalidSpeed(_))),
            "speed {speed} should be rejected"
        );
    }
}

/// Fractional and very large speeds are accepted, with a range warning
#[test]
fn test_speed_outside_documented_range_is_accepted() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().to_str().unwrap();

    let slow = ReplayConfig::from_cli_args(parse(&["--speed", "0.5", "--data-root", root])).unwrap();
    slow.validate().unwrap();
    assert!(slow.speed_outside_documented_range());

    let fast = ReplayConfig::from_cli_args(parse(&["--speed", "500", "--data-root", root])).unwrap();
    fast.validate().unwrap();
    assert!(fast.speed_outside_documented_range());

    let normal = ReplayConfig::from_cli_args(parse(&["--speed", "100", "--data-root", root])).unwrap();
    assert!(!normal.speed_outside_documented_range());
}

/// Unknown dataset names fail validation and list the accepted names
#[test]
fn test_unknown_dataset_is_rejected() {
    let dir = TempDir::new().unwrap();
    let args = parse(&["--datasets", "weather", "--data-root", dir.path().to_str().unwrap()]);
    let config = ReplayConfig::from_cli_args(args).unwrap();

    match config.validate() {
        Err(ConfigValidationError::UnknownDataset { name, available }) => {
            assert_eq!(name, "weather");
            assert!(available.contains(&"POS_Transactions".to_string()));
            assert!(available.contains(&"RFID_data".to_string()));
        }
        other => panic!("expected unknown dataset error, got {:?}", other),
    }
}

/// Missing data root fails validation
#[test]
fn test_missing_data_root_is_rejected() {
    let args = parse(&["--data-root", "/definitely/not/here"]);
    let config = ReplayConfig::from_cli_args(args).unwrap();
    assert!(matches!(config.validate(), Err(ConfigValidationError::DataRootNotFound(_))));
}

/// CLI values override the config file, which overrides defaults
#[test]
fn test_config_file_layering() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("stream.json");
    fs::write(
        &path,
        r#"{"port": 9100, "speed": 20.0, "loop_enabled": true, "service_name": "from-file"}"#,
    )
    .unwrap();

    let args = parse(&["--config", path.to_str().unwrap(), "--port", "9200"]);
    let config = ReplayConfig::from_cli_args(args).unwrap();

    assert_eq!(config.port, 9200);
    assert_eq!(config.speed, 20.0);
    assert!(config.loop_enabled);
    assert_eq!(config.service_name, "from-file");
    assert_eq!(config.host, "0.0.0.0");
}

/// Missing config files are reported
#[test]
fn test_missing_config_file() {
    let args = parse(&["--config", "/no/such/config.json"]);
    assert!(ReplayConfig::from_cli_args(args).is_err());
}
