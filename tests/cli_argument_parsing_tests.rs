//! Tests for CLI argument parsing functionality
//!
//! These tests verify that command line arguments are parsed and merged over
//! an optional configuration file into a [`GenerationConfig`].

use clap::Parser;
use population_generator::types::{CliArgs, Gender, GenerationConfig, LogDetail, SlotFailurePolicy};
use std::fs;
use std::path::PathBuf;

fn config_from(args: &[&str]) -> GenerationConfig {
    let mut argv = vec!["population-generator"];
    argv.extend_from_slice(args);
    let cli_args = CliArgs::try_parse_from(argv).unwrap();
    GenerationConfig::from_cli_args(cli_args).unwrap()
}

/// Test the positional state and city arguments
#[test]
fn test_positional_location_arguments() {
    let config = config_from(&[]);
    assert_eq!(config.state, "Massachusetts");
    assert_eq!(config.city, None);

    let config = config_from(&["Ohio"]);
    assert_eq!(config.state, "Ohio");
    assert_eq!(config.city, None);

    let config = config_from(&["Massachusetts", "Bedford"]);
    assert_eq!(config.city.as_deref(), Some("Bedford"));
    assert_eq!(config.location_name(), "Bedford, Massachusetts");
}

/// Test population, seed and reference date options
#[test]
fn test_population_and_seed_options() {
    let config = config_from(&["-p", "25", "-s", "42", "-r", "2015-06-30"]);
    assert_eq!(config.population, 25);
    assert_eq!(config.seed, 42);
    // the provider seed follows the main seed unless given separately
    assert_eq!(config.clinician_seed, 42);
    assert_eq!(config.reference_time.to_rfc3339(), "2015-06-30T00:00:00+00:00");

    let config = config_from(&["-s", "42", "--clinician-seed", "9"]);
    assert_eq!(config.clinician_seed, 9);
}

/// Test the gender and age filters
#[test]
fn test_gender_and_age_filters() {
    let config = config_from(&["-g", "M", "-a", "30-40"]);
    assert_eq!(config.gender, Some(Gender::Male));
    assert!(config.age_specified);
    assert_eq!((config.min_age, config.max_age), (30, 40));

    let config = config_from(&[]);
    assert!(!config.age_specified);
    assert_eq!(config.gender, None);

    assert!(CliArgs::try_parse_from(["population-generator", "-a", "thirty"]).is_err());
    assert!(CliArgs::try_parse_from(["population-generator", "-g", "X"]).is_err());
}

/// Test the ':'-separated module filter list
#[test]
fn test_module_filters() {
    let config = config_from(&["-m", "Wellness*:Lifecycle"]);
    assert_eq!(
        config.enabled_modules,
        Some(vec!["Wellness*".to_string(), "Lifecycle".to_string()])
    );
    assert_eq!(config_from(&[]).enabled_modules, None);
}

/// Test file path and snapshot options
#[test]
fn test_path_options() {
    let config = config_from(&[
        "-f", "records.json", "-i", "in.bin", "-u", "out.bin", "-t", "-1", "-k", "keep.json",
    ]);
    assert_eq!(config.fixed_record_path, Some(PathBuf::from("records.json")));
    assert_eq!(config.initial_population_snapshot_path, Some(PathBuf::from("in.bin")));
    assert_eq!(config.updated_population_snapshot_path, Some(PathBuf::from("out.bin")));
    assert_eq!(config.days_to_travel_forward, Some(-1));
    assert_eq!(config.keep_patients_module_path, Some(PathBuf::from("keep.json")));
}

/// Test the boolean switches and enumerated options
#[test]
fn test_flags_and_policies() {
    let config = config_from(&[
        "--only-alive",
        "--no-overflow",
        "--metrics",
        "--log-detail",
        "detailed",
        "--on-slot-failure",
        "abort",
        "--max-attempts",
        "0",
    ]);
    assert!(config.only_alive_patients);
    assert!(!config.overflow);
    assert!(config.track_detailed_transition_metrics);
    assert_eq!(config.log_detail, LogDetail::Detailed);
    assert_eq!(config.slot_failure_policy, SlotFailurePolicy::Abort);
    assert_eq!(config.max_attempts(), None);

    // asking for both filters cancels them
    let config = config_from(&["--only-alive", "--only-dead"]);
    assert!(!config.only_alive_patients);
    assert!(!config.only_dead_patients);
}

/// Test that CLI arguments override the configuration file
#[test]
fn test_cli_overrides_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    fs::write(&path, r#"{ "population": 50, "seed": 7, "state": "Texas", "threads": 2 }"#).unwrap();
    let path = path.to_str().unwrap();

    let config = config_from(&["-c", path]);
    assert_eq!(config.population, 50);
    assert_eq!(config.seed, 7);
    assert_eq!(config.state, "Texas");
    assert_eq!(config.threads, 2);

    let config = config_from(&["-c", path, "-p", "5", "Maine"]);
    assert_eq!(config.population, 5);
    assert_eq!(config.seed, 7);
    assert_eq!(config.state, "Maine");
}

/// Test that a missing configuration file is reported
#[test]
fn test_missing_config_file() {
    let args = CliArgs::try_parse_from(["population-generator", "-c", "does-not-exist.json"]).unwrap();
    assert!(GenerationConfig::from_cli_args(args).is_err());
}
