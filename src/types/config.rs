//! Configuration structures for the population generator
//!
//! This module contains the generation configuration, the command line surface
//! and the validation logic used to control a population generation run.

use super::{AgeRange, Gender, LogDetail, SlotFailurePolicy};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default values shared by the configuration surfaces
pub mod defaults {
    /// Default population size
    pub const POPULATION: usize = 1;

    /// Default size of the worker pool
    pub const THREADS: usize = 8;

    /// Default simulation timestep in days
    pub const TIMESTEP_DAYS: i64 = 7;

    /// Default upper age bound
    pub const MAX_AGE: u32 = 140;

    /// Default bound on attempts per population slot
    pub const MAX_ATTEMPTS_PER_SLOT: u64 = 1000;

    /// Default state when none is given
    pub const STATE: &str = "Massachusetts";
}

/// Command line arguments structure
#[derive(Debug, Clone, Parser)]
#[command(
    name = "population-generator",
    version = "0.1.0",
    about = "Population Generator - Simulates synthetic people through time-stepped health modules",
    long_about = "Generates a synthetic population by running each person through a pluggable, time-stepped module simulation until death or the stop time, regenerating people that do not meet the requested acceptance criteria.

EXAMPLES:
    # Generate one person in the default state
    population-generator

    # Generate 100 people in a given city with a fixed seed
    population-generator -p 100 -s 42 Massachusetts Boston

    # Only people aged 30 to 40, only living people
    population-generator -p 50 -a 30-40 --only-alive

    # Save the population for a later run, then advance it by a year
    population-generator -p 10 -u population.bin
    population-generator -i population.bin -t 365

    # Generate configuration template
    population-generator --print-config > my-config.json

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

    /// State to generate people in
    #[arg(help = "State to generate people in")]
    pub state: Option<String>,

    /// City within the state
    #[arg(help = "City within the state")]
    pub city: Option<String>,

    /// Number of people to generate
    #[arg(short, long, help = "Number of people to generate")]
    pub population: Option<usize>,

    /// Random seed for reproducible results
    #[arg(short, long, help = "Random seed for reproducible results")]
    pub seed: Option<u64>,

    /// Seed for provider and payer generation
    #[arg(long, help = "Seed for provider and payer generation")]
    pub clinician_seed: Option<u64>,

    /// Reference date used as the epoch for age calculations
    #[arg(
        short,
        long,
        help = "Reference date (YYYY-MM-DD) for age calculations",
        long_help = "Reference date used to turn target ages into birthdates. Default: now"
    )]
    pub reference_date: Option<NaiveDate>,

    /// Gender filter
    #[arg(short, long, help = "Only generate people of this gender (M or F)")]
    pub gender: Option<Gender>,

    /// Age filter
    #[arg(short, long, help = "Only generate people in this age range (MIN-MAX)")]
    pub age: Option<AgeRange>,

    /// Module name filters
    #[arg(
        short,
        long = "module",
        value_delimiter = ':',
        help = "Enabled module name filters, separated by ':' (wildcards allowed)"
    )]
    pub modules: Vec<String>,

    /// Fixed-identity record file
    #[arg(short, long, help = "Fixed-identity record groups file (JSON)")]
    pub fixed_records: Option<PathBuf>,

    /// Snapshot to resume from
    #[arg(short, long, help = "Population snapshot to load and advance")]
    pub initial_snapshot: Option<PathBuf>,

    /// Snapshot to write after the run
    #[arg(short, long, help = "Path to save the generated population snapshot")]
    pub updated_snapshot: Option<PathBuf>,

    /// Days to advance a loaded snapshot
    #[arg(
        short = 't',
        long,
        allow_hyphen_values = true,
        help = "Days to advance a loaded snapshot (negative: advance to now)"
    )]
    pub days_forward: Option<i64>,

    /// Keep-criteria rules file
    #[arg(short, long, help = "Keep-criteria rules file (JSON)")]
    pub keep_module: Option<PathBuf>,

    /// Demographics table file
    #[arg(long, help = "Demographics table file (JSON)")]
    pub demographics: Option<PathBuf>,

    /// JSONL export path
    #[arg(long, help = "Write one JSON summary line per exported person to this file")]
    pub export: Option<PathBuf>,

    /// Maximum attempts per slot
    #[arg(long, help = "Maximum attempts per population slot (0 = unbounded)")]
    pub max_attempts: Option<u64>,

    /// Worker pool size
    #[arg(long, help = "Number of worker threads")]
    pub threads: Option<usize>,

    /// Timestep in days
    #[arg(long, help = "Simulation timestep in days")]
    pub timestep_days: Option<i64>,

    /// Console report detail
    #[arg(long, help = "Per-person console report detail (none, simple, detailed)")]
    pub log_detail: Option<LogDetail>,

    /// Per-slot failure policy
    #[arg(long, help = "What to do when a slot fails (skip or abort)")]
    pub on_slot_failure: Option<SlotFailurePolicy>,

    /// Only keep living people
    #[arg(long, help = "Only keep people alive at the end of the simulation")]
    pub only_alive: bool,

    /// Only keep deceased people
    #[arg(long, help = "Only keep people deceased at the end of the simulation")]
    pub only_dead: bool,

    /// Do not count deceased people toward the population
    #[arg(long, help = "Do not count deceased people toward the population")]
    pub no_overflow: bool,

    /// Tag every person as part of the veteran population
    #[arg(long, help = "Tag every person with the veteran population override")]
    pub veterans: bool,

    /// Track per-module transition metrics
    #[arg(long, help = "Track and print detailed module transition metrics")]
    pub metrics: bool,

    /// Enable verbose logging
    #[arg(short, long, help = "Enable verbose logging")]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(short, long, help = "Enable debug logging")]
    pub debug: bool,

    /// Dry run mode - validate configuration without running generation
    #[arg(long, help = "Validate configuration without running generation")]
    pub dry_run: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in JSON format and exit")]
    pub print_config: bool,
}

/// Configuration file structure (allows partial configuration)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConfigFile {
    /// Number of people to generate
    pub population: Option<usize>,
    /// Random seed
    pub seed: Option<u64>,
    /// Provider and payer seed
    pub clinician_seed: Option<u64>,
    /// Reference time for age calculations
    pub reference_time: Option<DateTime<Utc>>,
    /// Global stop time
    pub stop_time: Option<DateTime<Utc>>,
    /// Timestep in days
    pub timestep_days: Option<i64>,
    /// Worker pool size
    pub threads: Option<usize>,
    /// Whether deceased people count toward the population
    pub overflow: Option<bool>,
    /// Gender filter
    pub gender: Option<Gender>,
    /// Whether the age filter applies
    pub age_specified: Option<bool>,
    /// Minimum age
    pub min_age: Option<u32>,
    /// Maximum age
    pub max_age: Option<u32>,
    /// State
    pub state: Option<String>,
    /// City
    pub city: Option<String>,
    /// Only keep living people
    pub only_alive_patients: Option<bool>,
    /// Only keep deceased people
    pub only_dead_patients: Option<bool>,
    /// Veteran population override
    pub veteran_population_override: Option<bool>,
    /// Maximum attempts per slot (0 = unbounded)
    pub max_attempts_per_slot: Option<u64>,
    /// Enabled module name filters
    pub enabled_modules: Option<Vec<String>>,
    /// Fixed-identity record file
    pub fixed_record_path: Option<PathBuf>,
    /// Snapshot to resume from
    pub initial_population_snapshot_path: Option<PathBuf>,
    /// Snapshot to write after the run
    pub updated_population_snapshot_path: Option<PathBuf>,
    /// Days to advance a loaded snapshot
    pub days_to_travel_forward: Option<i64>,
    /// Keep-criteria rules file
    pub keep_patients_module_path: Option<PathBuf>,
    /// Demographics table file
    pub demographics_path: Option<PathBuf>,
    /// JSONL export path
    pub export_path: Option<PathBuf>,
    /// Console report detail
    pub log_detail: Option<LogDetail>,
    /// Keep every generated person in memory
    pub retain_population: Option<bool>,
    /// Track per-module transition metrics
    pub track_detailed_transition_metrics: Option<bool>,
    /// Per-slot failure policy
    pub slot_failure_policy: Option<SlotFailurePolicy>,
    /// Append numbers to generated names
    pub append_numbers_to_names: Option<bool>,
}

/// Configuration for a population generation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Number of people to generate
    pub population: usize,

    /// Seed for the top-level random stream that hands out person seeds
    pub seed: u64,

    /// Seed for provider and payer generation
    pub clinician_seed: u64,

    /// Epoch for turning target ages into birthdates
    pub reference_time: DateTime<Utc>,

    /// Global stop time; `None` means "now" when the generator is built
    pub stop_time: Option<DateTime<Utc>>,

    /// Simulation timestep in days
    pub timestep_days: i64,

    /// Size of the worker pool
    pub threads: usize,

    /// Deceased people still count toward the population
    pub overflow: bool,

    /// Only generate people of this gender
    pub gender: Option<Gender>,

    /// Whether `min_age`/`max_age` apply
    pub age_specified: bool,

    /// Minimum age in years
    pub min_age: u32,

    /// Maximum age in years
    pub max_age: u32,

    /// State to generate people in
    pub state: String,

    /// City within the state
    pub city: Option<String>,

    /// Only keep people alive at the end of the simulation
    pub only_alive_patients: bool,

    /// Only keep people deceased at the end of the simulation
    pub only_dead_patients: bool,

    /// Tag every person with the veteran population override
    pub veteran_population_override: bool,

    /// Bound on attempts per slot; `None` or `Some(0)` is unbounded
    pub max_attempts_per_slot: Option<u64>,

    /// Enabled module name filters; `None` enables every module
    pub enabled_modules: Option<Vec<String>>,

    /// Fixed-identity record groups file
    pub fixed_record_path: Option<PathBuf>,

    /// Population snapshot to resume from
    pub initial_population_snapshot_path: Option<PathBuf>,

    /// Path to save the population snapshot
    pub updated_population_snapshot_path: Option<PathBuf>,

    /// Days to advance a loaded snapshot; `None` or negative advances to now
    pub days_to_travel_forward: Option<i64>,

    /// Keep-criteria rules file
    pub keep_patients_module_path: Option<PathBuf>,

    /// Demographics table file; the built-in table is used when absent
    pub demographics_path: Option<PathBuf>,

    /// JSONL summary export path
    pub export_path: Option<PathBuf>,

    /// Per-person console report detail
    pub log_detail: LogDetail,

    /// Keep every generated person in memory (debug/testing)
    pub retain_population: bool,

    /// Track per-module transition metrics
    pub track_detailed_transition_metrics: bool,

    /// Policy when a slot fails with an error
    pub slot_failure_policy: SlotFailurePolicy,

    /// Append numbers to generated names
    pub append_numbers_to_names: bool,
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

/// Validation errors for generation configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    /// Population size is invalid
    #[error("Population must be greater than 0, got {0}")]
    InvalidPopulation(usize),

    /// Worker count is invalid
    #[error("Thread count must be greater than 0, got {0}")]
    InvalidThreadCount(usize),

    /// Timestep is invalid
    #[error("Timestep must be greater than 0 days, got {0}")]
    InvalidTimestep(i64),

    /// Age range is invalid
    #[error("Invalid age range: min ({0}) must be <= max ({1})")]
    InvalidAgeRange(u32, u32),

    /// Maximum age is out of range
    #[error("Maximum age must be at most {max}, got {value}")]
    MaxAgeTooLarge {
        /// Largest accepted age
        max: u32,
        /// The rejected value
        value: u32,
    },

    /// State name is empty
    #[error("State must not be empty")]
    EmptyState,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        let now = Utc::now();
        let seed = now.timestamp_millis() as u64;
        Self {
            population: defaults::POPULATION,
            seed,
            clinician_seed: seed,
            reference_time: now,
            stop_time: None,
            timestep_days: defaults::TIMESTEP_DAYS,
            threads: defaults::THREADS,
            overflow: true,
            gender: None,
            age_specified: false,
            min_age: 0,
            max_age: defaults::MAX_AGE,
            state: defaults::STATE.to_string(),
            city: None,
            only_alive_patients: false,
            only_dead_patients: false,
            veteran_population_override: false,
            max_attempts_per_slot: Some(defaults::MAX_ATTEMPTS_PER_SLOT),
            enabled_modules: None,
            fixed_record_path: None,
            initial_population_snapshot_path: None,
            updated_population_snapshot_path: None,
            days_to_travel_forward: None,
            keep_patients_module_path: None,
            demographics_path: None,
            export_path: None,
            log_detail: LogDetail::Simple,
            retain_population: false,
            track_detailed_transition_metrics: false,
            slot_failure_policy: SlotFailurePolicy::Skip,
            append_numbers_to_names: true,
        }
    }
}

impl GenerationConfig {
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

        Self::apply_cli_overrides(&mut config, args);
        config.normalize_patient_filters();

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
    fn from_config_file(file: ConfigFile) -> Self {
        let defaults = Self::default();
        let seed = file.seed.unwrap_or(defaults.seed);

        Self {
            population: file.population.unwrap_or(defaults.population),
            seed,
            clinician_seed: file.clinician_seed.unwrap_or(seed),
            reference_time: file.reference_time.unwrap_or(defaults.reference_time),
            stop_time: file.stop_time.or(defaults.stop_time),
            timestep_days: file.timestep_days.unwrap_or(defaults.timestep_days),
            threads: file.threads.unwrap_or(defaults.threads),
            overflow: file.overflow.unwrap_or(defaults.overflow),
            gender: file.gender.or(defaults.gender),
            age_specified: file.age_specified.unwrap_or(defaults.age_specified),
            min_age: file.min_age.unwrap_or(defaults.min_age),
            max_age: file.max_age.unwrap_or(defaults.max_age),
            state: file.state.unwrap_or(defaults.state),
            city: file.city.or(defaults.city),
            only_alive_patients: file.only_alive_patients.unwrap_or(defaults.only_alive_patients),
            only_dead_patients: file.only_dead_patients.unwrap_or(defaults.only_dead_patients),
            veteran_population_override: file
                .veteran_population_override
                .unwrap_or(defaults.veteran_population_override),
            max_attempts_per_slot: file.max_attempts_per_slot.or(defaults.max_attempts_per_slot),
            enabled_modules: file.enabled_modules.or(defaults.enabled_modules),
            fixed_record_path: file.fixed_record_path.or(defaults.fixed_record_path),
            initial_population_snapshot_path: file
                .initial_population_snapshot_path
                .or(defaults.initial_population_snapshot_path),
            updated_population_snapshot_path: file
                .updated_population_snapshot_path
                .or(defaults.updated_population_snapshot_path),
            days_to_travel_forward: file.days_to_travel_forward.or(defaults.days_to_travel_forward),
            keep_patients_module_path: file
                .keep_patients_module_path
                .or(defaults.keep_patients_module_path),
            demographics_path: file.demographics_path.or(defaults.demographics_path),
            export_path: file.export_path.or(defaults.export_path),
            log_detail: file.log_detail.unwrap_or(defaults.log_detail),
            retain_population: file.retain_population.unwrap_or(defaults.retain_population),
            track_detailed_transition_metrics: file
                .track_detailed_transition_metrics
                .unwrap_or(defaults.track_detailed_transition_metrics),
            slot_failure_policy: file.slot_failure_policy.unwrap_or(defaults.slot_failure_policy),
            append_numbers_to_names: file
                .append_numbers_to_names
                .unwrap_or(defaults.append_numbers_to_names),
        }
    }

    /// Apply CLI argument overrides to configuration
    fn apply_cli_overrides(config: &mut Self, args: CliArgs) {
        if let Some(value) = args.state {
            config.state = value;
        }
        if let Some(value) = args.city {
            config.city = Some(value);
        }
        if let Some(value) = args.population {
            config.population = value;
        }
        if let Some(value) = args.seed {
            config.seed = value;
            config.clinician_seed = value;
        }
        if let Some(value) = args.clinician_seed {
            config.clinician_seed = value;
        }
        if let Some(date) = args.reference_date {
            if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
                config.reference_time = midnight.and_utc();
            }
        }
        if let Some(value) = args.gender {
            config.gender = Some(value);
        }
        if let Some(range) = args.age {
            config.age_specified = true;
            config.min_age = range.min;
            config.max_age = range.max;
        }
        if !args.modules.is_empty() {
            config.enabled_modules = Some(args.modules);
        }
        if let Some(value) = args.fixed_records {
            config.fixed_record_path = Some(value);
        }
        if let Some(value) = args.initial_snapshot {
            config.initial_population_snapshot_path = Some(value);
        }
        if let Some(value) = args.updated_snapshot {
            config.updated_population_snapshot_path = Some(value);
        }
        if let Some(value) = args.days_forward {
            config.days_to_travel_forward = Some(value);
        }
        if let Some(value) = args.keep_module {
            config.keep_patients_module_path = Some(value);
        }
        if let Some(value) = args.demographics {
            config.demographics_path = Some(value);
        }
        if let Some(value) = args.export {
            config.export_path = Some(value);
        }
        if let Some(value) = args.max_attempts {
            config.max_attempts_per_slot = Some(value);
        }
        if let Some(value) = args.threads {
            config.threads = value;
        }
        if let Some(value) = args.timestep_days {
            config.timestep_days = value;
        }
        if let Some(value) = args.log_detail {
            config.log_detail = value;
        }
        if let Some(value) = args.on_slot_failure {
            config.slot_failure_policy = value;
        }

        // Boolean flags only ever switch behavior on
        if args.only_alive {
            config.only_alive_patients = true;
        }
        if args.only_dead {
            config.only_dead_patients = true;
        }
        if args.no_overflow {
            config.overflow = false;
        }
        if args.veterans {
            config.veteran_population_override = true;
        }
        if args.metrics {
            config.track_detailed_transition_metrics = true;
        }
    }

    /// Requesting both only-alive and only-dead people cancels both filters
    pub fn normalize_patient_filters(&mut self) {
        if self.only_alive_patients && self.only_dead_patients {
            self.only_alive_patients = false;
            self.only_dead_patients = false;
        }
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Print configuration as JSON
    pub fn print_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validate the configuration parameters
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.population == 0 && self.fixed_record_path.is_none() {
            return Err(ConfigValidationError::InvalidPopulation(self.population));
        }

        if self.threads == 0 {
            return Err(ConfigValidationError::InvalidThreadCount(self.threads));
        }

        if self.timestep_days <= 0 {
            return Err(ConfigValidationError::InvalidTimestep(self.timestep_days));
        }

        if self.min_age > self.max_age {
            return Err(ConfigValidationError::InvalidAgeRange(self.min_age, self.max_age));
        }

        if self.max_age > defaults::MAX_AGE {
            return Err(ConfigValidationError::MaxAgeTooLarge {
                max: defaults::MAX_AGE,
                value: self.max_age,
            });
        }

        if self.state.trim().is_empty() {
            return Err(ConfigValidationError::EmptyState);
        }

        Ok(())
    }

    /// Simulation timestep as a duration
    pub fn timestep(&self) -> Duration {
        Duration::days(self.timestep_days)
    }

    /// Effective attempt bound, treating zero as unbounded
    pub fn max_attempts(&self) -> Option<u64> {
        self.max_attempts_per_slot.filter(|&attempts| attempts > 0)
    }

    /// Whether every generated person is kept in memory
    pub fn retains_population(&self) -> bool {
        self.retain_population || self.updated_population_snapshot_path.is_some()
    }

    /// Human readable location, "City, State" or just the state
    pub fn location_name(&self) -> String {
        match &self.city {
            Some(city) => format!("{}, {}", city, self.state),
            None => self.state.clone(),
        }
    }
}
