// Population Generator - Main Entry Point
//
// You can run it via Cargo:
//
// ```console
// $ cargo build --release
// $ ./target/release/population-generator
// ```
//
// Or with custom configuration:
//
// ```console
// $ ./target/release/population-generator -p 100 -s 42 --verbose Massachusetts Boston
// ```

use anyhow::{Context, Result};
use clap::Parser;
use population_generator::simulation::{LoggingConfig, PopulationGenerator, PopulationSummary};
use population_generator::types::{CliArgs, GenerationConfig};
use std::process;
use tracing::{error, info};

fn main() {
    // Parse CLI arguments first to check for special flags
    let args = CliArgs::parse();

    // Handle special CLI flags that don't require full initialization
    if args.print_config {
        match GenerationConfig::default().print_json() {
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

    // The guard flushes file logging on exit
    let _logging = match LoggingConfig::for_cli(args.verbose, args.debug).init() {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            process::exit(1);
        }
    };

    info!("Starting Population Generator");

    let dry_run = args.dry_run;
    let config = match load_config(args) {
        Ok(config) => config,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    };

    if dry_run {
        eprintln!("Configuration validation successful!");
        eprintln!("Dry run mode - no population will be generated.");
        print_configuration_summary(&config);
        return;
    }

    print_startup_banner(&config);

    match run(config) {
        Ok(summary) => {
            print_final_summary(&summary);
            info!("Population Generator completed successfully");
        }
        Err(e) => {
            error!("Generation failed: {:#}", e);
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

/// Merge CLI arguments over the optional config file and validate the result
fn load_config(args: CliArgs) -> Result<GenerationConfig> {
    let config = GenerationConfig::from_cli_args(args).context("Failed to load configuration")?;
    config.validate().context("Configuration validation failed")?;
    info!("Configuration loaded and validated successfully");
    Ok(config)
}

/// Build the generator and run it to completion
fn run(config: GenerationConfig) -> Result<PopulationSummary> {
    let generator =
        PopulationGenerator::new(config).context("Failed to initialize population generator")?;
    let summary = generator.run().context("Population generation failed")?;
    Ok(summary)
}

/// Print startup banner and configuration summary
fn print_startup_banner(config: &GenerationConfig) {
    eprintln!("Population Generator");
    eprintln!("====================");
    eprintln!();

    print_configuration_summary(config);
}

/// Print configuration summary
fn print_configuration_summary(config: &GenerationConfig) {
    eprintln!("Running with options:");
    eprintln!("  Population: {}", config.population);
    eprintln!("  Seed: {}", config.seed);
    eprintln!("  Provider Seed: {}", config.clinician_seed);
    eprintln!("  Reference Time: {}", config.reference_time);
    eprintln!("  Location: {}", config.location_name());
    if config.age_specified {
        eprintln!("  Min Age: {}", config.min_age);
        eprintln!("  Max Age: {}", config.max_age);
    }
    if let Some(gender) = config.gender {
        eprintln!("  Gender: {}", gender);
    }
    if let Some(modules) = &config.enabled_modules {
        eprintln!("  Modules: {}", modules.join(", "));
    }
    if let Some(path) = &config.fixed_record_path {
        eprintln!("  Fixed Records: {}", path.display());
    }
    if let Some(path) = &config.initial_population_snapshot_path {
        eprintln!("  Initial Snapshot: {}", path.display());
    }
    eprintln!("  Threads: {}", config.threads);
    eprintln!();
}

/// Print the final counts
fn print_final_summary(summary: &PopulationSummary) {
    print!("{}", summary);
    if summary.failed_slots > 0 {
        eprintln!("{} slots failed; see the log for details", summary.failed_slots);
    }
}
