//! Population Generator
//!
//! A synthetic population generator that simulates each person's life from
//! birth to a stop time in fixed steps, and regenerates people until they meet
//! the configured acceptance criteria.
//!
//! # Overview
//!
//! This library generates a configured number of synthetic persons in
//! parallel. Every population slot gets a seed drawn from a single top-level
//! stream, so a run is reproducible for a given seed and configuration no
//! matter how the worker pool schedules it.
//!
//! ## Key Features
//!
//! - **Demographic Sampling**: city, race, ethnicity, language, education, income and socioeconomic scores
//! - **Fixed Identities**: bind population slots to externally supplied record groups
//! - **Rejection Sampling**: alive/dead filters, provider linkage and pluggable keep modules
//! - **Time-Stepped Simulation**: lifecycle hooks, pluggable modules and record editors
//! - **Snapshots**: save a population and later advance it forward in time
//! - **Reporting**: per-person console report, JSONL export and transition metrics
//!
//! ## Quick Start
//!
//! ```rust
//! use population_generator::*;
//! use chrono::{TimeZone, Utc};
//!
//! let reference = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
//! let config = GenerationConfig {
//!     population: 3,
//!     seed: 42,
//!     reference_time: reference,
//!     stop_time: Some(reference),
//!     log_detail: LogDetail::None,
//!     ..Default::default()
//! };
//!
//! let generator = PopulationGenerator::new(config)?;
//! let summary = generator.run()?;
//! println!("{}", summary.compact_summary());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Module Organization
//!
//! - [`types`]: Core types, identifiers, and configuration
//! - [`person`]: Person model, attributes, and health record
//! - [`demographics`]: Location tables, demographic sampling, and fixed-identity records
//! - [`simulation`]: Orchestration, rejection sampling, time stepping, and reporting
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐    ┌──────────────┐    ┌──────────────┐
//! │   Types     │    │ Demographics │    │    Person    │
//! │             │    │              │    │              │
//! │ Identifiers │◄───┤ Locations    │───►│ Attributes   │
//! │ Enums       │    │ Sampler      │    │ Record       │
//! │ Config      │    │ Fixed Records│    │              │
//! └─────────────┘    └──────────────┘    └──────────────┘
//!        ▲                   ▲                   ▲
//!        │                   │                   │
//! ┌──────────────────────────────────────────────────────┐
//! │                     Simulation                       │
//! │                                                      │
//! │ Orchestrator ─► Controller ─► Stepper ─► Modules     │
//! │ Recorder, Snapshots, Export, Metrics                 │
//! └──────────────────────────────────────────────────────┘
//! ```
#![warn(missing_docs, missing_debug_implementations, unreachable_pub)]

// Module declarations
pub mod demographics;
pub mod person;
pub mod simulation;

pub mod types;

// Core types and identifiers
pub use types::{
    AgeRange,
    // Configuration
    CliArgs,
    ConfigError,
    ConfigValidationError,
    // Enums
    Gender,
    GenerationConfig,
    // Identifiers
    LinkId,
    LogDetail,
    PersonId,
    SlotFailurePolicy,
};

// Person model
pub use person::{keys, AttributeValue, Attributes, HealthRecord, Person};

// Demographics
pub use demographics::{
    birthdate_from_target_age, DemographicsSampler, FixedRecord, FixedRecordGroup, Location,
};

// Simulation types and functionality
pub use simulation::{
    CriteriaCheck, Exporter, InterruptHandle, LifecycleHooks, Module, ModuleRegistry,
    PopulationGenerator, PopulationSummary, SimulationError, SimulationResult,
};
