//! Simulation orchestration and control
//!
//! This module contains the population orchestrator, the rejection-sampling
//! controller, the time-stepped loop and the contracts it drives, statistics
//! collection, snapshots, export, and error handling.
//!
//! # Overview
//!
//! - **PopulationGenerator**: fans population slots out over a worker pool and reports the totals
//! - **SlotController**: regenerates a slot's person until it meets the acceptance criteria
//! - **TimeStepper**: advances a person through the enabled modules in fixed steps
//! - **Module / LifecycleHooks / HealthRecordEditor**: pluggable per-step behavior
//! - **PopulationRecorder**: counters, retention list, transition metrics and console report
//! - **SimulationError**: error handling for every stage of generation
//!
//! # Usage Example
//!
//! ```rust
//! use population_generator::simulation::*;
//! use population_generator::types::*;
//! use chrono::{TimeZone, Utc};
//!
//! let reference = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
//! let config = GenerationConfig {
//!     population: 2,
//!     seed: 42,
//!     threads: 2,
//!     reference_time: reference,
//!     stop_time: Some(reference),
//!     log_detail: LogDetail::None,
//!     ..Default::default()
//! };
//!
//! let generator = PopulationGenerator::builder(config)
//!     .registry(ModuleRegistry::new())
//!     .build()
//!     .unwrap();
//! let summary = generator.run().unwrap();
//! assert_eq!(summary.total, 2);
//! ```

pub mod controller;
pub mod criteria;
pub mod editors;
pub mod error;
pub mod export;
pub mod hooks;
pub mod keep;
pub mod logging;
pub mod metrics;
pub mod module;
pub mod orchestrator;
pub mod report;
pub mod snapshot;
pub mod statistics;
pub mod stepper;

// Re-export all public types for convenience
pub use controller::*;
pub use criteria::*;
pub use editors::*;
pub use error::*;
pub use export::*;
pub use hooks::*;
pub use keep::*;
pub use logging::*;
pub use metrics::*;
pub use module::*;
pub use orchestrator::*;
pub use report::*;
pub use snapshot::*;
pub use statistics::*;
pub use stepper::*;
