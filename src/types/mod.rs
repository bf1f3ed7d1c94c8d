//! Core types and identifiers for the population generator
//!
//! This module contains fundamental types, identifiers, and configuration structures
//! used throughout the generator.
//!
//! # Overview
//!
//! - **Identifiers**: seed-derived person identifiers and fixed-record link identifiers
//! - **Enums**: gender codes, console report detail, per-slot failure policy
//! - **Configuration**: generation configuration with validation and CLI support
//!
//! # Usage Example
//!
//! ```rust
//! use population_generator::types::*;
//!
//! let config = GenerationConfig {
//!     population: 100,
//!     seed: 42,
//!     age_specified: true,
//!     min_age: 30,
//!     max_age: 40,
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//!
//! let id = PersonId::from_seed(42);
//! assert_eq!(id, PersonId::from_seed(42));
//! ```

pub mod config;
pub mod enums;
pub mod identifiers;

// Re-export all public types for convenience
pub use config::*;
pub use enums::*;
pub use identifiers::*;
