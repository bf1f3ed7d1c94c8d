//! Demographics for new persons
//!
//! This module contains the location tables persons are sampled from, the
//! sampler that turns them into attribute sets, and the fixed-identity record
//! groups that can pin a population slot to a real identity.
//!
//! # Usage Example
//!
//! ```rust
//! use population_generator::demographics::*;
//! use population_generator::types::GenerationConfig;
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//!
//! let config = GenerationConfig::default();
//! let sampler = DemographicsSampler::new(Location::builtin("Massachusetts", None), &config);
//!
//! let mut rng = ChaCha8Rng::seed_from_u64(42);
//! let attributes = sampler.random_demographics(&mut rng).unwrap();
//! assert!(attributes.contains_key("birthdate"));
//! ```

pub mod fixed_record;
pub mod location;
pub mod sampler;

// Re-export all public types for convenience
pub use fixed_record::{load_fixed_record_groups, FixedRecord, FixedRecordError, FixedRecordGroup};
pub use location::{
    pick_weighted, CityDemographics, Location, RangeWeight, SocioeconomicScoring, WeightTable,
};
pub use sampler::{birthdate_from_target_age, DemographicsSampler};
