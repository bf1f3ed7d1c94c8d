//! Person model
//!
//! This module contains the simulated person, its typed attribute map and the
//! health record accumulated while the person is stepped through time.
//!
//! # Overview
//!
//! - **Person**: seed-derived identity and generator, attributes, simulated time
//!   cursor, active modules, state history, providers, symptoms and vital signs
//! - **AttributeValue**: typed attribute values (text, numbers, flags, times,
//!   fixed-identity record groups)
//! - **HealthRecord**: encounters opened and closed while simulating
//!
//! # Usage Example
//!
//! ```rust
//! use population_generator::person::*;
//! use chrono::{TimeZone, Utc};
//!
//! let mut person = Person::new(42, 1);
//! let birth = Utc.with_ymd_and_hms(1990, 1, 1, 0, 0, 0).unwrap();
//! person.set_attribute(keys::BIRTHDATE, birth);
//!
//! let now = Utc.with_ymd_and_hms(2020, 6, 1, 0, 0, 0).unwrap();
//! assert!(person.alive(now));
//! assert_eq!(person.age_in_years(now), 30);
//! ```

pub mod attributes;
#[allow(clippy::module_inception)]
pub mod person;
pub mod record;

// Re-export all public types for convenience
pub use attributes::{keys, AttributeValue, Attributes};
pub use person::{age_between, DeathRecord, Person, StateRecord};
pub use record::{Encounter, HealthRecord, DEATH_CERTIFICATION_ENCOUNTER, WELLNESS_ENCOUNTER};
