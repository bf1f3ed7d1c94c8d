//! Lifecycle hooks run by the time-stepped loop around the modules
//!
//! Hooks cover what happens to every person regardless of enabled modules:
//! birth, insurance assignment, encounter admission and closing, and death
//! processing.

use chrono::{DateTime, Duration, Utc};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::person::{keys, Person, DEATH_CERTIFICATION_ENCOUNTER, WELLNESS_ENCOUNTER};
use crate::simulation::{SimulationError, SimulationResult};

/// Per-step lifecycle callbacks
pub trait LifecycleHooks: Send + Sync + fmt::Debug {
    /// Called once when a person is created, at the birth time
    fn birth(&self, person: &mut Person, time: DateTime<Utc>) -> SimulationResult<()>;

    /// Assign insurance for the step boundary at `time`
    fn assign_insurance(&self, person: &mut Person, time: DateTime<Utc>) -> SimulationResult<()>;

    /// Admit the person to any encounter due at `time`
    fn admit_encounters(&self, person: &mut Person, time: DateTime<Utc>) -> SimulationResult<()>;

    /// Close encounters still open at the end of the step
    fn end_encounters(&self, person: &mut Person, time: DateTime<Utc>) -> SimulationResult<()>;

    /// Terminal processing after the loop exits; a no-op for living persons
    fn process_death(&self, person: &mut Person, time: DateTime<Utc>) -> SimulationResult<()>;
}

/// A provider persons can be linked to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    /// Stable identifier
    pub id: String,
    /// Display name
    pub name: String,
}

/// Providers generated for a location from the clinician seed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderDirectory {
    providers: Vec<Provider>,
}

const PROVIDER_KINDS: [&str; 6] = [
    "Family Practice",
    "Community Health Center",
    "Medical Group",
    "Primary Care",
    "Pediatrics",
    "Internal Medicine",
];

impl ProviderDirectory {
    /// Generate `count` providers for `location`, deterministic in `clinician_seed`
    pub fn generate(location: &str, clinician_seed: u64, count: usize) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(clinician_seed);
        let providers = (0..count.max(1))
            .map(|i| {
                let kind = PROVIDER_KINDS[rng.gen_range(0..PROVIDER_KINDS.len())];
                Provider {
                    id: format!("provider-{:04}-{:08x}", i, rng.gen::<u32>()),
                    name: format!("{} {}", location, kind),
                }
            })
            .collect();
        Self { providers }
    }

    /// Pick a provider
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> SimulationResult<&Provider> {
        self.providers
            .choose(rng)
            .ok_or_else(|| SimulationError::configuration_error("Provider directory is empty"))
    }

    /// All providers
    pub fn providers(&self) -> &[Provider] {
        &self.providers
    }
}

const MALE_FIRST_NAMES: [&str; 10] =
    ["James", "John", "Robert", "Michael", "William", "David", "Joseph", "Thomas", "Daniel", "Paul"];
const FEMALE_FIRST_NAMES: [&str; 10] =
    ["Mary", "Patricia", "Jennifer", "Linda", "Elizabeth", "Susan", "Jessica", "Sarah", "Karen", "Nancy"];
const LAST_NAMES: [&str; 12] = [
    "Smith", "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller", "Davis", "Rodriguez",
    "Martinez", "Wilson", "Anderson",
];

/// Default hooks: names at birth, insurance by age and income, periodic
/// wellness visits and death certification
#[derive(Debug, Clone)]
pub struct StandardHooks {
    providers: ProviderDirectory,
    append_numbers_to_names: bool,
}

impl StandardHooks {
    /// Create hooks drawing providers from `providers`
    pub fn new(providers: ProviderDirectory, append_numbers_to_names: bool) -> Self {
        Self { providers, append_numbers_to_names }
    }

    /// Time between wellness visits at `age`
    pub fn wellness_interval(age: u32) -> Duration {
        match age {
            0 => Duration::days(60),
            1..=2 => Duration::days(180),
            3..=17 => Duration::days(365),
            18..=49 => Duration::days(3 * 365),
            _ => Duration::days(365),
        }
    }

    fn generated_name(&self, person: &mut Person) -> (String, String) {
        let male = person.gender() == "M";
        let rng = person.rng();
        let first = if male {
            MALE_FIRST_NAMES[rng.gen_range(0..MALE_FIRST_NAMES.len())]
        } else {
            FEMALE_FIRST_NAMES[rng.gen_range(0..FEMALE_FIRST_NAMES.len())]
        };
        let last = LAST_NAMES[rng.gen_range(0..LAST_NAMES.len())];
        if self.append_numbers_to_names {
            (format!("{}{}", first, rng.gen_range(100..1000)), format!("{}{}", last, rng.gen_range(100..1000)))
        } else {
            (first.to_string(), last.to_string())
        }
    }
}

impl LifecycleHooks for StandardHooks {
    fn birth(&self, person: &mut Person, _time: DateTime<Utc>) -> SimulationResult<()> {
        if person.attribute(keys::NAME).is_none() {
            let (first, last) = self.generated_name(person);
            person.set_attribute(keys::NAME, format!("{} {}", first, last));
            person.set_attribute(keys::FIRST_NAME, first);
            person.set_attribute(keys::LAST_NAME, last);
        }
        person.set_attribute(keys::AGE, 0u32);
        Ok(())
    }

    fn assign_insurance(&self, person: &mut Person, time: DateTime<Utc>) -> SimulationResult<()> {
        let income_level = person.attribute(keys::INCOME_LEVEL).and_then(|v| v.as_f64()).unwrap_or(0.5);
        let plan = if person.age_in_years(time) >= 65 {
            "Medicare"
        } else if income_level < 0.1 {
            "No Insurance"
        } else if income_level < 0.25 {
            "Medicaid"
        } else {
            "Private"
        };
        if person.text_attribute(keys::INSURANCE) != Some(plan) {
            person.set_attribute(keys::INSURANCE, plan);
        }
        Ok(())
    }

    fn admit_encounters(&self, person: &mut Person, time: DateTime<Utc>) -> SimulationResult<()> {
        let interval = Self::wellness_interval(person.age_in_years(time));
        let due = match person.attribute(keys::LAST_WELLNESS).and_then(|v| v.as_time()) {
            Some(last) => time - last >= interval,
            None => true,
        };
        if !due {
            return Ok(());
        }

        let provider = self.providers.pick(person.rng())?.clone();
        person.record.start_encounter(WELLNESS_ENCOUNTER, Some(provider.id.clone()), time);
        person.add_provider(provider.id);
        person.set_attribute(keys::LAST_WELLNESS, time);
        Ok(())
    }

    fn end_encounters(&self, person: &mut Person, time: DateTime<Utc>) -> SimulationResult<()> {
        person.record.end_open_encounters(time);
        Ok(())
    }

    fn process_death(&self, person: &mut Person, time: DateTime<Utc>) -> SimulationResult<()> {
        if person.alive(time) || person.record.has_encounter(DEATH_CERTIFICATION_ENCOUNTER) {
            return Ok(());
        }
        let death_time = person.death().map(|d| d.time).unwrap_or(time);
        let provider = self.providers.pick(person.rng())?.id.clone();
        person.record.start_encounter(DEATH_CERTIFICATION_ENCOUNTER, Some(provider), death_time);
        person.record.end_open_encounters(death_time);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn hooks() -> StandardHooks {
        StandardHooks::new(ProviderDirectory::generate("Springfield", 7, 5), false)
    }

    fn person_born(year: i32) -> Person {
        let mut person = Person::new(11, 1);
        person.set_attribute(keys::GENDER, "F");
        person.set_attribute(keys::BIRTHDATE, Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).unwrap());
        person
    }

    #[test]
    fn test_provider_directory_is_seeded() {
        let a = ProviderDirectory::generate("Springfield", 7, 5);
        let b = ProviderDirectory::generate("Springfield", 7, 5);
        let c = ProviderDirectory::generate("Springfield", 8, 5);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.providers().len(), 5);
        assert_eq!(ProviderDirectory::generate("X", 1, 0).providers().len(), 1);
    }

    #[test]
    fn test_birth_assigns_name_once() {
        let hooks = hooks();
        let mut person = person_born(2000);
        let t = Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap();
        hooks.birth(&mut person, t).unwrap();
        let name = person.name().to_string();
        assert!(!name.is_empty());
        assert!(FEMALE_FIRST_NAMES.iter().any(|f| name.starts_with(f)));

        hooks.birth(&mut person, t).unwrap();
        assert_eq!(person.name(), name);
    }

    #[test]
    fn test_insurance_by_age() {
        let hooks = hooks();
        let mut person = person_born(1950);
        person.set_attribute(keys::INCOME_LEVEL, 0.8);
        hooks.assign_insurance(&mut person, Utc.with_ymd_and_hms(1990, 1, 1, 0, 0, 0).unwrap()).unwrap();
        assert_eq!(person.text_attribute(keys::INSURANCE), Some("Private"));
        hooks.assign_insurance(&mut person, Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()).unwrap();
        assert_eq!(person.text_attribute(keys::INSURANCE), Some("Medicare"));
    }

    #[test]
    fn test_wellness_encounters_link_providers() {
        let hooks = hooks();
        let mut person = person_born(1990);
        let t = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();

        hooks.admit_encounters(&mut person, t).unwrap();
        assert_eq!(person.provider_count(), 1);
        assert_eq!(person.record.open_encounter_count(), 1);
        hooks.end_encounters(&mut person, t).unwrap();
        assert_eq!(person.record.open_encounter_count(), 0);

        hooks.admit_encounters(&mut person, t + Duration::days(7)).unwrap();
        assert_eq!(person.record.encounter_count(), 1);
        hooks.admit_encounters(&mut person, t + Duration::days(3 * 365)).unwrap();
        assert_eq!(person.record.encounter_count(), 2);
    }

    #[test]
    fn test_death_processing_is_idempotent() {
        let hooks = hooks();
        let mut person = person_born(1930);
        let t = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();

        hooks.process_death(&mut person, t).unwrap();
        assert_eq!(person.record.encounter_count(), 0);

        person.record_death(t, "Natural causes");
        hooks.process_death(&mut person, t).unwrap();
        hooks.process_death(&mut person, t + Duration::days(7)).unwrap();
        assert_eq!(person.record.encounter_count(), 1);
        assert!(person.record.has_encounter(DEATH_CERTIFICATION_ENCOUNTER));
    }
}
