//! The simulated person
//!
//! A [`Person`] is owned by exactly one generation task from creation until it
//! is handed to the recorder and exporter. All randomness used while
//! simulating it comes from its own seeded generator, so a person built from
//! the same seed and attributes evolves identically on any worker thread.

use chrono::{DateTime, Datelike, Utc};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::person::{keys, AttributeValue, Attributes, HealthRecord};
use crate::types::PersonId;

/// A terminal state reached by a module, kept in the person's history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateRecord {
    /// Module that recorded the state
    pub module: String,
    /// State name
    pub state: String,
    /// Simulated time at which the state was entered
    pub entered: DateTime<Utc>,
}

/// Death details
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeathRecord {
    /// Instant of death
    pub time: DateTime<Utc>,
    /// Recorded cause
    pub cause: String,
}

/// A generated person and all of its simulated state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
    /// Identifier derived from the person seed
    pub id: PersonId,
    /// Seed this person was built from
    pub seed: u64,
    /// Seed of the population run that produced this person
    pub population_seed: u64,
    rng: ChaCha8Rng,
    /// Attribute map
    pub attributes: Attributes,
    /// Simulated time cursor
    pub last_updated: DateTime<Utc>,
    /// Names of modules still being processed for this person
    pub active_modules: Vec<String>,
    /// Terminal states reached by modules, most recent first
    pub history: Vec<StateRecord>,
    /// Accumulated health record
    pub record: HealthRecord,
    providers: BTreeSet<String>,
    symptoms: BTreeMap<String, u32>,
    vital_signs: BTreeMap<String, f64>,
    death: Option<DeathRecord>,
}

impl Person {
    /// Create a person with no attributes from a seed
    pub fn new(seed: u64, population_seed: u64) -> Self {
        Self {
            id: PersonId::from_seed(seed),
            seed,
            population_seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
            attributes: Attributes::new(),
            last_updated: DateTime::<Utc>::default(),
            active_modules: Vec::new(),
            history: Vec::new(),
            record: HealthRecord::new(),
            providers: BTreeSet::new(),
            symptoms: BTreeMap::new(),
            vital_signs: BTreeMap::new(),
            death: None,
        }
    }

    /// The person's private random generator
    pub fn rng(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }

    /// Whether the person is alive at `time`
    pub fn alive(&self, time: DateTime<Utc>) -> bool {
        self.death.as_ref().map_or(true, |death| death.time > time)
    }

    /// Record the person's death; the first recorded death wins
    pub fn record_death(&mut self, time: DateTime<Utc>, cause: impl Into<String>) {
        if self.death.is_none() {
            self.death = Some(DeathRecord { time, cause: cause.into() });
        }
    }

    /// Death details, if the person has died
    pub fn death(&self) -> Option<&DeathRecord> {
        self.death.as_ref()
    }

    /// Birth instant
    pub fn birthdate(&self) -> Option<DateTime<Utc>> {
        self.attribute(keys::BIRTHDATE).and_then(AttributeValue::as_time)
    }

    /// Age in whole calendar years at `time`; zero before birth or without a birthdate
    pub fn age_in_years(&self, time: DateTime<Utc>) -> u32 {
        match self.birthdate() {
            Some(birth) => age_between(birth, time),
            None => 0,
        }
    }

    /// Number of distinct providers the person has seen
    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    /// Link a provider to this person
    pub fn add_provider(&mut self, provider: impl Into<String>) {
        self.providers.insert(provider.into());
    }

    /// Distinct providers, in sorted order
    pub fn providers(&self) -> impl Iterator<Item = &str> {
        self.providers.iter().map(String::as_str)
    }

    /// Push a terminal state to the front of the history
    pub fn record_state(
        &mut self,
        module: impl Into<String>,
        state: impl Into<String>,
        time: DateTime<Utc>,
    ) {
        self.history.insert(
            0,
            StateRecord { module: module.into(), state: state.into(), entered: time },
        );
    }

    /// Set the severity of a symptom
    pub fn set_symptom(&mut self, name: impl Into<String>, severity: u32) {
        self.symptoms.insert(name.into(), severity);
    }

    /// Sum of all symptom severities
    pub fn symptom_total(&self) -> u32 {
        self.symptoms.values().sum()
    }

    /// Set a vital sign value
    pub fn set_vital_sign(&mut self, name: impl Into<String>, value: f64) {
        self.vital_signs.insert(name.into(), value);
    }

    /// Current value of a vital sign
    pub fn vital_sign(&self, name: &str) -> Option<f64> {
        self.vital_signs.get(name).copied()
    }

    /// All vital signs, in name order
    pub fn vital_signs(&self) -> impl Iterator<Item = (&str, f64)> {
        self.vital_signs.iter().map(|(name, value)| (name.as_str(), *value))
    }

    /// Look up an attribute
    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }

    /// Look up a text attribute
    pub fn text_attribute(&self, key: &str) -> Option<&str> {
        self.attribute(key).and_then(AttributeValue::as_str)
    }

    /// Set an attribute, replacing any previous value
    pub fn set_attribute(&mut self, key: &str, value: impl Into<AttributeValue>) {
        self.attributes.insert(key.to_string(), value.into());
    }

    /// Display name, or an empty string before one is assigned
    pub fn name(&self) -> &str {
        self.text_attribute(keys::NAME).unwrap_or("")
    }

    /// Gender code
    pub fn gender(&self) -> &str {
        self.text_attribute(keys::GENDER).unwrap_or("")
    }

    /// City of residence
    pub fn city(&self) -> &str {
        self.text_attribute(keys::CITY).unwrap_or("")
    }

    /// State of residence
    pub fn state(&self) -> &str {
        self.text_attribute(keys::STATE).unwrap_or("")
    }

    /// Target age sampled for this person
    pub fn target_age(&self) -> Option<i64> {
        self.attribute(keys::TARGET_AGE).and_then(AttributeValue::as_i64)
    }
}

/// Whole calendar years between `birth` and `time`
pub fn age_between(birth: DateTime<Utc>, time: DateTime<Utc>) -> u32 {
    if time <= birth {
        return 0;
    }
    let mut years = time.year() - birth.year();
    if (time.month(), time.day(), time.time()) < (birth.month(), birth.day(), birth.time()) {
        years -= 1;
    }
    years.max(0) as u32
}
