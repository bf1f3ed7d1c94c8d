//! Rule-based keep module
//!
//! Loaded from a JSON file, the rules decide whether a finished person is
//! kept. The decision is recorded as a terminal state, `"Keep"` or
//! `"Terminal"`, at the front of the person's history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::person::Person;
use crate::simulation::{Module, SimulationError, SimulationResult, KEEP_STATE};
use crate::types::Gender;

/// State recorded when a person is not kept
pub const REJECT_STATE: &str = "Terminal";

/// Name the keep module runs under
pub const KEEP_MODULE: &str = "Keep Patients";

/// Conditions a person must meet to be kept; unset conditions always pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeepRules {
    /// Required alive status at evaluation time
    pub alive: Option<bool>,
    /// Minimum age in years
    pub min_age: Option<u32>,
    /// Maximum age in years
    pub max_age: Option<u32>,
    /// Required gender
    pub gender: Option<Gender>,
    /// Attributes whose displayed value must equal the given text
    pub attributes: BTreeMap<String, String>,
}

impl KeepRules {
    /// Load rules from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> SimulationResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            SimulationError::configuration_error(format!(
                "Failed to read keep module {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Whether `person` satisfies every rule at `time`
    pub fn keeps(&self, person: &Person, time: DateTime<Utc>) -> bool {
        if self.alive.is_some_and(|alive| person.alive(time) != alive) {
            return false;
        }
        let age = person.age_in_years(time);
        if self.min_age.is_some_and(|min| age < min) || self.max_age.is_some_and(|max| age > max) {
            return false;
        }
        if self.gender.is_some_and(|gender| person.gender() != gender.code()) {
            return false;
        }
        self.attributes.iter().all(|(key, expected)| {
            person.attribute(key).map_or(false, |value| value.to_string() == *expected)
        })
    }
}

impl Module for KeepRules {
    fn name(&self) -> &str {
        KEEP_MODULE
    }

    fn process(&self, person: &mut Person, time: DateTime<Utc>) -> SimulationResult<bool> {
        let state = if self.keeps(person, time) { KEEP_STATE } else { REJECT_STATE };
        person.record_state(KEEP_MODULE, state, time);
        Ok(true)
    }
}
