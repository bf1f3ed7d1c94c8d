//! Accumulated health record of a person

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Encounter kind used for the periodic wellness visit
pub const WELLNESS_ENCOUNTER: &str = "Wellness";

/// Encounter kind used to certify a death
pub const DEATH_CERTIFICATION_ENCOUNTER: &str = "Death Certification";

/// A single encounter with a provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Encounter {
    /// Kind of encounter (wellness, death certification, ...)
    pub kind: String,
    /// Provider that handled the encounter
    pub provider: Option<String>,
    /// Start of the encounter
    pub start: DateTime<Utc>,
    /// End of the encounter; `None` while still open
    pub stop: Option<DateTime<Utc>>,
}

impl Encounter {
    /// Whether the encounter has not been closed yet
    pub fn is_open(&self) -> bool {
        self.stop.is_none()
    }
}

/// Ordered list of encounters accumulated while a person is simulated
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthRecord {
    /// Encounters in the order they were started
    pub encounters: Vec<Encounter>,
}

impl HealthRecord {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Open an encounter and return its index
    pub fn start_encounter(
        &mut self,
        kind: impl Into<String>,
        provider: Option<String>,
        time: DateTime<Utc>,
    ) -> usize {
        self.encounters.push(Encounter { kind: kind.into(), provider, start: time, stop: None });
        self.encounters.len() - 1
    }

    /// Close every open encounter at `time`, returning how many were closed
    pub fn end_open_encounters(&mut self, time: DateTime<Utc>) -> usize {
        let mut closed = 0;
        for encounter in self.encounters.iter_mut().filter(|e| e.is_open()) {
            encounter.stop = Some(time);
            closed += 1;
        }
        closed
    }

    /// Number of encounters still open
    pub fn open_encounter_count(&self) -> usize {
        self.encounters.iter().filter(|e| e.is_open()).count()
    }

    /// Whether any encounter of `kind` has been recorded
    pub fn has_encounter(&self, kind: &str) -> bool {
        self.encounters.iter().any(|e| e.kind == kind)
    }

    /// Encounters that started in `[start, end)`
    pub fn encounters_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> impl Iterator<Item = &Encounter> {
        self.encounters.iter().filter(move |e| e.start >= start && e.start < end)
    }

    /// Total number of encounters
    pub fn encounter_count(&self) -> usize {
        self.encounters.len()
    }

    /// One-line textual summary used by the detailed console report
    pub fn text_summary(&self) -> String {
        if self.encounters.is_empty() {
            return "no encounters".to_string();
        }
        let first = self.encounters.iter().map(|e| e.start).min();
        let last = self.encounters.iter().map(|e| e.stop.unwrap_or(e.start)).max();
        match (first, last) {
            (Some(first), Some(last)) => format!(
                "{} encounters between {} and {}",
                self.encounters.len(),
                first.format("%Y-%m-%d"),
                last.format("%Y-%m-%d")
            ),
            _ => format!("{} encounters", self.encounters.len()),
        }
    }
}
