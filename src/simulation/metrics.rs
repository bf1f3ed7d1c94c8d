//! Detailed transition metrics
//!
//! Aggregates, per module state, how often it was entered, how many distinct
//! persons entered it and how many persons ended the run in it.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::sync::{Mutex, PoisonError};

use crate::person::Person;

/// Counters for one module state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateMetrics {
    /// Times the state was entered across all persons
    pub entered: u64,
    /// Distinct persons that entered the state
    pub population: u64,
    /// Persons whose most recent state in the module is this one
    pub current: u64,
}

/// Thread-safe per-module state counters
#[derive(Debug, Default)]
pub struct TransitionMetrics {
    states: Mutex<BTreeMap<(String, String), StateMetrics>>,
}

impl TransitionMetrics {
    /// Empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the state history of a finished person
    pub fn record(&self, person: &Person) {
        let mut local: BTreeMap<(String, String), StateMetrics> = BTreeMap::new();
        let mut seen_modules = BTreeSet::new();

        // history is most recent first, so the first hit per module is its current state
        for entry in &person.history {
            let key = (entry.module.clone(), entry.state.clone());
            let metrics = local.entry(key).or_default();
            metrics.entered += 1;
            metrics.population = 1;
            if seen_modules.insert(entry.module.clone()) {
                metrics.current = 1;
            }
        }

        let mut states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        for (key, metrics) in local {
            let total = states.entry(key).or_default();
            total.entered += metrics.entered;
            total.population += metrics.population;
            total.current += metrics.current;
        }
    }

    /// Counters for one module state
    pub fn get(&self, module: &str, state: &str) -> Option<StateMetrics> {
        let states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        states.get(&(module.to_string(), state.to_string())).copied()
    }

    /// All counters ordered by module then state
    pub fn snapshot(&self) -> Vec<(String, String, StateMetrics)> {
        let states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        states.iter().map(|((m, s), metrics)| (m.clone(), s.clone(), *metrics)).collect()
    }

    /// Text table of all counters, with population shares relative to `total_persons`
    pub fn report(&self, total_persons: usize) -> String {
        let mut out = String::new();
        let mut current_module: Option<String> = None;
        for (module, state, metrics) in self.snapshot() {
            if current_module.as_deref() != Some(module.as_str()) {
                let _ = writeln!(out, "{}", module);
                current_module = Some(module);
            }
            let share = if total_persons == 0 {
                0.0
            } else {
                metrics.population as f64 / total_persons as f64 * 100.0
            };
            let _ = writeln!(
                out,
                "  {:<30} entered {:>8}  population {:>8} ({:>5.1}%)  current {:>8}",
                state, metrics.entered, metrics.population, share, metrics.current
            );
        }
        if out.is_empty() {
            out.push_str("No module transitions recorded\n");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_metrics_counts() {
        let t = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let mut a = Person::new(1, 1);
        a.record_state("Asthma", "Onset", t);
        a.record_state("Asthma", "Remission", t);
        a.record_state("Asthma", "Onset", t);
        let mut b = Person::new(2, 1);
        b.record_state("Asthma", "Onset", t);
        b.record_state("Asthma", "Remission", t);

        let metrics = TransitionMetrics::new();
        metrics.record(&a);
        metrics.record(&b);

        let onset = metrics.get("Asthma", "Onset").unwrap();
        assert_eq!(onset, StateMetrics { entered: 3, population: 2, current: 1 });
        let remission = metrics.get("Asthma", "Remission").unwrap();
        assert_eq!(remission, StateMetrics { entered: 2, population: 2, current: 1 });

        let report = metrics.report(2);
        assert!(report.starts_with("Asthma\n"));
        assert!(report.contains("Onset"));
    }

    #[test]
    fn test_empty_report() {
        assert_eq!(TransitionMetrics::new().report(0), "No module transitions recorded\n");
    }
}
