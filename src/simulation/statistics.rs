//! Statistics collection and reporting
//!
//! This module contains the shared counters updated by every generation task,
//! the recorder that feeds finished persons into counters, retention list,
//! transition metrics and console report, and the final run summary.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use tracing::warn;

use crate::person::Person;
use crate::simulation::{ConsoleReporter, TransitionMetrics};

/// Lock-free counters shared by all generation tasks
#[derive(Debug, Default)]
pub struct PopulationStatistics {
    total: AtomicUsize,
    alive: AtomicUsize,
    dead: AtomicUsize,
}

impl PopulationStatistics {
    /// Zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one recorded person
    pub fn record(&self, is_alive: bool) {
        if is_alive {
            self.alive.fetch_add(1, Ordering::Relaxed);
        } else {
            self.dead.fetch_add(1, Ordering::Relaxed);
        }
        self.total.fetch_add(1, Ordering::Relaxed);
    }

    /// Persons recorded so far
    pub fn total(&self) -> usize {
        self.total.load(Ordering::Relaxed)
    }

    /// Persons recorded alive
    pub fn alive(&self) -> usize {
        self.alive.load(Ordering::Relaxed)
    }

    /// Persons recorded dead
    pub fn dead(&self) -> usize {
        self.dead.load(Ordering::Relaxed)
    }
}

/// Feeds every recorded person into the run's bookkeeping
#[derive(Debug)]
pub struct PopulationRecorder {
    statistics: PopulationStatistics,
    retained: Option<Mutex<Vec<Person>>>,
    metrics: Option<TransitionMetrics>,
    reporter: ConsoleReporter,
    timestep: Duration,
}

impl PopulationRecorder {
    /// Create a recorder; `retain` keeps a copy of every person in memory
    pub fn new(reporter: ConsoleReporter, timestep: Duration, retain: bool, track_metrics: bool) -> Self {
        Self {
            statistics: PopulationStatistics::new(),
            retained: retain.then(|| Mutex::new(Vec::new())),
            metrics: track_metrics.then(TransitionMetrics::new),
            reporter,
            timestep,
        }
    }

    /// Record `person` produced for population slot `slot`
    pub fn record_person(&self, person: &Person, slot: usize) {
        let finish_time = person.last_updated + self.timestep;
        let is_alive = person.alive(finish_time);

        if let Some(retained) = &self.retained {
            retained.lock().unwrap_or_else(PoisonError::into_inner).push(person.clone());
        }
        if let Some(metrics) = &self.metrics {
            metrics.record(person);
        }
        if let Err(e) = self.reporter.report(person, slot, finish_time, is_alive) {
            warn!("Failed to write report for slot {}: {}", slot, e);
        }
        self.statistics.record(is_alive);
    }

    /// Shared counters
    pub fn statistics(&self) -> &PopulationStatistics {
        &self.statistics
    }

    /// Transition metrics, when tracked
    pub fn metrics(&self) -> Option<&TransitionMetrics> {
        self.metrics.as_ref()
    }

    /// Whether persons are retained in memory
    pub fn retains_population(&self) -> bool {
        self.retained.is_some()
    }

    /// Copy of the retained persons, in recording order
    pub fn retained_population(&self) -> Vec<Person> {
        match &self.retained {
            Some(retained) => retained.lock().unwrap_or_else(PoisonError::into_inner).clone(),
            None => Vec::new(),
        }
    }
}

/// Final counts of a generation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationSummary {
    /// Slots the run was asked to fill
    pub requested: usize,
    /// Persons recorded, including dead overflow records
    pub total: usize,
    /// Persons recorded alive
    pub alive: usize,
    /// Persons recorded dead
    pub dead: usize,
    /// Slots that ended with an error
    pub failed_slots: usize,
    /// Slots cancelled before they finished
    pub cancelled_slots: usize,
    /// Wall-clock duration of the run in milliseconds
    pub duration_ms: u64,
    /// Transition metrics table, when tracked
    pub metrics_report: Option<String>,
}

impl PopulationSummary {
    /// Share of recorded persons that are alive, in percent
    pub fn alive_percentage(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.alive as f64 / self.total as f64 * 100.0
        }
    }

    /// Slots that produced a person
    pub fn completed_slots(&self) -> usize {
        self.requested.saturating_sub(self.failed_slots + self.cancelled_slots)
    }

    /// One-line summary
    pub fn compact_summary(&self) -> String {
        format!("Records: total={}, alive={}, dead={}", self.total, self.alive, self.dead)
    }
}

impl fmt::Display for PopulationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.compact_summary())?;
        if self.failed_slots > 0 || self.cancelled_slots > 0 {
            writeln!(
                f,
                "Slots: requested={}, failed={}, cancelled={}",
                self.requested, self.failed_slots, self.cancelled_slots
            )?;
        }
        if let Some(report) = &self.metrics_report {
            write!(f, "{}", report)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LogDetail;
    use chrono::{TimeZone, Utc};
    use std::io;
    use std::sync::Arc;
    use std::thread;

    fn recorder(retain: bool, metrics: bool) -> PopulationRecorder {
        let reporter = ConsoleReporter::with_writer(LogDetail::Simple, Box::new(io::sink()));
        PopulationRecorder::new(reporter, Duration::days(7), retain, metrics)
    }

    #[test]
    fn test_concurrent_counting() {
        let stats = Arc::new(PopulationStatistics::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let stats = Arc::clone(&stats);
                thread::spawn(move || {
                    for j in 0..100 {
                        stats.record((i + j) % 4 != 0);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(stats.total(), 800);
        assert_eq!(stats.alive() + stats.dead(), 800);
        assert_eq!(stats.dead(), 200);
    }

    #[test]
    fn test_record_person_uses_finish_time() {
        let recorder = recorder(true, true);
        let t = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();

        let mut alive = Person::new(1, 1);
        alive.last_updated = t;
        let mut dying = Person::new(2, 1);
        dying.last_updated = t;
        dying.record_death(t + Duration::days(3), "Test");
        dying.record_state("Lifecycle", "Death", t);

        recorder.record_person(&alive, 0);
        recorder.record_person(&dying, 1);

        assert_eq!(recorder.statistics().alive(), 1);
        assert_eq!(recorder.statistics().dead(), 1);
        assert_eq!(recorder.retained_population().len(), 2);
        assert!(recorder.metrics().unwrap().get("Lifecycle", "Death").is_some());
    }

    #[test]
    fn test_retention_disabled() {
        let recorder = recorder(false, false);
        recorder.record_person(&Person::new(1, 1), 0);
        assert!(!recorder.retains_population());
        assert!(recorder.retained_population().is_empty());
        assert!(recorder.metrics().is_none());
        assert_eq!(recorder.statistics().total(), 1);
    }

    #[test]
    fn test_summary_display() {
        let summary = PopulationSummary {
            requested: 10,
            total: 12,
            alive: 9,
            dead: 3,
            failed_slots: 1,
            cancelled_slots: 0,
            duration_ms: 5,
            metrics_report: None,
        };
        let text = summary.to_string();
        assert!(text.starts_with("Records: total=12, alive=9, dead=3\n"));
        assert!(text.contains("failed=1"));
        assert_eq!(summary.completed_slots(), 9);
        assert!((summary.alive_percentage() - 75.0).abs() < 1e-9);
    }
}
