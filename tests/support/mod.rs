//! Shared fixtures for the integration tests
//!
//! Test modules with fully predictable behavior, a quiet generator builder,
//! and an exporter that keeps everything it receives.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use population_generator::person::{keys, Person};
use population_generator::simulation::{
    ConsoleReporter, Exporter, Module, ModuleRegistry, PersonSummary, PopulationGenerator,
    PopulationGeneratorBuilder, SimulationError, SimulationResult, KEEP_STATE, REJECT_STATE,
};
use population_generator::types::{GenerationConfig, LogDetail};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Reference and stop time shared by the tests
pub fn reference_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()
}

/// Configuration with fixed times, one worker, no console output, ages 20 to 40
pub fn base_config(population: usize) -> GenerationConfig {
    GenerationConfig {
        population,
        seed: 42,
        clinician_seed: 7,
        reference_time: reference_time(),
        stop_time: Some(reference_time()),
        threads: 1,
        age_specified: true,
        min_age: 20,
        max_age: 40,
        log_detail: LogDetail::None,
        retain_population: true,
        ..Default::default()
    }
}

/// Builder with an empty module registry and a discarded console report
pub fn quiet_builder(config: GenerationConfig) -> PopulationGeneratorBuilder {
    PopulationGenerator::builder(config)
        .registry(ModuleRegistry::new())
        .reporter(ConsoleReporter::with_writer(LogDetail::None, Box::new(io::sink())))
}

/// Builder whose registry holds only `module`
pub fn builder_with(config: GenerationConfig, module: Arc<dyn Module>) -> PopulationGeneratorBuilder {
    quiet_builder(config).registry(ModuleRegistry::new().with_module(module))
}

/// Kills every person on their first step
#[derive(Debug)]
pub struct AlwaysDie;

impl Module for AlwaysDie {
    fn name(&self) -> &str {
        "Always Die"
    }

    fn process(&self, person: &mut Person, time: DateTime<Utc>) -> SimulationResult<bool> {
        person.record_death(time, "Test");
        person.record_state(self.name(), "Death", time);
        Ok(true)
    }
}

/// Kills persons whose target age is above the threshold on their first step
#[derive(Debug)]
pub struct DieWhenTargetOver(pub i64);

impl Module for DieWhenTargetOver {
    fn name(&self) -> &str {
        "Die When Old"
    }

    fn process(&self, person: &mut Person, time: DateTime<Utc>) -> SimulationResult<bool> {
        if person.target_age().is_some_and(|age| age > self.0) {
            person.record_death(time, "Test");
        }
        Ok(true)
    }
}

/// Kills the first `limit` persons it sees
#[derive(Debug)]
pub struct KillFirst {
    limit: usize,
    seen: AtomicUsize,
}

impl KillFirst {
    pub fn new(limit: usize) -> Self {
        Self { limit, seen: AtomicUsize::new(0) }
    }
}

impl Module for KillFirst {
    fn name(&self) -> &str {
        "Kill First"
    }

    fn process(&self, person: &mut Person, time: DateTime<Utc>) -> SimulationResult<bool> {
        if self.seen.fetch_add(1, Ordering::SeqCst) < self.limit {
            person.record_death(time, "Test");
        }
        Ok(true)
    }
}

/// Fails on the first step of every person
#[derive(Debug)]
pub struct Failing;

impl Module for Failing {
    fn name(&self) -> &str {
        "Failing"
    }

    fn process(&self, _person: &mut Person, _time: DateTime<Utc>) -> SimulationResult<bool> {
        Err(SimulationError::module_error(self.name(), "always fails"))
    }
}

/// Lets the first slot through and fails every later one.
///
/// Slots keep their birthdate across retries, so the first birthdate seen
/// identifies the first slot.
#[derive(Debug, Default)]
pub struct FailingAfterFirst {
    first: Mutex<Option<DateTime<Utc>>>,
}

impl Module for FailingAfterFirst {
    fn name(&self) -> &str {
        "Failing After First"
    }

    fn process(&self, person: &mut Person, _time: DateTime<Utc>) -> SimulationResult<bool> {
        let birthdate = person.birthdate();
        let mut first = self.first.lock().unwrap();
        if first.is_none() {
            *first = birthdate;
        }
        if *first == birthdate {
            Ok(false)
        } else {
            Err(SimulationError::module_error(self.name(), "only the first slot succeeds"))
        }
    }
}

/// Panics on the first step of every person
#[derive(Debug)]
pub struct Panicking;

impl Module for Panicking {
    fn name(&self) -> &str {
        "Panicking"
    }

    fn process(&self, _person: &mut Person, _time: DateTime<Utc>) -> SimulationResult<bool> {
        panic!("module panicked");
    }
}

/// Keep module that counts its evaluations and keeps a person only once
/// `keep_after` evaluations have been made; `None` never keeps
#[derive(Debug, Default)]
pub struct CountingKeep {
    pub evaluations: AtomicUsize,
    pub keep_after: Option<usize>,
}

impl CountingKeep {
    pub fn never() -> Self {
        Self::default()
    }

    pub fn after(evaluations: usize) -> Self {
        Self { evaluations: AtomicUsize::new(0), keep_after: Some(evaluations) }
    }

    pub fn count(&self) -> usize {
        self.evaluations.load(Ordering::SeqCst)
    }
}

impl Module for CountingKeep {
    fn name(&self) -> &str {
        "Counting Keep"
    }

    fn process(&self, person: &mut Person, time: DateTime<Utc>) -> SimulationResult<bool> {
        let seen = self.evaluations.fetch_add(1, Ordering::SeqCst) + 1;
        let keep = self.keep_after.is_some_and(|after| seen >= after);
        person.record_state(self.name(), if keep { KEEP_STATE } else { REJECT_STATE }, time);
        Ok(true)
    }
}

/// Exporter that keeps a summary of everything it is given
#[derive(Debug, Default)]
pub struct CollectingExporter {
    pub exported: Mutex<Vec<PersonSummary>>,
}

impl CollectingExporter {
    pub fn summaries(&self) -> Vec<PersonSummary> {
        self.exported.lock().unwrap().clone()
    }
}

impl Exporter for CollectingExporter {
    fn export(&self, person: &Person, finish_time: DateTime<Utc>, slot: usize) -> SimulationResult<()> {
        self.exported.lock().unwrap().push(PersonSummary::from_person(person, finish_time, slot));
        Ok(())
    }
}

/// Comparable fingerprint of a person
pub fn fingerprint(person: &Person) -> (String, String, String, Option<DateTime<Utc>>, DateTime<Utc>, usize) {
    (
        person.id.to_string(),
        person.name().to_string(),
        person.text_attribute(keys::RACE).unwrap_or_default().to_string(),
        person.birthdate(),
        person.last_updated,
        person.record.encounter_count(),
    )
}
