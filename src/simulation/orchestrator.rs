//! Population orchestrator
//!
//! This module contains the [`PopulationGenerator`], which binds a
//! [`GenerationConfig`] to its collaborators, fans the population slots out
//! over a fixed-size worker pool and reports the final counts.
//!
//! Per-slot seeds are drawn from the top-level RNG before any task is
//! submitted, so the person produced for a slot does not depend on how the
//! pool schedules the work.

use chrono::{DateTime, Duration as SimDuration, Utc};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

use crate::demographics::{
    load_fixed_record_groups, DemographicsSampler, FixedRecordGroup, Location,
};
use crate::person::{Attributes, Person};
use crate::simulation::{
    load_population, save_population, AcceptanceCriteria, ConsoleReporter, Exporter,
    HealthRecordEditor, HealthRecordEditors, JsonlExporter, KeepRules, LifecycleHooks, Module,
    ModuleFilter, ModuleRegistry, NoopExporter, PopulationRecorder, PopulationStatistics,
    PopulationSummary, ProviderDirectory, SimulationError, SimulationResult, SlotController,
    StandardHooks, TimeStepper,
};
use crate::types::{GenerationConfig, SlotFailurePolicy};

/// How often a waiting run logs that it is still waiting
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Number of providers in the default provider directory
pub const DEFAULT_PROVIDER_COUNT: usize = 25;

const INTERRUPT_CHECK_INTERVAL: Duration = Duration::from_millis(50);

/// Cloneable handle used to cancel a running generation
#[derive(Debug, Clone, Default)]
pub struct InterruptHandle(Arc<AtomicBool>);

impl InterruptHandle {
    /// New, not yet interrupted handle
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; slots that have not started are skipped and the
    /// run stops waiting for the ones in flight
    pub fn interrupt(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested
    pub fn is_interrupted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

enum SlotOutcome {
    Finished(usize),
    Failed(usize, SimulationError),
    Cancelled(usize),
}

#[derive(Debug, Default)]
struct SlotTally {
    failed: usize,
    cancelled: usize,
    abort: Option<SimulationError>,
}

/// Builder for [`PopulationGenerator`]
///
/// Every collaborator is optional; anything not provided is derived from the
/// configuration.
#[derive(Debug)]
pub struct PopulationGeneratorBuilder {
    config: GenerationConfig,
    registry: Option<ModuleRegistry>,
    hooks: Option<Arc<dyn LifecycleHooks>>,
    location: Option<Location>,
    exporter: Option<Arc<dyn Exporter>>,
    editors: HealthRecordEditors,
    keep_module: Option<Arc<dyn Module>>,
    reporter: Option<ConsoleReporter>,
    poll_interval: Duration,
    interrupt: InterruptHandle,
}

impl PopulationGeneratorBuilder {
    fn new(config: GenerationConfig) -> Self {
        Self {
            config,
            registry: None,
            hooks: None,
            location: None,
            exporter: None,
            editors: HealthRecordEditors::new(),
            keep_module: None,
            reporter: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            interrupt: InterruptHandle::new(),
        }
    }

    /// Module catalog; defaults to [`ModuleRegistry::standard`]
    pub fn registry(mut self, registry: ModuleRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Lifecycle hooks; defaults to [`StandardHooks`]
    pub fn hooks(mut self, hooks: Arc<dyn LifecycleHooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    /// Demographic tables; defaults to the configured file or the built-in tables
    pub fn location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Exporter; defaults to JSONL export when an export path is configured
    pub fn exporter(mut self, exporter: Arc<dyn Exporter>) -> Self {
        self.exporter = Some(exporter);
        self
    }

    /// Register a health record editor
    pub fn editor(mut self, editor: Arc<dyn HealthRecordEditor>) -> Self {
        self.editors.register(editor);
        self
    }

    /// Keep module; defaults to the configured rule file, if any
    pub fn keep_module(mut self, module: Arc<dyn Module>) -> Self {
        self.keep_module = Some(module);
        self
    }

    /// Console reporter; defaults to stdout at the configured detail level
    pub fn reporter(mut self, reporter: ConsoleReporter) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Interval between "still waiting" log lines
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Use an existing interrupt handle
    pub fn interrupt_handle(mut self, handle: InterruptHandle) -> Self {
        self.interrupt = handle;
        self
    }

    /// Validate the configuration and assemble the generator
    #[instrument(skip(self), fields(population = self.config.population, seed = self.config.seed))]
    pub fn build(self) -> SimulationResult<PopulationGenerator> {
        let mut config = self.config;
        config.normalize_patient_filters();

        let record_groups = if config.fixed_record_path.is_some() {
            Some(Arc::new(import_fixed_records(&mut config)?))
        } else {
            None
        };
        config.validate()?;

        let timestep = config.timestep();
        let stop_time = config.stop_time.unwrap_or_else(Utc::now);

        let location = match self.location {
            Some(location) => location,
            None => match &config.demographics_path {
                Some(path) => Location::from_file(path, &config.state, config.city.as_deref())?,
                None => Location::builtin(&config.state, config.city.as_deref()),
            },
        };

        let registry = Arc::new(self.registry.unwrap_or_else(|| ModuleRegistry::standard(timestep)));
        let filter = ModuleFilter::new(config.enabled_modules.clone());
        let hooks: Arc<dyn LifecycleHooks> = self.hooks.unwrap_or_else(|| {
            let providers = ProviderDirectory::generate(
                &config.location_name(),
                config.clinician_seed,
                DEFAULT_PROVIDER_COUNT,
            );
            Arc::new(StandardHooks::new(providers, config.append_numbers_to_names)) as Arc<dyn LifecycleHooks>
        });
        let stepper =
            TimeStepper::new(registry, filter, hooks, Arc::new(self.editors), timestep, stop_time);

        let keep_module = match self.keep_module {
            Some(module) => Some(module),
            None => match &config.keep_patients_module_path {
                Some(path) => Some(Arc::new(KeepRules::from_file(path)?) as Arc<dyn Module>),
                None => None,
            },
        };
        let criteria = AcceptanceCriteria::new(&config, keep_module);

        let reporter = self.reporter.unwrap_or_else(|| ConsoleReporter::new(config.log_detail));
        let recorder = Arc::new(PopulationRecorder::new(
            reporter,
            timestep,
            config.retains_population(),
            config.track_detailed_transition_metrics,
        ));

        let exporter: Arc<dyn Exporter> = match self.exporter {
            Some(exporter) => exporter,
            None => match &config.export_path {
                Some(path) => Arc::new(JsonlExporter::create(
                    path,
                    config.updated_population_snapshot_path.is_some(),
                )?),
                None => Arc::new(NoopExporter),
            },
        };

        let sampler = DemographicsSampler::new(location, &config);
        let controller =
            SlotController::new(&config, stepper, sampler, criteria, record_groups, recorder, exporter);

        debug!("Population generator assembled with stop time {}", stop_time);
        Ok(PopulationGenerator {
            config,
            controller: Arc::new(controller),
            poll_interval: self.poll_interval,
            interrupt: self.interrupt,
        })
    }
}

/// Load the configured fixed-identity record groups.
///
/// The population size becomes the number of groups, and numbers are no
/// longer appended to names since names come from the records.
pub fn import_fixed_records(config: &mut GenerationConfig) -> SimulationResult<Vec<FixedRecordGroup>> {
    let path = config.fixed_record_path.as_ref().ok_or_else(|| {
        SimulationError::configuration_error("No fixed record path configured")
    })?;
    let groups = load_fixed_record_groups(path)?;
    config.population = groups.len();
    config.append_numbers_to_names = false;
    Ok(groups)
}

/// Generates a population according to a [`GenerationConfig`]
#[derive(Debug)]
pub struct PopulationGenerator {
    config: GenerationConfig,
    controller: Arc<SlotController>,
    poll_interval: Duration,
    interrupt: InterruptHandle,
}

impl PopulationGenerator {
    /// Start building a generator for `config`
    pub fn builder(config: GenerationConfig) -> PopulationGeneratorBuilder {
        PopulationGeneratorBuilder::new(config)
    }

    /// Build a generator with every collaborator derived from `config`
    pub fn new(config: GenerationConfig) -> SimulationResult<Self> {
        Self::builder(config).build()
    }

    /// Effective configuration, after normalization and fixed-record import
    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Handle that cancels [`run`](Self::run) from another thread
    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.interrupt.clone()
    }

    /// Live population counters
    pub fn statistics(&self) -> &PopulationStatistics {
        self.controller.recorder().statistics()
    }

    /// Copy of every recorded person, when retention is enabled
    pub fn retained_population(&self) -> Vec<Person> {
        self.controller.recorder().retained_population()
    }

    /// Generate the accepted person for `slot` from `seed`
    pub fn generate_person(&self, slot: usize, seed: u64) -> SimulationResult<Person> {
        self.controller.generate_person(slot, seed)
    }

    /// Generate the accepted person for `slot` from a random seed
    pub fn generate_random_person(&self, slot: usize) -> SimulationResult<Person> {
        self.controller.generate_random_person(slot)
    }

    /// Create a person from `demographics` and simulate it to the stop time
    pub fn create_person(&self, seed: u64, demographics: &Attributes) -> SimulationResult<Person> {
        self.controller.stepper().create_person(seed, self.config.seed, demographics)
    }

    /// Advance `person` to the stop time
    pub fn update_person(&self, person: &mut Person) -> SimulationResult<()> {
        self.controller.stepper().update_person(person)
    }

    /// Advance `person` to the stop time, then record and export it
    pub fn update_record_export_person(&self, person: Person, slot: usize) -> SimulationResult<Person> {
        self.controller.update_record_export_person(person, slot)
    }

    /// Sample demographics from the configured location
    pub fn random_demographics<R: Rng + ?Sized>(&self, rng: &mut R) -> SimulationResult<Attributes> {
        self.controller.sampler().random_demographics(rng)
    }

    /// Demographics bound to the fixed-identity group of `slot`
    pub fn pick_fixed_demographics<R: Rng + ?Sized>(
        &self,
        slot: usize,
        rng: &mut R,
    ) -> SimulationResult<Attributes> {
        match self.controller.record_group(slot)? {
            Some(group) => self.controller.sampler().pick_fixed_demographics(group, rng),
            None => Err(SimulationError::configuration_error(
                "Fixed record demographics requested but no fixed record file is loaded",
            )),
        }
    }

    /// Feed `person` into the counters, retention list, metrics and console report
    pub fn record_person(&self, person: &Person, slot: usize) {
        self.controller.recorder().record_person(person, slot);
    }

    /// Generate the whole population, or advance a loaded snapshot, and
    /// return the final counts.
    ///
    /// The snapshot save and the exporter's completion step run however the
    /// run ends; an aborting slot failure is returned after both.
    #[instrument(skip(self), fields(population = self.config.population, threads = self.config.threads))]
    pub fn run(&self) -> SimulationResult<PopulationSummary> {
        let start = Instant::now();
        self.log_banner();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.threads)
            .thread_name(|index| format!("population-worker-{}", index))
            .build()
            .map_err(|e| SimulationError::WorkerPoolError(e.to_string()))?;
        let (sender, receiver) = mpsc::channel();

        let submitted = match &self.config.initial_population_snapshot_path {
            Some(path) => {
                let population = load_population(path).unwrap_or_else(|e| {
                    e.log("Unable to load population snapshot");
                    Vec::new()
                });
                self.submit_updates(&pool, &sender, population)
            }
            None => self.submit_generation(&pool, &sender),
        };
        drop(sender);

        let tally = self.await_slots(&receiver, submitted);
        // Dropping the pool does not wait for tasks still running.
        drop(pool);

        if let Some(path) = &self.config.updated_population_snapshot_path {
            let population = self.controller.recorder().retained_population();
            if let Err(e) = save_population(&population, path) {
                e.log("Unable to save population snapshot");
            }
        }

        let statistics = self.statistics();
        let summary = PopulationSummary {
            requested: submitted,
            total: statistics.total(),
            alive: statistics.alive(),
            dead: statistics.dead(),
            failed_slots: tally.failed,
            cancelled_slots: tally.cancelled,
            duration_ms: start.elapsed().as_millis() as u64,
            metrics_report: self
                .controller
                .recorder()
                .metrics()
                .map(|metrics| metrics.report(statistics.total())),
        };

        if let Err(e) = self.controller.exporter().post_completion(&summary) {
            e.log("Post-completion export failed");
        }

        info!(
            "{} in {} ms ({} failed, {} cancelled)",
            summary.compact_summary(),
            summary.duration_ms,
            summary.failed_slots,
            summary.cancelled_slots
        );
        match tally.abort {
            Some(error) => Err(error),
            None => Ok(summary),
        }
    }

    fn log_banner(&self) {
        let config = &self.config;
        info!("Running with options:");
        info!(
            "Population: {}, Seed: {}, Provider Seed: {}, Reference Time: {}",
            config.population, config.seed, config.clinician_seed, config.reference_time
        );
        info!("Location: {}", config.location_name());
        if config.age_specified {
            info!("Min Age: {}, Max Age: {}", config.min_age, config.max_age);
        }
        if let Some(gender) = config.gender {
            info!("Gender: {}", gender);
        }
        if let Some(modules) = self.controller.stepper().filtered_modules() {
            info!("Modules: {} loaded", modules.len());
            for module in &modules {
                info!("  {}", module);
            }
        }
    }

    fn submit_generation(&self, pool: &rayon::ThreadPool, sender: &Sender<SlotOutcome>) -> usize {
        let mut seeds = ChaCha8Rng::seed_from_u64(self.config.seed);
        for slot in 0..self.config.population {
            let seed: u64 = seeds.gen();
            let controller = Arc::clone(&self.controller);
            self.spawn_slot(pool, sender, slot, move || controller.generate_person(slot, seed).map(drop));
        }
        self.config.population
    }

    fn submit_updates(
        &self,
        pool: &rayon::ThreadPool,
        sender: &Sender<SlotOutcome>,
        population: Vec<Person>,
    ) -> usize {
        let Some(first) = population.first() else {
            warn!("Initial population is empty, nothing to update");
            return 0;
        };
        let stop_time = self.resume_stop_time(first.last_updated);
        info!("Advancing {} persons to {}", population.len(), stop_time);

        let controller = Arc::new(self.controller.with_stop_time(stop_time));
        let count = population.len();
        for (slot, person) in population.into_iter().enumerate() {
            let controller = Arc::clone(&controller);
            self.spawn_slot(pool, sender, slot, move || {
                controller.update_record_export_person(person, slot).map(drop)
            });
        }
        count
    }

    fn resume_stop_time(&self, last_updated: DateTime<Utc>) -> DateTime<Utc> {
        match self.config.days_to_travel_forward {
            Some(days) if days > 0 => last_updated + SimDuration::days(days),
            _ => self.controller.stepper().stop_time(),
        }
    }

    fn spawn_slot<F>(&self, pool: &rayon::ThreadPool, sender: &Sender<SlotOutcome>, slot: usize, task: F)
    where
        F: FnOnce() -> SimulationResult<()> + Send + 'static,
    {
        let sender = sender.clone();
        let interrupt = self.interrupt.clone();
        pool.spawn(move || {
            let outcome = if interrupt.is_interrupted() {
                SlotOutcome::Cancelled(slot)
            } else {
                match panic::catch_unwind(AssertUnwindSafe(task)) {
                    Ok(Ok(())) => SlotOutcome::Finished(slot),
                    Ok(Err(e)) => SlotOutcome::Failed(slot, e),
                    Err(payload) => SlotOutcome::Failed(
                        slot,
                        SimulationError::TaskPanicked { slot, message: panic_message(payload.as_ref()) },
                    ),
                }
            };
            // The receiver is gone once the run stopped waiting.
            let _ = sender.send(outcome);
        });
    }

    /// Collect slot outcomes until every slot reported or the run stopped.
    /// Under [`SlotFailurePolicy::Abort`] the first failure interrupts the run
    /// and is kept in the tally.
    fn await_slots(&self, receiver: &Receiver<SlotOutcome>, expected: usize) -> SlotTally {
        let mut tally = SlotTally::default();
        let mut received = 0;
        let mut last_report = Instant::now();

        while received < expected {
            if self.interrupt.is_interrupted() {
                warn!("Generator interrupted, abandoning {} unfinished slots", expected - received);
                tally.cancelled += expected - received;
                break;
            }

            match receiver.recv_timeout(INTERRUPT_CHECK_INTERVAL) {
                Ok(SlotOutcome::Finished(slot)) => {
                    received += 1;
                    debug!("Slot {} finished ({}/{})", slot, received, expected);
                }
                Ok(SlotOutcome::Cancelled(slot)) => {
                    received += 1;
                    tally.cancelled += 1;
                    debug!("Slot {} cancelled ({}/{})", slot, received, expected);
                }
                Ok(SlotOutcome::Failed(slot, error)) => {
                    received += 1;
                    tally.failed += 1;
                    error.log(&format!("Slot {} failed", slot));
                    if self.config.slot_failure_policy == SlotFailurePolicy::Abort {
                        self.interrupt.interrupt();
                        tally.cancelled += expected - received;
                        tally.abort = Some(error);
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    if last_report.elapsed() >= self.poll_interval {
                        info!("Waiting for threads to finish... {}/{} slots done", received, expected);
                        last_report = Instant::now();
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    warn!("Worker pool stopped with {} slots unaccounted for", expected - received);
                    tally.cancelled += expected - received;
                    break;
                }
            }
        }
        tally
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LogDetail;
    use chrono::TimeZone;
    use std::io;

    fn config() -> GenerationConfig {
        let reference = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        GenerationConfig {
            population: 3,
            seed: 7,
            threads: 2,
            reference_time: reference,
            stop_time: Some(reference),
            age_specified: true,
            min_age: 20,
            max_age: 30,
            log_detail: LogDetail::None,
            ..Default::default()
        }
    }

    fn quiet(config: GenerationConfig) -> PopulationGeneratorBuilder {
        PopulationGenerator::builder(config)
            .registry(ModuleRegistry::new())
            .reporter(ConsoleReporter::with_writer(LogDetail::None, Box::new(io::sink())))
    }

    #[test]
    fn test_interrupt_handle_is_shared() {
        let handle = InterruptHandle::new();
        let clone = handle.clone();
        assert!(!handle.is_interrupted());
        clone.interrupt();
        assert!(handle.is_interrupted());
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        let result = quiet(GenerationConfig { threads: 0, ..config() }).build();
        assert!(matches!(result, Err(SimulationError::ConfigurationError(_))));
    }

    #[test]
    fn test_missing_fixed_record_file_is_a_configuration_error() {
        let config = GenerationConfig {
            fixed_record_path: Some("/nonexistent/records.json".into()),
            ..config()
        };
        let error = quiet(config).build().unwrap_err();
        assert_eq!(error.category(), "Configuration");
    }

    #[test]
    fn test_run_fills_every_slot() {
        let generator = quiet(config()).build().unwrap();
        let summary = generator.run().unwrap();
        assert_eq!(summary.requested, 3);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.alive + summary.dead, 3);
        assert_eq!(summary.failed_slots, 0);
    }

    #[test]
    fn test_interrupted_run_cancels_slots() {
        let generator = quiet(config()).build().unwrap();
        generator.interrupt_handle().interrupt();
        let summary = generator.run().unwrap();
        assert_eq!(summary.cancelled_slots, 3);
        assert_eq!(summary.total, 0);
    }

    #[test]
    fn test_resume_stop_time() {
        let generator = quiet(GenerationConfig { days_to_travel_forward: Some(10), ..config() })
            .build()
            .unwrap();
        let last = Utc.with_ymd_and_hms(2019, 6, 1, 0, 0, 0).unwrap();
        assert_eq!(generator.resume_stop_time(last), last + SimDuration::days(10));

        let generator = quiet(config()).build().unwrap();
        assert_eq!(generator.resume_stop_time(last), generator.controller.stepper().stop_time());
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn Any + Send> = Box::new(3);
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }
}
