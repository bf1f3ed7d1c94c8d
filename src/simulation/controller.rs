//! Rejection-sampling controller
//!
//! Produces exactly one accepted person per population slot. A slot keeps
//! its demographics and rotates only the person seed between attempts, so
//! retries explore different life histories for the same sampled identity.

use chrono::{DateTime, Utc};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::demographics::{birthdate_from_target_age, DemographicsSampler, FixedRecordGroup};
use crate::person::{keys, AttributeValue, Attributes, Person};
use crate::simulation::{
    AcceptanceCriteria, Exporter, PopulationRecorder, SimulationError, SimulationResult, TimeStepper,
};
use crate::types::GenerationConfig;

/// Attempts after which very old target ages are lowered
pub const OLD_AGE_RETRY_THRESHOLD: u64 = 10;

/// Target ages above this are considered rare enough to lower
pub const OLD_AGE_TARGET: i64 = 90;

/// Lowest age the old-age heuristic resamples into
pub const LOWERED_AGE_MIN: u32 = 85;

/// Generates, accepts, records and exports persons for individual slots
#[derive(Debug, Clone)]
pub struct SlotController {
    stepper: TimeStepper,
    sampler: DemographicsSampler,
    criteria: AcceptanceCriteria,
    record_groups: Option<Arc<Vec<FixedRecordGroup>>>,
    recorder: Arc<PopulationRecorder>,
    exporter: Arc<dyn Exporter>,
    population_seed: u64,
    max_attempts: Option<u64>,
    age_specified: bool,
    min_age: u32,
}

impl SlotController {
    /// Assemble a controller from its collaborators
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: &GenerationConfig,
        stepper: TimeStepper,
        sampler: DemographicsSampler,
        criteria: AcceptanceCriteria,
        record_groups: Option<Arc<Vec<FixedRecordGroup>>>,
        recorder: Arc<PopulationRecorder>,
        exporter: Arc<dyn Exporter>,
    ) -> Self {
        Self {
            stepper,
            sampler,
            criteria,
            record_groups,
            recorder,
            exporter,
            population_seed: config.seed,
            max_attempts: config.max_attempts(),
            age_specified: config.age_specified,
            min_age: config.min_age,
        }
    }

    /// The time-stepped loop persons are simulated with
    pub fn stepper(&self) -> &TimeStepper {
        &self.stepper
    }

    /// Same controller simulating persons up to `stop_time`
    pub fn with_stop_time(&self, stop_time: DateTime<Utc>) -> Self {
        Self { stepper: self.stepper.clone_with_stop(stop_time), ..self.clone() }
    }

    /// The demographics sampler
    pub fn sampler(&self) -> &DemographicsSampler {
        &self.sampler
    }

    /// Fixed-identity record groups, one per slot, when loaded
    pub fn record_groups(&self) -> Option<&[FixedRecordGroup]> {
        self.record_groups.as_deref().map(Vec::as_slice)
    }

    /// The recorder persons are recorded into
    pub fn recorder(&self) -> &Arc<PopulationRecorder> {
        &self.recorder
    }

    /// The exporter persons are handed to
    pub fn exporter(&self) -> &Arc<dyn Exporter> {
        &self.exporter
    }

    /// Record group bound to `slot`; `None` outside fixed-identity mode
    pub fn record_group(&self, slot: usize) -> SimulationResult<Option<&FixedRecordGroup>> {
        match &self.record_groups {
            Some(groups) => groups.get(slot).map(Some).ok_or_else(|| {
                SimulationError::configuration_error(format!(
                    "No fixed record group for slot {} ({} groups loaded)",
                    slot,
                    groups.len()
                ))
            }),
            None => Ok(None),
        }
    }

    /// Generate a person for `slot` from a random seed
    pub fn generate_random_person(&self, slot: usize) -> SimulationResult<Person> {
        let seed = uuid::Uuid::new_v4().as_u128() as u64;
        self.generate_person(slot, seed)
    }

    /// Generate the accepted person for `slot`, starting from `seed`
    #[instrument(skip(self))]
    pub fn generate_person(&self, slot: usize, seed: u64) -> SimulationResult<Person> {
        let mut slot_rng = ChaCha8Rng::seed_from_u64(seed);
        let group = self.record_group(slot)?;
        let mut demographics = match group {
            Some(group) => self.sampler.pick_fixed_demographics(group, &mut slot_rng)?,
            None => self.sampler.random_demographics(&mut slot_rng)?,
        };
        let provider_minimum = group.map_or(1, FixedRecordGroup::required_providers);

        let mut person_seed = seed;
        let mut attempts: u64 = 0;
        loop {
            attempts += 1;
            let mut person = self.stepper.create_person(person_seed, self.population_seed, &demographics)?;
            let finish_time = person.last_updated + self.stepper.timestep();
            let is_alive = person.alive(finish_time);
            let check = self.criteria.check(&mut person, finish_time, is_alive, provider_minimum)?;

            if !check.meets_criteria() && !check.export_anyway() {
                if let Some(max) = self.max_attempts {
                    if attempts >= max {
                        return Err(SimulationError::AttemptsExhausted { slot, attempts });
                    }
                }
                debug!("Slot {} attempt {} rejected: {:?}", slot, attempts, check);
                person_seed = slot_rng.gen();
                continue;
            }

            self.recorder.record_person(&person, slot);

            if !is_alive {
                person_seed = slot_rng.gen();
                if group.is_none() && self.should_lower_target_age(&demographics, attempts) {
                    self.lower_target_age(&mut demographics, &mut slot_rng);
                }
            }

            self.exporter.export(&person, finish_time, slot)?;

            if check.meets_criteria() {
                debug!("Slot {} accepted after {} attempts", slot, attempts);
                return Ok(person);
            }
        }
    }

    fn should_lower_target_age(&self, demographics: &Attributes, attempts: u64) -> bool {
        let target_age = demographics.get(keys::TARGET_AGE).and_then(AttributeValue::as_i64).unwrap_or(0);
        attempts > OLD_AGE_RETRY_THRESHOLD
            && target_age > OLD_AGE_TARGET
            && (!self.age_specified || self.min_age <= LOWERED_AGE_MIN)
    }

    fn lower_target_age(&self, demographics: &mut Attributes, rng: &mut ChaCha8Rng) {
        let target_age = LOWERED_AGE_MIN + rng.gen_range(0..5);
        let birthdate = birthdate_from_target_age(target_age, self.sampler.reference_time(), rng);
        debug!("Lowering target age to {}", target_age);
        demographics.insert(keys::TARGET_AGE.into(), target_age.into());
        demographics.insert(keys::BIRTHDATE.into(), birthdate.into());
    }

    /// Advance a previously generated person to the stop time, then record and export it
    pub fn update_record_export_person(&self, mut person: Person, slot: usize) -> SimulationResult<Person> {
        self.stepper.update_person(&mut person)?;
        self.recorder.record_person(&person, slot);
        let finish_time: DateTime<Utc> = person.last_updated + self.stepper.timestep();
        self.exporter.export(&person, finish_time, slot)?;
        Ok(person)
    }
}
