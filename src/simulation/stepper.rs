//! Time-stepped simulation loop
//!
//! Advances one person from its `last_updated` cursor to the global stop time
//! (or death) in fixed steps, running the lifecycle hooks, the person's active
//! modules and the record editors at each step.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::trace;

use crate::person::{keys, Attributes, Person};
use crate::simulation::{
    HealthRecordEditors, LifecycleHooks, ModuleFilter, ModuleRegistry, SimulationError,
    SimulationResult,
};

/// Runs persons through the enabled modules
#[derive(Debug, Clone)]
pub struct TimeStepper {
    registry: Arc<ModuleRegistry>,
    filter: ModuleFilter,
    hooks: Arc<dyn LifecycleHooks>,
    editors: Arc<HealthRecordEditors>,
    timestep: Duration,
    stop_time: DateTime<Utc>,
}

impl TimeStepper {
    /// Create a stepper that stops persons at `stop_time`
    pub fn new(
        registry: Arc<ModuleRegistry>,
        filter: ModuleFilter,
        hooks: Arc<dyn LifecycleHooks>,
        editors: Arc<HealthRecordEditors>,
        timestep: Duration,
        stop_time: DateTime<Utc>,
    ) -> Self {
        Self { registry, filter, hooks, editors, timestep, stop_time }
    }

    /// Step length
    pub fn timestep(&self) -> Duration {
        self.timestep
    }

    /// Global stop time
    pub fn stop_time(&self) -> DateTime<Utc> {
        self.stop_time
    }

    /// Same stepper with a different stop time
    pub fn clone_with_stop(&self, stop_time: DateTime<Utc>) -> Self {
        Self { stop_time, ..self.clone() }
    }

    /// Names of the modules attached to newly created persons
    pub fn enabled_modules(&self) -> Vec<String> {
        self.registry.enabled_names(&self.filter)
    }

    /// Non-core modules let through by the enable filter, or `None` when no filter is set
    pub fn filtered_modules(&self) -> Option<Vec<String>> {
        self.filter.is_restricted().then(|| self.registry.selected_names(&self.filter))
    }

    /// Build a person from `demographics` at its birthdate and simulate it to the stop time
    pub fn create_person(
        &self,
        seed: u64,
        population_seed: u64,
        demographics: &Attributes,
    ) -> SimulationResult<Person> {
        let mut person = Person::new(seed, population_seed);
        person.attributes.extend(demographics.iter().map(|(k, v)| (k.clone(), v.clone())));

        let birth = person.birthdate().ok_or_else(|| {
            SimulationError::demographics_error(format!("Person {} has no birthdate", person.id))
        })?;
        person.last_updated = birth;
        self.hooks.birth(&mut person, birth)?;
        person.active_modules = self.enabled_modules();

        self.update_person(&mut person)?;
        Ok(person)
    }

    /// Advance `person` from its time cursor until death or the stop time
    pub fn update_person(&self, person: &mut Person) -> SimulationResult<()> {
        let mut time = person.last_updated;

        while person.alive(time) && time < self.stop_time {
            self.hooks.assign_insurance(person, time + self.timestep)?;
            self.hooks.admit_encounters(person, time)?;

            let active = std::mem::take(&mut person.active_modules);
            let mut still_active = Vec::with_capacity(active.len());
            for name in active {
                let module = self.registry.resolve(&name)?;
                if module.process(person, time)? {
                    trace!("Module {} completed for {}", name, person.id);
                } else {
                    still_active.push(name);
                }
            }
            person.active_modules = still_active;

            self.hooks.end_encounters(person, time)?;
            person.last_updated = time;
            self.editors.execute_all(person, time, self.timestep)?;
            time = time + self.timestep;
        }

        if let Some(age) = person.birthdate().map(|_| person.age_in_years(person.last_updated)) {
            person.set_attribute(keys::AGE, age);
        }
        self.hooks.process_death(person, time)
    }
}
