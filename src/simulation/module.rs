//! Simulation modules
//!
//! A module advances one aspect of a person's life by one timestep each time
//! it is processed and reports `true` once it has nothing left to do. Persons
//! store the names of their active modules; the registry resolves names to
//! shared module instances once per step.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::person::{keys, Person};
use crate::simulation::{SimulationError, SimulationResult};

/// A pluggable unit of per-person simulation
///
/// One instance is shared by every person and every worker thread, so a
/// module keeps no per-person state of its own. Whatever it needs to carry
/// between steps belongs on the [`Person`], in attributes or history.
pub trait Module: Send + Sync + fmt::Debug {
    /// Unique module name
    fn name(&self) -> &str;

    /// Process one step for `person` at `time`; returns `true` when the module is finished
    fn process(&self, person: &mut Person, time: DateTime<Utc>) -> SimulationResult<bool>;
}

/// Case-insensitive wildcard filter over module names (`*` and `?`)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleFilter {
    patterns: Option<Vec<String>>,
}

impl ModuleFilter {
    /// Filter that accepts every module
    pub fn all() -> Self {
        Self { patterns: None }
    }

    /// Filter accepting modules matching any of `patterns`; `None` accepts everything
    pub fn new(patterns: Option<Vec<String>>) -> Self {
        Self { patterns: patterns.map(|p| p.into_iter().map(|s| s.to_lowercase()).collect()) }
    }

    /// Whether the filter restricts anything
    pub fn is_restricted(&self) -> bool {
        self.patterns.is_some()
    }

    /// Whether `name` passes the filter
    pub fn matches(&self, name: &str) -> bool {
        match &self.patterns {
            None => true,
            Some(patterns) => {
                let name = name.to_lowercase();
                patterns.iter().any(|pattern| wildcard_match(pattern, &name))
            }
        }
    }
}

/// Glob-style match supporting `*` (any run) and `?` (any single character)
pub fn wildcard_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();
    let (mut p, mut t) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == text[t]) {
            p += 1;
            t += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            star = Some((p, t));
            p += 1;
        } else if let Some((star_p, star_t)) = star {
            p = star_p + 1;
            t = star_t + 1;
            star = Some((star_p, star_t + 1));
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|c| *c == '*')
}

/// Catalog of modules available to a run
#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
    core: Vec<Arc<dyn Module>>,
    modules: Vec<Arc<dyn Module>>,
}

impl ModuleRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the core lifecycle module
    pub fn standard(timestep: Duration) -> Self {
        let mut registry = Self::new();
        registry.register_core(Arc::new(LifecycleModule::new(timestep)));
        registry
    }

    /// Register a module that is always enabled
    pub fn register_core(&mut self, module: Arc<dyn Module>) {
        self.core.push(module);
    }

    /// Register a module subject to the enable filter
    pub fn register(&mut self, module: Arc<dyn Module>) {
        self.modules.push(module);
    }

    /// Builder-style [`register`](Self::register)
    pub fn with_module(mut self, module: Arc<dyn Module>) -> Self {
        self.register(module);
        self
    }

    /// Look a module up by name
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Module>> {
        self.core.iter().chain(self.modules.iter()).find(|m| m.name() == name)
    }

    /// Resolve a module by name, failing if it is unknown
    pub fn resolve(&self, name: &str) -> SimulationResult<&Arc<dyn Module>> {
        self.get(name).ok_or_else(|| SimulationError::ModuleNotFound(name.to_string()))
    }

    /// Names of the modules enabled under `filter`: core modules first, in registration order
    pub fn enabled_names(&self, filter: &ModuleFilter) -> Vec<String> {
        let mut names: Vec<String> = self.core.iter().map(|m| m.name().to_string()).collect();
        names.extend(self.selected_names(filter));
        names
    }

    /// Names of the non-core modules that pass `filter`
    pub fn selected_names(&self, filter: &ModuleFilter) -> Vec<String> {
        self.modules.iter().filter(|m| filter.matches(m.name())).map(|m| m.name().to_string()).collect()
    }

    /// Total number of registered modules
    pub fn len(&self) -> usize {
        self.core.len() + self.modules.len()
    }

    /// Whether no module is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Core module that ages a person and applies natural mortality.
///
/// The yearly death probability follows a Gompertz curve and is scaled to
/// the timestep.
#[derive(Debug, Clone)]
pub struct LifecycleModule {
    timestep: Duration,
    baseline_hazard: f64,
    hazard_growth: f64,
}

/// Name under which [`LifecycleModule`] is registered
pub const LIFECYCLE_MODULE: &str = "Lifecycle";

impl LifecycleModule {
    /// Lifecycle module for the given step length
    pub fn new(timestep: Duration) -> Self {
        Self { timestep, baseline_hazard: 3.0e-5, hazard_growth: 0.095 }
    }

    /// Probability of dying within one year at `age`
    pub fn yearly_mortality(&self, age: u32) -> f64 {
        (self.baseline_hazard * (self.hazard_growth * f64::from(age)).exp()).min(1.0)
    }

    /// Probability of dying within one timestep at `age`
    pub fn step_mortality(&self, age: u32) -> f64 {
        let years = self.timestep.num_seconds() as f64 / (365.0 * 86_400.0);
        1.0 - (1.0 - self.yearly_mortality(age)).powf(years)
    }
}

impl Module for LifecycleModule {
    fn name(&self) -> &str {
        LIFECYCLE_MODULE
    }

    fn process(&self, person: &mut Person, time: DateTime<Utc>) -> SimulationResult<bool> {
        if !person.alive(time) {
            return Ok(true);
        }
        let age = person.age_in_years(time);
        person.set_attribute(keys::AGE, age);

        let roll: f64 = person.rng().gen();
        if roll < self.step_mortality(age) {
            debug!("{} died of natural causes at age {}", person.id, age);
            person.record_death(time, "Natural causes");
            person.record_state(LIFECYCLE_MODULE, "Death", time);
            return Ok(true);
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[derive(Debug)]
    struct Named(&'static str);

    impl Module for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn process(&self, _person: &mut Person, _time: DateTime<Utc>) -> SimulationResult<bool> {
            Ok(true)
        }
    }

    #[test]
    fn test_wildcard_match() {
        assert!(wildcard_match("*", "anything"));
        assert!(wildcard_match("diab*", "diabetes"));
        assert!(wildcard_match("*tes", "diabetes"));
        assert!(wildcard_match("d?abetes", "diabetes"));
        assert!(wildcard_match("*a*e*", "diabetes"));
        assert!(!wildcard_match("diab", "diabetes"));
        assert!(!wildcard_match("?", ""));
        assert!(wildcard_match("", ""));
    }

    #[test]
    fn test_filter_is_case_insensitive() {
        let filter = ModuleFilter::new(Some(vec!["Diab*".into(), "asthma".into()]));
        assert!(filter.matches("diabetes"));
        assert!(filter.matches("ASTHMA"));
        assert!(!filter.matches("appendicitis"));
        assert!(ModuleFilter::all().matches("appendicitis"));
        assert!(filter.is_restricted());
        assert!(!ModuleFilter::all().is_restricted());
    }

    #[test]
    fn test_core_modules_bypass_filter() {
        let registry = ModuleRegistry::standard(Duration::days(7))
            .with_module(Arc::new(Named("diabetes")))
            .with_module(Arc::new(Named("asthma")));
        let filter = ModuleFilter::new(Some(vec!["asth*".into()]));

        assert_eq!(registry.enabled_names(&filter), vec!["Lifecycle", "asthma"]);
        assert_eq!(registry.selected_names(&filter), vec!["asthma"]);
        assert_eq!(registry.enabled_names(&ModuleFilter::all()).len(), 3);
        assert!(registry.resolve("diabetes").is_ok());
        assert!(matches!(registry.resolve("gout"), Err(SimulationError::ModuleNotFound(_))));
    }

    #[test]
    fn test_mortality_increases_with_age() {
        let lifecycle = LifecycleModule::new(Duration::days(7));
        assert!(lifecycle.yearly_mortality(30) < 0.01);
        assert!(lifecycle.yearly_mortality(90) > lifecycle.yearly_mortality(60));
        assert!(lifecycle.yearly_mortality(200) <= 1.0);
        assert!(lifecycle.step_mortality(90) < lifecycle.yearly_mortality(90));
    }

    #[test]
    fn test_lifecycle_updates_age() {
        let lifecycle = LifecycleModule::new(Duration::days(7));
        let mut person = Person::new(1, 1);
        person.set_attribute(keys::BIRTHDATE, Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap());
        let time = Utc.with_ymd_and_hms(2010, 6, 1, 0, 0, 0).unwrap();
        lifecycle.process(&mut person, time).unwrap();
        assert_eq!(person.attribute(keys::AGE).and_then(|a| a.as_i64()), Some(10));
    }
}
