//! Acceptance criteria for generated persons

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::person::Person;
use crate::simulation::{Module, SimulationResult};
use crate::types::GenerationConfig;

/// Terminal state a keep module must reach for a person to be kept
pub const KEEP_STATE: &str = "Keep";

/// Outcome of one acceptance evaluation; each flag is a rejection reason
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CriteriaCheck {
    /// Dead while dead persons are tolerated as overflow
    pub rejected_dead_but_overflow: bool,
    /// Alive while only dead persons are wanted
    pub alive_but_dead_required: bool,
    /// Dead while only living persons are wanted
    pub dead_but_alive_required: bool,
    /// Linked to fewer providers than required
    pub insufficient_providers: bool,
    /// The keep module did not end in the keep state
    pub failed_keep_module: bool,
}

impl CriteriaCheck {
    /// No rejection reason applies
    pub fn meets_criteria(&self) -> bool {
        !(self.rejected_dead_but_overflow
            || self.alive_but_dead_required
            || self.dead_but_alive_required
            || self.insufficient_providers
            || self.failed_keep_module)
    }

    /// The only rejection reason is overflow, so the person is still recorded and exported
    pub fn export_anyway(&self) -> bool {
        self.rejected_dead_but_overflow
            && !self.alive_but_dead_required
            && !self.dead_but_alive_required
            && !self.insufficient_providers
            && !self.failed_keep_module
    }
}

/// Evaluates [`CriteriaCheck`]s for finished persons
#[derive(Debug, Clone)]
pub struct AcceptanceCriteria {
    only_alive: bool,
    only_dead: bool,
    overflow: bool,
    keep_module: Option<Arc<dyn Module>>,
}

impl AcceptanceCriteria {
    /// Criteria from the patient filters in `config`
    pub fn new(config: &GenerationConfig, keep_module: Option<Arc<dyn Module>>) -> Self {
        Self {
            only_alive: config.only_alive_patients,
            only_dead: config.only_dead_patients,
            overflow: config.overflow,
            keep_module,
        }
    }

    /// Evaluate `person` as of `finish_time`.
    ///
    /// The keep module is only run when the alive/dead filters are satisfied;
    /// it records its terminal state in the person's history.
    pub fn check(
        &self,
        person: &mut Person,
        finish_time: DateTime<Utc>,
        is_alive: bool,
        provider_minimum: usize,
    ) -> SimulationResult<CriteriaCheck> {
        let mut check = CriteriaCheck {
            rejected_dead_but_overflow: !is_alive && !self.only_dead && self.overflow,
            alive_but_dead_required: is_alive && self.only_dead,
            dead_but_alive_required: !is_alive && self.only_alive,
            insufficient_providers: person.provider_count() < provider_minimum,
            failed_keep_module: false,
        };

        if let Some(keep) = &self.keep_module {
            if !check.alive_but_dead_required && !check.dead_but_alive_required {
                keep.process(person, finish_time)?;
                check.failed_keep_module =
                    person.history.first().map_or(true, |terminal| terminal.state != KEEP_STATE);
            }
        }

        Ok(check)
    }
}
