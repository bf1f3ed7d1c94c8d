//! Health record editors
//!
//! Editors post-process the encounters produced during one simulation step.
//! They run after every step, once the person's time cursor has been advanced.

use chrono::{DateTime, Duration, Utc};
use std::fmt;
use std::sync::Arc;

use crate::person::Person;
use crate::simulation::SimulationResult;

/// Post-processing applied to a person's record after each step
pub trait HealthRecordEditor: Send + Sync + fmt::Debug {
    /// Editor name, used in diagnostics
    fn name(&self) -> &str;

    /// Whether the editor applies to this person at this step
    fn should_run(&self, _person: &Person, _time: DateTime<Utc>) -> bool {
        true
    }

    /// Edit the record for the step `[time, time + timestep)`
    fn process(&self, person: &mut Person, time: DateTime<Utc>, timestep: Duration) -> SimulationResult<()>;
}

/// Ordered set of editors run after every step
#[derive(Debug, Clone, Default)]
pub struct HealthRecordEditors {
    editors: Vec<Arc<dyn HealthRecordEditor>>,
}

impl HealthRecordEditors {
    /// No editors
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an editor
    pub fn register(&mut self, editor: Arc<dyn HealthRecordEditor>) {
        self.editors.push(editor);
    }

    /// Run every applicable editor in registration order
    pub fn execute_all(&self, person: &mut Person, time: DateTime<Utc>, timestep: Duration) -> SimulationResult<()> {
        for editor in &self.editors {
            if editor.should_run(person, time) {
                editor.process(person, time, timestep)?;
            }
        }
        Ok(())
    }

    /// Number of registered editors
    pub fn len(&self) -> usize {
        self.editors.len()
    }

    /// Whether no editor is registered
    pub fn is_empty(&self) -> bool {
        self.editors.is_empty()
    }
}
