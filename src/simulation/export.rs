//! Person export
//!
//! Export is the last thing that happens to a person. The bundled
//! [`JsonlExporter`] writes one JSON summary line per person, either
//! immediately or, when deferred, all at once after the run completes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use tracing::info;

use crate::person::{keys, Person};
use crate::simulation::{PopulationSummary, SimulationError, SimulationResult};
use crate::types::PersonId;

/// Receives every person that is recorded
pub trait Exporter: Send + Sync + fmt::Debug {
    /// Export `person` for population slot `slot`, as of `finish_time`
    fn export(&self, person: &Person, finish_time: DateTime<Utc>, slot: usize) -> SimulationResult<()>;

    /// Called once after every slot has finished
    fn post_completion(&self, _summary: &PopulationSummary) -> SimulationResult<()> {
        Ok(())
    }
}

/// Exporter that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopExporter;

impl Exporter for NoopExporter {
    fn export(&self, _person: &Person, _finish_time: DateTime<Utc>, _slot: usize) -> SimulationResult<()> {
        Ok(())
    }
}

/// Flat summary of an exported person
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonSummary {
    /// Population slot
    pub slot: usize,
    /// Person identifier
    pub id: PersonId,
    /// Seed the person was built from
    pub seed: u64,
    /// Display name
    pub name: String,
    /// Gender code
    pub gender: String,
    /// Age in whole years at the finish time
    pub age: u32,
    /// City of residence
    pub city: String,
    /// State of residence
    pub state: String,
    /// Birth instant
    pub birthdate: Option<DateTime<Utc>>,
    /// Whether the person is alive at the finish time
    pub alive: bool,
    /// Instant of death
    pub death_date: Option<DateTime<Utc>>,
    /// Number of encounters in the record
    pub encounters: usize,
    /// Number of distinct providers
    pub providers: usize,
    /// Link identifier of the bound fixed-identity group
    pub link_id: Option<i64>,
}

impl PersonSummary {
    /// Summarize `person` as of `finish_time`
    pub fn from_person(person: &Person, finish_time: DateTime<Utc>, slot: usize) -> Self {
        Self {
            slot,
            id: person.id,
            seed: person.seed,
            name: person.name().to_string(),
            gender: person.gender().to_string(),
            age: person.age_in_years(finish_time),
            city: person.city().to_string(),
            state: person.state().to_string(),
            birthdate: person.birthdate(),
            alive: person.alive(finish_time),
            death_date: person.death().map(|d| d.time),
            encounters: person.record.encounter_count(),
            providers: person.provider_count(),
            link_id: person.attribute(keys::LINK_ID).and_then(|v| v.as_i64()),
        }
    }
}

/// Writes person summaries as JSON lines
#[derive(Debug)]
pub struct JsonlExporter {
    writer: Mutex<BufWriter<File>>,
    deferred: Option<Mutex<Vec<PersonSummary>>>,
}

impl JsonlExporter {
    /// Create (or truncate) `path`; with `defer` set, lines are written in
    /// slot order after the run completes
    pub fn create<P: AsRef<Path>>(path: P, defer: bool) -> SimulationResult<Self> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| {
            SimulationError::export_error(format!("Failed to create {}: {}", path.display(), e))
        })?;
        info!("Exporting person summaries to {}", path.display());
        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
            deferred: defer.then(|| Mutex::new(Vec::new())),
        })
    }

    fn write_line(&self, summary: &PersonSummary) -> SimulationResult<()> {
        let line = serde_json::to_string(summary)?;
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(writer, "{}", line)?;
        Ok(())
    }
}

impl Exporter for JsonlExporter {
    fn export(&self, person: &Person, finish_time: DateTime<Utc>, slot: usize) -> SimulationResult<()> {
        let summary = PersonSummary::from_person(person, finish_time, slot);
        match &self.deferred {
            Some(deferred) => {
                deferred.lock().unwrap_or_else(PoisonError::into_inner).push(summary);
                Ok(())
            }
            None => self.write_line(&summary),
        }
    }

    fn post_completion(&self, _summary: &PopulationSummary) -> SimulationResult<()> {
        if let Some(deferred) = &self.deferred {
            let mut pending =
                std::mem::take(&mut *deferred.lock().unwrap_or_else(PoisonError::into_inner));
            pending.sort_by_key(|s| s.slot);
            for summary in &pending {
                self.write_line(summary)?;
            }
        }
        self.writer.lock().unwrap_or_else(PoisonError::into_inner).flush()?;
        Ok(())
    }
}
