//! Population snapshots
//!
//! Saves a finished population to a bincode file so a later run can resume
//! simulating it forward in time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::person::Person;
use crate::simulation::{SimulationError, SimulationResult};

const SNAPSHOT_VERSION: u32 = 1;

/// Borrowing form used when writing
#[derive(Serialize)]
struct SnapshotFileRef<'a> {
    version: u32,
    saved_at: DateTime<Utc>,
    population: &'a [Person],
}

/// Owned form used when reading
#[derive(Deserialize)]
struct SnapshotFile {
    version: u32,
    #[allow(dead_code)]
    saved_at: DateTime<Utc>,
    population: Vec<Person>,
}

/// Write `population` to `path`
pub fn save_population(population: &[Person], path: &Path) -> SimulationResult<()> {
    let file = SnapshotFileRef { version: SNAPSHOT_VERSION, saved_at: Utc::now(), population };
    let bytes = bincode::serialize(&file)?;
    fs::write(path, bytes).map_err(|e| {
        SimulationError::snapshot_error(format!("Failed to write {}: {}", path.display(), e))
    })?;
    info!("Saved {} persons to {}", population.len(), path.display());
    Ok(())
}

/// Read a population previously written by [`save_population`]
pub fn load_population(path: &Path) -> SimulationResult<Vec<Person>> {
    let bytes = fs::read(path).map_err(|e| {
        SimulationError::snapshot_error(format!("Failed to read {}: {}", path.display(), e))
    })?;
    let file: SnapshotFile = bincode::deserialize(&bytes)?;

    if file.version > SNAPSHOT_VERSION {
        return Err(SimulationError::snapshot_error(format!(
            "Snapshot version {} is newer than supported version {}",
            file.version, SNAPSHOT_VERSION
        )));
    }

    info!("Loaded {} persons from {}", file.population.len(), path.display());
    Ok(file.population)
}
