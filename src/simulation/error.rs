//! Error types and handling
//!
//! This module contains error types and error handling for population generation.

use thiserror::Error;
use tracing::{error, warn};

use crate::demographics::FixedRecordError;
use crate::types::{ConfigError, ConfigValidationError};

/// Errors that can occur during population generation
#[derive(Debug, Error)]
pub enum SimulationError {
    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ConfigurationError(String),

    /// Fixed-identity records could not be loaded
    #[error("Fixed record import failed: {0}")]
    FixedRecordError(#[from] FixedRecordError),

    /// Demographic tables are missing or invalid
    #[error("Demographics error: {0}")]
    DemographicsError(String),

    /// A module failed while processing a person
    #[error("Module '{module}' failed: {message}")]
    ModuleError {
        /// Module name
        module: String,
        /// Failure description
        message: String,
    },

    /// A person references a module the registry does not know
    #[error("Unknown module: {0}")]
    ModuleNotFound(String),

    /// A slot could not produce an acceptable person within the attempt bound
    #[error("Slot {slot} exhausted {attempts} attempts without meeting the acceptance criteria")]
    AttemptsExhausted {
        /// Population slot index
        slot: usize,
        /// Number of attempts made
        attempts: u64,
    },

    /// A generation task panicked
    #[error("Slot {slot} panicked: {message}")]
    TaskPanicked {
        /// Population slot index
        slot: usize,
        /// Panic payload, when it was a string
        message: String,
    },

    /// The worker pool could not be created
    #[error("Worker pool error: {0}")]
    WorkerPoolError(String),

    /// Snapshot save or load failed
    #[error("Snapshot error: {0}")]
    SnapshotError(String),

    /// Export failed
    #[error("Export error: {0}")]
    ExportError(String),

    /// General generation failure
    #[error("Generation failed: {0}")]
    GenerationError(String),

    /// I/O error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl From<String> for SimulationError {
    fn from(s: String) -> Self {
        SimulationError::GenerationError(s)
    }
}

impl From<&str> for SimulationError {
    fn from(s: &str) -> Self {
        SimulationError::GenerationError(s.to_string())
    }
}

impl From<anyhow::Error> for SimulationError {
    fn from(error: anyhow::Error) -> Self {
        SimulationError::GenerationError(error.to_string())
    }
}

impl From<ConfigValidationError> for SimulationError {
    fn from(error: ConfigValidationError) -> Self {
        SimulationError::ConfigurationError(error.to_string())
    }
}

impl From<ConfigError> for SimulationError {
    fn from(error: ConfigError) -> Self {
        SimulationError::ConfigurationError(error.to_string())
    }
}

impl From<bincode::Error> for SimulationError {
    fn from(error: bincode::Error) -> Self {
        SimulationError::SnapshotError(error.to_string())
    }
}

impl SimulationError {
    /// Create a configuration error
    pub fn configuration_error(msg: impl Into<String>) -> Self {
        Self::ConfigurationError(msg.into())
    }

    /// Create a demographics error
    pub fn demographics_error(msg: impl Into<String>) -> Self {
        Self::DemographicsError(msg.into())
    }

    /// Create a module error
    pub fn module_error(module: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::ModuleError { module: module.into(), message: msg.into() }
    }

    /// Create a snapshot error
    pub fn snapshot_error(msg: impl Into<String>) -> Self {
        Self::SnapshotError(msg.into())
    }

    /// Create an export error
    pub fn export_error(msg: impl Into<String>) -> Self {
        Self::ExportError(msg.into())
    }

    /// Check if this is a recoverable error
    pub fn is_recoverable(&self) -> bool {
        match self {
            SimulationError::ConfigurationError(_) => false,
            SimulationError::FixedRecordError(_) => false,
            SimulationError::DemographicsError(_) => false,
            SimulationError::ModuleError { .. } => true,
            SimulationError::ModuleNotFound(_) => false,
            SimulationError::AttemptsExhausted { .. } => false,
            SimulationError::TaskPanicked { .. } => true,
            SimulationError::WorkerPoolError(_) => false,
            SimulationError::SnapshotError(_) => true,
            SimulationError::ExportError(_) => true,
            SimulationError::GenerationError(_) => true,
            SimulationError::IoError(_) => true,
            SimulationError::SerializationError(_) => true,
        }
    }

    /// Get the error category
    pub fn category(&self) -> &'static str {
        match self {
            SimulationError::ConfigurationError(_) => "Configuration",
            SimulationError::FixedRecordError(FixedRecordError::FileNotFound(_)) => "Configuration",
            SimulationError::FixedRecordError(_) => "Fixed Records",
            SimulationError::DemographicsError(_) => "Demographics",
            SimulationError::ModuleError { .. } | SimulationError::ModuleNotFound(_) => "Module",
            SimulationError::AttemptsExhausted { .. } => "Acceptance Criteria",
            SimulationError::TaskPanicked { .. } | SimulationError::WorkerPoolError(_) => "Worker",
            SimulationError::SnapshotError(_) => "Snapshot",
            SimulationError::ExportError(_) => "Export",
            SimulationError::GenerationError(_) => "Generation",
            SimulationError::IoError(_) => "IO",
            SimulationError::SerializationError(_) => "Serialization",
        }
    }

    /// Log the error with a severity matching its recoverability
    pub fn log(&self, context: &str) {
        if self.is_recoverable() {
            warn!("{} ({}): {}", context, self.category(), self);
        } else {
            error!("{} ({}): {}", context, self.category(), self);
        }
    }
}

/// Result type for simulation operations
pub type SimulationResult<T> = Result<T, SimulationError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::path::PathBuf;

    #[test]
    fn test_error_creation() {
        let config_error = SimulationError::configuration_error("Invalid config");
        assert!(matches!(config_error, SimulationError::ConfigurationError(_)));
        assert_eq!(config_error.to_string(), "Configuration validation failed: Invalid config");

        let module_error = SimulationError::module_error("Lifecycle", "bad state");
        assert_eq!(module_error.to_string(), "Module 'Lifecycle' failed: bad state");
    }

    #[test]
    fn test_attempts_exhausted_names_slot_and_attempts() {
        let error = SimulationError::AttemptsExhausted { slot: 3, attempts: 5 };
        let message = error.to_string();
        assert!(message.contains("Slot 3"));
        assert!(message.contains("5 attempts"));
        assert!(!error.is_recoverable());
    }

    #[test]
    fn test_error_from_string() {
        let error: SimulationError = "Test error".to_string().into();
        assert!(matches!(error, SimulationError::GenerationError(_)));
        assert_eq!(error.to_string(), "Generation failed: Test error");
    }

    #[test]
    fn test_error_from_io_error() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let sim_error: SimulationError = io_error.into();
        assert!(matches!(sim_error, SimulationError::IoError(_)));
    }

    #[test]
    fn test_fixed_record_file_not_found_is_configuration() {
        let error: SimulationError =
            FixedRecordError::FileNotFound(PathBuf::from("records.json")).into();
        assert_eq!(error.category(), "Configuration");
        assert!(!error.is_recoverable());

        let parse = serde_json::from_str::<Vec<u8>>("nope").unwrap_err();
        let error: SimulationError = FixedRecordError::Parse(parse).into();
        assert_eq!(error.category(), "Fixed Records");
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(SimulationError::snapshot_error("x").category(), "Snapshot");
        assert_eq!(SimulationError::ModuleNotFound("x".into()).category(), "Module");
        assert!(SimulationError::export_error("x").is_recoverable());
    }
}
