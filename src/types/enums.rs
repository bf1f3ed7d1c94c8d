//! Enumeration types for the population generator
//!
//! This module contains the enumerations used throughout the generator:
//! administrative gender, console report detail, per-slot failure policy and
//! the age range accepted on the command line.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Administrative gender, normalized to a two-valued code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    /// Male ("M")
    Male,
    /// Female ("F")
    Female,
}

impl Gender {
    /// Single-letter code stored in person attributes
    pub fn code(&self) -> &'static str {
        match self {
            Gender::Male => "M",
            Gender::Female => "F",
        }
    }

    /// Normalize a free-form value, treating anything that is not male as female
    pub fn normalize(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "m" | "male" => Gender::Male,
            _ => Gender::Female,
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "m" | "male" => Ok(Gender::Male),
            "f" | "female" => Ok(Gender::Female),
            _ => Err(format!("Unknown gender: {} (expected M or F)", s)),
        }
    }
}

/// Level of detail for the per-person console report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogDetail {
    /// No per-person output
    None,
    /// One line per person
    #[default]
    Simple,
    /// One line per person followed by attributes, symptoms, record summary and vitals
    Detailed,
}

impl fmt::Display for LogDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogDetail::None => write!(f, "none"),
            LogDetail::Simple => write!(f, "simple"),
            LogDetail::Detailed => write!(f, "detailed"),
        }
    }
}

impl FromStr for LogDetail {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(LogDetail::None),
            "simple" => Ok(LogDetail::Simple),
            "detailed" => Ok(LogDetail::Detailed),
            _ => Err(format!("Unknown log detail: {}", s)),
        }
    }
}

/// What the orchestrator does when a population slot fails with an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SlotFailurePolicy {
    /// Log the failure, count it, and keep generating the remaining slots
    #[default]
    Skip,
    /// Cancel every slot that has not started yet and fail the run
    Abort,
}

impl fmt::Display for SlotFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotFailurePolicy::Skip => write!(f, "skip"),
            SlotFailurePolicy::Abort => write!(f, "abort"),
        }
    }
}

impl FromStr for SlotFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "skip" => Ok(SlotFailurePolicy::Skip),
            "abort" => Ok(SlotFailurePolicy::Abort),
            _ => Err(format!("Unknown slot failure policy: {}", s)),
        }
    }
}

/// Inclusive age range given as `MIN-MAX` on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeRange {
    /// Minimum age in years
    pub min: u32,
    /// Maximum age in years
    pub max: u32,
}

impl fmt::Display for AgeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

impl FromStr for AgeRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (min, max) = s
            .split_once('-')
            .ok_or_else(|| format!("Age range must look like MIN-MAX, got {}", s))?;
        let min = min.trim().parse::<u32>().map_err(|e| format!("Invalid minimum age: {}", e))?;
        let max = max.trim().parse::<u32>().map_err(|e| format!("Invalid maximum age: {}", e))?;
        Ok(AgeRange { min, max })
    }
}
