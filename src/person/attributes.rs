//! Typed person attributes
//!
//! Attributes are stored in an ordered map keyed by string so that snapshots
//! and console dumps list them in a stable order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::demographics::FixedRecordGroup;

/// Attribute map carried by every person
pub type Attributes = BTreeMap<String, AttributeValue>;

/// Well-known attribute keys
pub mod keys {
    /// Full display name
    pub const NAME: &str = "name";
    /// First name
    pub const FIRST_NAME: &str = "first_name";
    /// Last name
    pub const LAST_NAME: &str = "last_name";
    /// Gender code ("M" or "F")
    pub const GENDER: &str = "gender";
    /// Birth instant
    pub const BIRTHDATE: &str = "birthdate";
    /// Target age in whole years used to derive the birthdate
    pub const TARGET_AGE: &str = "target_age";
    /// Current age in whole years, refreshed by the lifecycle module
    pub const AGE: &str = "age";
    /// City of residence
    pub const CITY: &str = "city";
    /// State of residence
    pub const STATE: &str = "state";
    /// County of residence
    pub const COUNTY: &str = "county";
    /// City of birth
    pub const BIRTH_CITY: &str = "birth_city";
    /// Race
    pub const RACE: &str = "race";
    /// Ethnicity
    pub const ETHNICITY: &str = "ethnicity";
    /// First language
    pub const FIRST_LANGUAGE: &str = "first_language";
    /// Education category
    pub const EDUCATION: &str = "education";
    /// Continuous education score in `[0, 1]`
    pub const EDUCATION_LEVEL: &str = "education_level";
    /// Annual income
    pub const INCOME: &str = "income";
    /// Continuous income score in `[0, 1]`
    pub const INCOME_LEVEL: &str = "income_level";
    /// Continuous occupation score in `[0, 1]`
    pub const OCCUPATION_LEVEL: &str = "occupation_level";
    /// Combined socioeconomic score
    pub const SES_SCORE: &str = "socioeconomic_score";
    /// Socioeconomic category (Low, Middle, High)
    pub const SES_CATEGORY: &str = "socioeconomic_category";
    /// Veteran tag set by the veteran population override
    pub const VETERAN: &str = "veteran";
    /// Current insurance plan
    pub const INSURANCE: &str = "insurance";
    /// Time of the most recent wellness encounter
    pub const LAST_WELLNESS: &str = "last_wellness";
    /// Fixed-identity record group bound to this person
    pub const RECORD_GROUP: &str = "record_group";
    /// Link identifier of the bound record group
    pub const LINK_ID: &str = "link_id";
}

/// Value stored under an attribute key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    /// Free-form text
    Text(String),
    /// Whole number
    Integer(i64),
    /// Floating-point number
    Float(f64),
    /// Boolean flag
    Bool(bool),
    /// Instant in simulated time
    Time(DateTime<Utc>),
    /// Fixed-identity record group
    RecordGroup(Box<FixedRecordGroup>),
}

impl AttributeValue {
    /// Borrow the value as text
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Read the value as an integer; floats are truncated
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttributeValue::Integer(i) => Some(*i),
            AttributeValue::Float(f) => Some(*f as i64),
            _ => None,
        }
    }

    /// Read the value as a float; integers are widened
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Float(f) => Some(*f),
            AttributeValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Read the value as a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttributeValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Read the value as a timestamp
    pub fn as_time(&self) -> Option<DateTime<Utc>> {
        match self {
            AttributeValue::Time(t) => Some(*t),
            _ => None,
        }
    }

    /// Borrow the value as a fixed record group
    pub fn as_record_group(&self) -> Option<&FixedRecordGroup> {
        match self {
            AttributeValue::RecordGroup(group) => Some(group),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Text(s) => write!(f, "{}", s),
            AttributeValue::Integer(i) => write!(f, "{}", i),
            AttributeValue::Float(v) => write!(f, "{:.4}", v),
            AttributeValue::Bool(b) => write!(f, "{}", b),
            AttributeValue::Time(t) => write!(f, "{}", t.format("%Y-%m-%d %H:%M:%S")),
            AttributeValue::RecordGroup(group) => write!(
                f,
                "record group {} ({} records)",
                group
                    .link_id
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "unlinked".to_string()),
                group.records.len()
            ),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Text(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Integer(value)
    }
}

impl From<u32> for AttributeValue {
    fn from(value: u32) -> Self {
        AttributeValue::Integer(i64::from(value))
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Float(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

impl From<DateTime<Utc>> for AttributeValue {
    fn from(value: DateTime<Utc>) -> Self {
        AttributeValue::Time(value)
    }
}

impl From<FixedRecordGroup> for AttributeValue {
    fn from(value: FixedRecordGroup) -> Self {
        AttributeValue::RecordGroup(Box::new(value))
    }
}
