//! Fixed-identity record groups
//!
//! A record group describes one real identity as seen across several source
//! records. When a fixed-record file is configured, population slot `i` is
//! bound to group `i` and takes its birthdate, location, gender and provider
//! linkage requirement from the group instead of sampling them.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::types::LinkId;

/// One source record for a fixed identity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FixedRecord {
    /// First name
    #[serde(default, alias = "firstName")]
    pub first_name: String,
    /// Last name
    #[serde(default, alias = "lastName")]
    pub last_name: String,
    /// Gender as written in the source; may be blank or "None"
    #[serde(default)]
    pub gender: String,
    /// Birth year as written in the source
    #[serde(default, alias = "birthYear")]
    pub birth_year: Option<String>,
    /// Birth month as written in the source
    #[serde(default, alias = "birthMonth")]
    pub birth_month: Option<String>,
    /// Birth day of month as written in the source
    #[serde(default, alias = "birthDayOfMonth")]
    pub birth_day_of_month: Option<String>,
    /// Street address
    #[serde(default, alias = "addressLineOne")]
    pub address: String,
    /// City
    #[serde(default)]
    pub city: String,
    /// State
    #[serde(default)]
    pub state: String,
    /// Postal code
    #[serde(default)]
    pub zipcode: String,
}

impl FixedRecord {
    /// Birthdate at midnight UTC, if the source fields form a real date
    pub fn birthdate(&self) -> Option<DateTime<Utc>> {
        let year = self.birth_year.as_deref()?.trim().parse::<i32>().ok()?;
        let month = self.birth_month.as_deref()?.trim().parse::<u32>().ok()?;
        let day = self.birth_day_of_month.as_deref()?.trim().parse::<u32>().ok()?;
        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        Some(date.and_hms_opt(0, 0, 0)?.and_utc())
    }

    /// Gender to use for the person, defaulting to "F" when blank or "None"
    pub fn effective_gender(&self) -> &str {
        let gender = self.gender.trim();
        if gender.is_empty() || gender.eq_ignore_ascii_case("none") {
            "F"
        } else {
            gender
        }
    }

    /// "First Last", skipping whichever part is missing
    pub fn full_name(&self) -> String {
        [self.first_name.trim(), self.last_name.trim()]
            .iter()
            .filter(|part| !part.is_empty())
            .cloned()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Records describing a single identity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FixedRecordGroup {
    /// Source records, primary record first
    pub records: Vec<FixedRecord>,
    /// Number of independent providers this identity must be linked to
    #[serde(default)]
    pub count: Option<usize>,
    /// Link identifier assigned at load time
    #[serde(default)]
    pub link_id: Option<LinkId>,
}

impl FixedRecordGroup {
    /// Primary (first) record
    pub fn primary(&self) -> Option<&FixedRecord> {
        self.records.first()
    }

    /// Minimum provider count a person bound to this group must reach
    pub fn required_providers(&self) -> usize {
        self.count.unwrap_or(self.records.len())
    }

    /// State of the primary record
    pub fn state(&self) -> Option<&str> {
        self.primary().map(|r| r.state.trim()).filter(|s| !s.is_empty())
    }

    /// First non-empty city across the records
    pub fn safe_city(&self) -> Option<&str> {
        self.records.iter().map(|r| r.city.trim()).find(|c| !c.is_empty())
    }

    /// First birthdate that parses across the records
    pub fn valid_birthdate(&self) -> Option<DateTime<Utc>> {
        self.records.iter().find_map(FixedRecord::birthdate)
    }
}

/// Errors raised while loading fixed-identity records
#[derive(Debug, thiserror::Error)]
pub enum FixedRecordError {
    /// The configured file does not exist
    #[error("Fixed record file not found: {0}")]
    FileNotFound(PathBuf),

    /// The file exists but could not be read
    #[error("Failed to read fixed record file: {0}")]
    Io(#[from] io::Error),

    /// The file is not a valid list of record groups
    #[error("Invalid fixed record file: {0}")]
    Parse(#[from] serde_json::Error),

    /// A group has no records
    #[error("Fixed record group {0} has no records")]
    EmptyGroup(usize),
}

/// Load record groups from a JSON file and assign sequential link identifiers
pub fn load_fixed_record_groups<P: AsRef<Path>>(
    path: P,
) -> Result<Vec<FixedRecordGroup>, FixedRecordError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => FixedRecordError::FileNotFound(path.to_path_buf()),
        _ => FixedRecordError::Io(e),
    })?;

    let mut groups: Vec<FixedRecordGroup> = serde_json::from_str(&content)?;
    for (index, group) in groups.iter_mut().enumerate() {
        if group.records.is_empty() {
            return Err(FixedRecordError::EmptyGroup(index));
        }
        group.link_id = Some(LinkId::for_index(index));
    }

    info!("Loaded {} fixed record groups from {}", groups.len(), path.display());
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn record(gender: &str, year: &str, city: &str) -> FixedRecord {
        FixedRecord {
            first_name: "Jane".into(),
            last_name: "Doe".into(),
            gender: gender.into(),
            birth_year: Some(year.into()),
            birth_month: Some("4".into()),
            birth_day_of_month: Some("12".into()),
            city: city.into(),
            state: "Massachusetts".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_record_birthdate_and_gender() {
        let r = record("M", "1970", "Boston");
        assert_eq!(r.birthdate(), Some(Utc.with_ymd_and_hms(1970, 4, 12, 0, 0, 0).unwrap()));
        assert_eq!(r.effective_gender(), "M");
        assert_eq!(r.full_name(), "Jane Doe");

        assert_eq!(record("", "1970", "").effective_gender(), "F");
        assert_eq!(record("NONE", "1970", "").effective_gender(), "F");
        assert_eq!(record("M", "19x0", "").birthdate(), None);
    }

    #[test]
    fn test_group_derived_values() {
        let group = FixedRecordGroup {
            records: vec![record("F", "bad", ""), record("F", "1981", "Worcester")],
            count: None,
            link_id: None,
        };
        assert_eq!(group.safe_city(), Some("Worcester"));
        assert_eq!(group.state(), Some("Massachusetts"));
        assert_eq!(group.valid_birthdate().map(|b| b.year()), Some(1981));
        assert_eq!(group.required_providers(), 2);
    }

    #[test]
    fn test_load_assigns_link_ids() {
        let json = r#"[
            {"records": [{"firstName": "A", "lastName": "B", "gender": "M",
                          "birthYear": "1950", "birthMonth": "1", "birthDayOfMonth": "2",
                          "city": "Boston", "state": "Massachusetts"}], "count": 3},
            {"records": [{"first_name": "C", "gender": "F", "birth_year": "1960",
                          "birth_month": "5", "birth_day_of_month": "6",
                          "city": "Salem", "state": "Massachusetts"}]}
        ]"#;
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let groups = load_fixed_record_groups(file.path()).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].link_id, Some(LinkId(100_000)));
        assert_eq!(groups[1].link_id, Some(LinkId(100_001)));
        assert_eq!(groups[0].required_providers(), 3);
        assert_eq!(groups[0].records[0].first_name, "A");
    }

    #[test]
    fn test_load_errors() {
        let missing = load_fixed_record_groups("/nonexistent/fixed.json");
        assert!(matches!(missing, Err(FixedRecordError::FileNotFound(_))));

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"[{\"records\": []}]").unwrap();
        assert!(matches!(
            load_fixed_record_groups(file.path()),
            Err(FixedRecordError::EmptyGroup(0))
        ));

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"not json").unwrap();
        assert!(matches!(load_fixed_record_groups(file.path()), Err(FixedRecordError::Parse(_))));
    }
}
