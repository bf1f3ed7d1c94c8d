//! Location demographics tables
//!
//! A [`Location`] is a set of cities within one state, each carrying weighted
//! tables for race, ethnicity, language, gender, education, income and age,
//! plus the state-level socioeconomic scoring parameters. Tables come either
//! from a JSON file or from the built-in default used when no file is given.

use rand::distributions::WeightedIndex;
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::simulation::{SimulationError, SimulationResult};

/// Category name to relative weight
pub type WeightTable = BTreeMap<String, f64>;

/// Weighted inclusive integer range, used for age and income tables
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeWeight {
    /// Lower bound (inclusive)
    pub min: u32,
    /// Upper bound (inclusive)
    pub max: u32,
    /// Relative weight of the range
    pub weight: f64,
}

impl RangeWeight {
    /// Create a weighted range
    pub fn new(min: u32, max: u32, weight: f64) -> Self {
        Self { min, max, weight }
    }
}

/// Demographic tables for a single city
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityDemographics {
    /// City name
    pub city: String,
    /// State name
    pub state: String,
    /// County name
    #[serde(default)]
    pub county: String,
    /// Population, used to weight city selection
    pub population: u64,
    /// Race weights
    pub race: WeightTable,
    /// Ethnicity weights keyed by race
    pub ethnicity: BTreeMap<String, WeightTable>,
    /// First-language weights keyed by race, or by ethnicity for hispanic persons
    pub language: BTreeMap<String, WeightTable>,
    /// Gender weights
    pub gender: WeightTable,
    /// Education category weights
    pub education: WeightTable,
    /// Annual income brackets
    pub income: Vec<RangeWeight>,
    /// Age brackets in whole years
    pub ages: Vec<RangeWeight>,
}

impl CityDemographics {
    /// Pick a race
    pub fn pick_race<R: Rng + ?Sized>(&self, rng: &mut R) -> SimulationResult<String> {
        pick_weighted(&self.race, rng, "race")
    }

    /// Pick an ethnicity conditioned on race
    pub fn pick_ethnicity<R: Rng + ?Sized>(
        &self,
        race: &str,
        rng: &mut R,
    ) -> SimulationResult<String> {
        match self.ethnicity.get(race) {
            Some(table) => pick_weighted(table, rng, "ethnicity"),
            None => Ok("nonhispanic".to_string()),
        }
    }

    /// Pick a first language conditioned on race and ethnicity
    pub fn language_from_race_and_ethnicity<R: Rng + ?Sized>(
        &self,
        race: &str,
        ethnicity: &str,
        rng: &mut R,
    ) -> SimulationResult<String> {
        let table = if ethnicity == "hispanic" {
            self.language.get(ethnicity).or_else(|| self.language.get(race))
        } else {
            self.language.get(race)
        };
        match table {
            Some(table) => pick_weighted(table, rng, "language"),
            None => Ok("english".to_string()),
        }
    }

    /// Pick a gender value as written in the table
    pub fn pick_gender<R: Rng + ?Sized>(&self, rng: &mut R) -> SimulationResult<String> {
        pick_weighted(&self.gender, rng, "gender")
    }

    /// Pick an education category
    pub fn pick_education<R: Rng + ?Sized>(&self, rng: &mut R) -> SimulationResult<String> {
        pick_weighted(&self.education, rng, "education")
    }

    /// Pick an annual income
    pub fn pick_income<R: Rng + ?Sized>(&self, rng: &mut R) -> SimulationResult<u32> {
        pick_in_range(&self.income, rng, "income")
    }

    /// Pick an age in whole years
    pub fn pick_age<R: Rng + ?Sized>(&self, rng: &mut R) -> SimulationResult<u32> {
        pick_in_range(&self.ages, rng, "age")
    }
}

/// State-level parameters turning income, education and occupation into a
/// socioeconomic score and category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocioeconomicScoring {
    /// Weight of the income score
    pub income_weight: f64,
    /// Weight of the education score
    pub education_weight: f64,
    /// Weight of the occupation score
    pub occupation_weight: f64,
    /// Scores below this are "Low"
    pub middle_threshold: f64,
    /// Scores at or above this are "High"
    pub high_threshold: f64,
    /// Income at or below which the income score is 0
    pub poverty_income: f64,
    /// Income at or above which the income score is 1
    pub high_income: f64,
    /// Education score range per education category
    pub education_levels: BTreeMap<String, (f64, f64)>,
}

impl Default for SocioeconomicScoring {
    fn default() -> Self {
        let education_levels = [
            ("less_than_hs", (0.0, 0.5)),
            ("hs_degree", (0.1, 0.75)),
            ("some_college", (0.3, 0.85)),
            ("bs_degree", (0.5, 1.0)),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        Self {
            income_weight: 0.2,
            education_weight: 0.7,
            occupation_weight: 0.1,
            middle_threshold: 0.25,
            high_threshold: 0.66,
            poverty_income: 11_000.0,
            high_income: 75_000.0,
            education_levels,
        }
    }
}

/// Cities of one state with their demographic tables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// State name
    pub state: String,
    /// Cities in this location
    pub cities: Vec<CityDemographics>,
    /// Socioeconomic scoring parameters
    #[serde(default)]
    pub scoring: SocioeconomicScoring,
}

#[derive(Deserialize)]
struct DemographicsFile {
    cities: Vec<CityDemographics>,
    #[serde(default)]
    scoring: SocioeconomicScoring,
}

impl Location {
    /// Built-in tables for `state`, restricted to `city` when given
    pub fn builtin(state: &str, city: Option<&str>) -> Self {
        let cities = match city {
            Some(city) => vec![template_city(city, state, "Central County", 100_000)],
            None => vec![
                template_city("Springfield", state, "Central County", 150_000),
                template_city("Riverside", state, "River County", 80_000),
                template_city("Fairview", state, "Hill County", 30_000),
            ],
        };
        Self { state: state.to_string(), cities, scoring: SocioeconomicScoring::default() }
    }

    /// Load tables from a JSON file, keeping the cities of `state` (and `city` when given)
    pub fn from_file<P: AsRef<Path>>(
        path: P,
        state: &str,
        city: Option<&str>,
    ) -> SimulationResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            SimulationError::demographics_error(format!(
                "Failed to read demographics file {}: {}",
                path.display(),
                e
            ))
        })?;
        let file: DemographicsFile = serde_json::from_str(&content)?;

        let cities: Vec<_> = file
            .cities
            .into_iter()
            .filter(|c| c.state.eq_ignore_ascii_case(state))
            .filter(|c| city.map_or(true, |name| c.city.eq_ignore_ascii_case(name)))
            .collect();

        if cities.is_empty() {
            return Err(SimulationError::demographics_error(format!(
                "No demographics for {}{}",
                city.map(|c| format!("{}, ", c)).unwrap_or_default(),
                state
            )));
        }

        Ok(Self { state: state.to_string(), cities, scoring: file.scoring })
    }

    /// Narrow this location to the given state and city.
    ///
    /// When the city is not in the table, the first city's tables are reused
    /// under the requested names so the city and state are kept verbatim.
    pub fn for_city(&self, state: &str, city: &str) -> SimulationResult<Self> {
        let known = self
            .cities
            .iter()
            .find(|c| c.city.eq_ignore_ascii_case(city) && c.state.eq_ignore_ascii_case(state));

        let chosen = match known {
            Some(c) => c.clone(),
            None => {
                let template = self.cities.first().ok_or_else(|| {
                    SimulationError::demographics_error("Location has no cities")
                })?;
                CityDemographics {
                    city: city.to_string(),
                    state: state.to_string(),
                    ..template.clone()
                }
            }
        };

        Ok(Self { state: state.to_string(), cities: vec![chosen], scoring: self.scoring.clone() })
    }

    /// Pick a city weighted by population
    pub fn random_city<R: Rng + ?Sized>(&self, rng: &mut R) -> SimulationResult<&CityDemographics> {
        if self.cities.is_empty() {
            return Err(SimulationError::demographics_error("Location has no cities"));
        }
        let weights: Vec<u64> = self.cities.iter().map(|c| c.population).collect();
        let index = match WeightedIndex::new(&weights) {
            Ok(dist) => dist.sample(rng),
            Err(_) => rng.gen_range(0..self.cities.len()),
        };
        Ok(&self.cities[index])
    }

    /// Continuous education score for an education category
    pub fn education_level<R: Rng + ?Sized>(&self, education: &str, rng: &mut R) -> f64 {
        let (low, high) = self.scoring.education_levels.get(education).copied().unwrap_or((0.0, 1.0));
        low + (high - low) * rng.gen::<f64>()
    }

    /// Continuous income score in `[0, 1]`
    pub fn income_level(&self, income: u32) -> f64 {
        let span = self.scoring.high_income - self.scoring.poverty_income;
        if span <= 0.0 {
            return 0.0;
        }
        ((f64::from(income) - self.scoring.poverty_income) / span).clamp(0.0, 1.0)
    }

    /// Weighted socioeconomic score
    pub fn socioeconomic_score(&self, income_level: f64, education_level: f64, occupation: f64) -> f64 {
        self.scoring.income_weight * income_level
            + self.scoring.education_weight * education_level
            + self.scoring.occupation_weight * occupation
    }

    /// Socioeconomic category for a score
    pub fn socioeconomic_category(&self, score: f64) -> &'static str {
        if score < self.scoring.middle_threshold {
            "Low"
        } else if score < self.scoring.high_threshold {
            "Middle"
        } else {
            "High"
        }
    }
}

/// Pick a key from a weight table
pub fn pick_weighted<R: Rng + ?Sized>(
    table: &WeightTable,
    rng: &mut R,
    what: &str,
) -> SimulationResult<String> {
    let dist = WeightedIndex::new(table.values()).map_err(|e| {
        SimulationError::demographics_error(format!("Invalid {} table: {}", what, e))
    })?;
    let index = dist.sample(rng);
    table
        .keys()
        .nth(index)
        .cloned()
        .ok_or_else(|| SimulationError::demographics_error(format!("Empty {} table", what)))
}

fn pick_in_range<R: Rng + ?Sized>(
    ranges: &[RangeWeight],
    rng: &mut R,
    what: &str,
) -> SimulationResult<u32> {
    let dist = WeightedIndex::new(ranges.iter().map(|r| r.weight)).map_err(|e| {
        SimulationError::demographics_error(format!("Invalid {} table: {}", what, e))
    })?;
    let range = ranges[dist.sample(rng)];
    if range.max <= range.min {
        return Ok(range.min);
    }
    Ok(rng.gen_range(range.min..=range.max))
}

fn table(entries: &[(&str, f64)]) -> WeightTable {
    entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

fn template_city(city: &str, state: &str, county: &str, population: u64) -> CityDemographics {
    let ethnicity = ["white", "black", "asian", "native", "other"]
        .iter()
        .zip([0.08, 0.06, 0.02, 0.15, 0.40])
        .map(|(race, hispanic)| {
            (race.to_string(), table(&[("hispanic", hispanic), ("nonhispanic", 1.0 - hispanic)]))
        })
        .collect();

    let language = [
        ("white", table(&[("english", 0.92), ("portuguese", 0.04), ("italian", 0.04)])),
        ("black", table(&[("english", 0.90), ("french", 0.10)])),
        ("asian", table(&[("english", 0.40), ("chinese", 0.35), ("vietnamese", 0.25)])),
        ("native", table(&[("english", 1.0)])),
        ("other", table(&[("english", 0.70), ("spanish", 0.30)])),
        ("hispanic", table(&[("spanish", 0.60), ("english", 0.40)])),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();

    CityDemographics {
        city: city.to_string(),
        state: state.to_string(),
        county: county.to_string(),
        population,
        race: table(&[
            ("white", 0.72),
            ("black", 0.09),
            ("asian", 0.07),
            ("native", 0.01),
            ("other", 0.11),
        ]),
        ethnicity,
        language,
        gender: table(&[("male", 0.49), ("female", 0.51)]),
        education: table(&[
            ("less_than_hs", 0.10),
            ("hs_degree", 0.27),
            ("some_college", 0.25),
            ("bs_degree", 0.38),
        ]),
        income: vec![
            RangeWeight::new(0, 9_999, 0.06),
            RangeWeight::new(10_000, 24_999, 0.13),
            RangeWeight::new(25_000, 49_999, 0.20),
            RangeWeight::new(50_000, 74_999, 0.17),
            RangeWeight::new(75_000, 99_999, 0.13),
            RangeWeight::new(100_000, 149_999, 0.16),
            RangeWeight::new(150_000, 250_000, 0.15),
        ],
        ages: vec![
            RangeWeight::new(0, 4, 0.06),
            RangeWeight::new(5, 17, 0.16),
            RangeWeight::new(18, 24, 0.09),
            RangeWeight::new(25, 34, 0.14),
            RangeWeight::new(35, 44, 0.13),
            RangeWeight::new(45, 54, 0.13),
            RangeWeight::new(55, 64, 0.13),
            RangeWeight::new(65, 74, 0.09),
            RangeWeight::new(75, 84, 0.05),
            RangeWeight::new(85, 100, 0.02),
        ],
    }
}
