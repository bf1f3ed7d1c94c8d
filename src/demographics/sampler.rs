//! Demographics sampling
//!
//! Produces the attribute set a person is created from, either sampled from
//! the location tables or bound to a fixed-identity record group.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use tracing::trace;

use crate::demographics::{CityDemographics, FixedRecordGroup, Location};
use crate::person::{age_between, keys, Attributes};
use crate::simulation::{SimulationError, SimulationResult};
use crate::types::{Gender, GenerationConfig};

/// Samples demographic attributes for new persons
#[derive(Debug, Clone)]
pub struct DemographicsSampler {
    location: Location,
    gender: Option<Gender>,
    age_specified: bool,
    min_age: u32,
    max_age: u32,
    veteran_override: bool,
    reference_time: DateTime<Utc>,
}

impl DemographicsSampler {
    /// Create a sampler over `location` using the filters in `config`
    pub fn new(location: Location, config: &GenerationConfig) -> Self {
        Self {
            location,
            gender: config.gender,
            age_specified: config.age_specified,
            min_age: config.min_age,
            max_age: config.max_age,
            veteran_override: config.veteran_population_override,
            reference_time: config.reference_time,
        }
    }

    /// Location the sampler draws from
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Reference time ages are computed against
    pub fn reference_time(&self) -> DateTime<Utc> {
        self.reference_time
    }

    /// Sample a complete attribute set from a random city of the location
    pub fn random_demographics<R: Rng + ?Sized>(&self, rng: &mut R) -> SimulationResult<Attributes> {
        let city = self.location.random_city(rng)?;
        self.pick_demographics(&self.location, city, rng)
    }

    /// Sample a complete attribute set for a person living in `city`
    pub fn pick_demographics<R: Rng + ?Sized>(
        &self,
        location: &Location,
        city: &CityDemographics,
        rng: &mut R,
    ) -> SimulationResult<Attributes> {
        let mut attributes = Attributes::new();
        attributes.insert(keys::CITY.into(), city.city.as_str().into());
        attributes.insert(keys::STATE.into(), city.state.as_str().into());
        attributes.insert(keys::COUNTY.into(), city.county.as_str().into());

        let race = city.pick_race(rng)?;
        let ethnicity = city.pick_ethnicity(&race, rng)?;
        let language = city.language_from_race_and_ethnicity(&race, &ethnicity, rng)?;
        attributes.insert(keys::RACE.into(), race.into());
        attributes.insert(keys::ETHNICITY.into(), ethnicity.into());
        attributes.insert(keys::FIRST_LANGUAGE.into(), language.into());

        let gender = match self.gender {
            Some(gender) => gender,
            None => Gender::normalize(&city.pick_gender(rng)?),
        };
        attributes.insert(keys::GENDER.into(), gender.code().into());

        let education = city.pick_education(rng)?;
        let education_level = location.education_level(&education, rng);
        attributes.insert(keys::EDUCATION.into(), education.into());
        attributes.insert(keys::EDUCATION_LEVEL.into(), education_level.into());

        let income = city.pick_income(rng)?;
        let income_level = location.income_level(income);
        attributes.insert(keys::INCOME.into(), income.into());
        attributes.insert(keys::INCOME_LEVEL.into(), income_level.into());

        let occupation: f64 = rng.gen();
        attributes.insert(keys::OCCUPATION_LEVEL.into(), occupation.into());

        let score = location.socioeconomic_score(income_level, education_level, occupation);
        attributes.insert(keys::SES_SCORE.into(), score.into());
        attributes.insert(keys::SES_CATEGORY.into(), location.socioeconomic_category(score).into());

        if self.veteran_override {
            attributes.insert(keys::VETERAN.into(), true.into());
        }

        let target_age = if self.age_specified {
            rng.gen_range(self.min_age..=self.max_age)
        } else {
            city.pick_age(rng)?
        };
        attributes.insert(keys::TARGET_AGE.into(), target_age.into());
        attributes.insert(
            keys::BIRTHDATE.into(),
            birthdate_from_target_age(target_age, self.reference_time, rng).into(),
        );

        trace!("Sampled demographics in {}, {}: target age {}", city.city, city.state, target_age);
        Ok(attributes)
    }

    /// Attribute set bound to a fixed-identity record group.
    ///
    /// Socioeconomic attributes are sampled for the group's city; birthdate,
    /// location, gender and name come from the group itself.
    pub fn pick_fixed_demographics<R: Rng + ?Sized>(
        &self,
        group: &FixedRecordGroup,
        rng: &mut R,
    ) -> SimulationResult<Attributes> {
        let record = group
            .primary()
            .ok_or_else(|| SimulationError::demographics_error("Fixed record group has no records"))?;
        let birthdate = group.valid_birthdate().ok_or_else(|| {
            SimulationError::demographics_error(format!(
                "Fixed record group {} has no valid birthdate",
                group.link_id.map(|id| id.to_string()).unwrap_or_default()
            ))
        })?;

        let state = group.state().unwrap_or(self.location.state.as_str());
        let location = match group.safe_city() {
            Some(city) => self.location.for_city(state, city)?,
            None => self.location.clone(),
        };
        let city = location.random_city(rng)?;
        let mut attributes = self.pick_demographics(&location, city, rng)?;

        attributes.insert(keys::BIRTHDATE.into(), birthdate.into());
        attributes.insert(
            keys::TARGET_AGE.into(),
            age_between(birthdate, self.reference_time).into(),
        );
        attributes.insert(keys::BIRTH_CITY.into(), city.city.as_str().into());
        attributes.insert(keys::GENDER.into(), record.effective_gender().into());

        let name = record.full_name();
        if !name.is_empty() {
            attributes.insert(keys::NAME.into(), name.into());
            attributes.insert(keys::FIRST_NAME.into(), record.first_name.trim().into());
            attributes.insert(keys::LAST_NAME.into(), record.last_name.trim().into());
        }

        if let Some(link_id) = group.link_id {
            attributes.insert(keys::LINK_ID.into(), (link_id.0 as i64).into());
        }
        attributes.insert(keys::RECORD_GROUP.into(), group.clone().into());

        Ok(attributes)
    }
}

/// Draw a birth instant consistent with `target_age` whole years at `reference_time`.
///
/// Years are approximated as 365 days: the window runs from
/// `reference - ((age + 1) * 365 + 1)` days to `reference - age * 365` days.
pub fn birthdate_from_target_age<R: Rng + ?Sized>(
    target_age: u32,
    reference_time: DateTime<Utc>,
    rng: &mut R,
) -> DateTime<Utc> {
    let age = i64::from(target_age);
    let earliest = reference_time - Duration::days((age + 1) * 365 + 1);
    let latest = reference_time - Duration::days(age * 365);
    let span = (latest - earliest).num_milliseconds();
    let offset = (span as f64 * rng.gen::<f64>()) as i64;
    earliest + Duration::milliseconds(offset)
}
