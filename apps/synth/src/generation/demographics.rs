//! Demographic generator: one fictitious person per iteration.
//!
//! Age is drawn first and the birth date placed inside `reference_year - age`,
//! so the two can never disagree.

use chrono::{Datelike, NaiveDate};
use fake::faker::address::en::CityName;
use fake::faker::job::en::Title;
use fake::faker::name::en::Name;
use fake::Fake;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ValuePools;

pub const MIN_AGE: i32 = 18;
pub const MAX_AGE: i32 = 35;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    #[serde(rename = "Non-binary")]
    NonBinary,
}

impl Gender {
    pub const ALL: [Gender; 3] = [Gender::Male, Gender::Female, Gender::NonBinary];

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::NonBinary => "Non-binary",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Education {
    #[serde(rename = "High School")]
    HighSchool,
    #[serde(rename = "Bachelor's")]
    Bachelors,
    #[serde(rename = "Master's")]
    Masters,
    #[serde(rename = "PhD")]
    Phd,
}

impl Education {
    pub const ALL: [Education; 4] = [
        Education::HighSchool,
        Education::Bachelors,
        Education::Masters,
        Education::Phd,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Education::HighSchool => "High School",
            Education::Bachelors => "Bachelor's",
            Education::Masters => "Master's",
            Education::Phd => "PhD",
        }
    }
}

/// A synthetic person. Immutable once generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemographicRecord {
    pub name: String,
    pub gender: Gender,
    pub age: i32,
    #[serde(rename = "DOB")]
    pub dob: NaiveDate,
    pub nationality: String,
    pub origin_city: String,
    pub origin_address: String,
    pub occupation: String,
    pub education: Education,
}

/// Draws a nationality uniformly from the pool.
pub fn pick_nationality<R: Rng + ?Sized>(rng: &mut R, pools: &ValuePools) -> String {
    pools
        .nationalities
        .choose(rng)
        .cloned()
        .unwrap_or_default()
}

/// Generates one demographic record for the given nationality.
pub fn generate_demographics<R: Rng + ?Sized>(
    rng: &mut R,
    pools: &ValuePools,
    nationality: &str,
    reference_year: i32,
) -> DemographicRecord {
    let locale = pools.locale_for(nationality);
    let age = rng.gen_range(MIN_AGE..=MAX_AGE);
    let dob = random_day_in_year(rng, reference_year - age);

    let origin_city: String = CityName().fake_with_rng(rng);
    let address_city: String = CityName().fake_with_rng(rng);

    let record = DemographicRecord {
        name: Name().fake_with_rng(rng),
        gender: *Gender::ALL.choose(rng).unwrap_or(&Gender::Female),
        age: reference_year - dob.year(),
        dob,
        nationality: nationality.to_string(),
        origin_city,
        origin_address: format!("{address_city}, {nationality}"),
        occupation: Title().fake_with_rng(rng),
        education: *Education::ALL.choose(rng).unwrap_or(&Education::Bachelors),
    };

    debug!(
        "Generated demographics: name={}, age={}, nationality={}, locale={}",
        record.name, record.age, record.nationality, locale
    );

    record
}

fn random_day_in_year<R: Rng + ?Sized>(rng: &mut R, year: i32) -> NaiveDate {
    let days = NaiveDate::from_ymd_opt(year, 12, 31)
        .map(|d| d.ordinal())
        .unwrap_or(365);
    let ordinal = rng.gen_range(1..=days);
    NaiveDate::from_yo_opt(year, ordinal).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_age_in_range_and_consistent_with_dob() {
        let pools = ValuePools::default();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let nationality = pick_nationality(&mut rng, &pools);
            let record = generate_demographics(&mut rng, &pools, &nationality, 2025);
            assert!(
                (MIN_AGE..=MAX_AGE).contains(&record.age),
                "age {} out of range",
                record.age
            );
            assert_eq!(record.age, 2025 - record.dob.year());
        }
    }

    #[test]
    fn test_fields_populated_and_address_names_nationality() {
        let pools = ValuePools::default();
        let mut rng = StdRng::seed_from_u64(11);
        let record = generate_demographics(&mut rng, &pools, "Japan", 2025);
        assert!(!record.name.is_empty());
        assert!(!record.origin_city.is_empty());
        assert!(!record.occupation.is_empty());
        assert_eq!(record.nationality, "Japan");
        assert!(record.origin_address.ends_with(", Japan"));
    }

    #[test]
    fn test_nationality_drawn_from_pool() {
        let pools = ValuePools::default();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            let n = pick_nationality(&mut rng, &pools);
            assert!(pools.nationalities.contains(&n));
        }
    }

    #[test]
    fn test_same_seed_same_record() {
        let pools = ValuePools::default();
        let a = generate_demographics(&mut StdRng::seed_from_u64(99), &pools, "UK", 2025);
        let b = generate_demographics(&mut StdRng::seed_from_u64(99), &pools, "UK", 2025);
        assert_eq!(a, b);
    }

    #[test]
    fn test_serializes_with_dob_key_and_display_strings() {
        let record = DemographicRecord {
            name: "Ana Souza".to_string(),
            gender: Gender::NonBinary,
            age: 24,
            dob: NaiveDate::from_ymd_opt(2001, 3, 9).unwrap(),
            nationality: "Brazil".to_string(),
            origin_city: "Recife".to_string(),
            origin_address: "Natal, Brazil".to_string(),
            occupation: "Designer".to_string(),
            education: Education::Masters,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["DOB"], "2001-03-09");
        assert_eq!(json["gender"], "Non-binary");
        assert_eq!(json["education"], "Master's");
        assert_eq!(Education::Masters.as_str(), "Master's");
        assert_eq!(Gender::NonBinary.as_str(), "Non-binary");
    }

    #[test]
    fn test_leap_year_day_range() {
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..400 {
            let d = random_day_in_year(&mut rng, 2004);
            assert_eq!(d.year(), 2004);
        }
    }
}
