//! Experience generator: destination, type and tone for one person.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::ValuePools;

/// Probability that a story is framed as challenging rather than positive.
pub const CHALLENGING_PROBABILITY: f64 = 0.2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperienceRecord {
    pub destination_country: String,
    pub experience_type: String,
    pub is_challenging: bool,
}

/// Generates an experience whose destination is never the home nationality.
///
/// Filter-then-choose: candidates equal to `home_nationality` are removed
/// before the draw. `ValuePools::validate` guarantees the filtered set is non-empty.
pub fn generate_experience<R: Rng + ?Sized>(
    rng: &mut R,
    pools: &ValuePools,
    home_nationality: &str,
) -> ExperienceRecord {
    let candidates: Vec<&String> = pools
        .destinations
        .iter()
        .filter(|d| d.as_str() != home_nationality)
        .collect();

    ExperienceRecord {
        destination_country: candidates
            .choose(rng)
            .map(|d| d.to_string())
            .unwrap_or_default(),
        experience_type: pools
            .experience_types
            .choose(rng)
            .cloned()
            .unwrap_or_default(),
        is_challenging: rng.gen_bool(CHALLENGING_PROBABILITY),
    }
}
