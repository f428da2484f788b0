use std::collections::BTreeSet;

use chrono::Datelike;

use crate::config::MatchingConfig;
use crate::model::{AgeCheck, DecedentRecord, MatchCandidate, MatchSignal, ScoreBreakdown, VoterRecord};
use crate::similarity::{edit_ratio, token_set_overlap, tokens_compatible};

const FAMILY_WEIGHT: f64 = 0.5;
const GIVEN_WEIGHT: f64 = 0.3;
const AGE_WEIGHT: f64 = 0.2;

// Name weights rescaled to sum to 1 when age is unknown: 0.5/0.8 and 0.3/0.8.
const FAMILY_WEIGHT_NO_AGE: f64 = 0.625;
const GIVEN_WEIGHT_NO_AGE: f64 = 0.375;

/// Family similarity at which the family name counts as a matched signal.
const FAMILY_SIGNAL_MIN: f64 = 0.8;

/// Scores a single (decedent, voter) pair.
#[derive(Debug, Clone)]
pub struct MatchScorer {
    default_reference_year: i32,
}

impl MatchScorer {
    pub fn new(config: &MatchingConfig) -> Self {
        Self {
            default_reference_year: config.effective_reference_year(),
        }
    }

    pub fn with_reference_year(year: i32) -> Self {
        Self {
            default_reference_year: year,
        }
    }

    pub fn default_reference_year(&self) -> i32 {
        self.default_reference_year
    }

    /// Ages are measured against the document's year when it is known.
    pub fn reference_year_for(&self, decedent: &DecedentRecord) -> i32 {
        decedent
            .document_date
            .map(|d| d.year())
            .unwrap_or(self.default_reference_year)
    }

    pub fn score(&self, decedent: &DecedentRecord, voter: &VoterRecord) -> MatchCandidate {
        let reference_year = self.reference_year_for(decedent);

        let family_similarity = edit_ratio(&decedent.name.family, &voter.name.family);
        let given_similarity =
            token_set_overlap(&decedent.name.given_tokens(), &voter.name.given_tokens());
        let age = check_age(decedent, voter, reference_year);

        let score = match age {
            AgeCheck::Unknown => {
                FAMILY_WEIGHT_NO_AGE * family_similarity + GIVEN_WEIGHT_NO_AGE * given_similarity
            }
            _ => {
                FAMILY_WEIGHT * family_similarity
                    + GIVEN_WEIGHT * given_similarity
                    + AGE_WEIGHT * age_credit(age)
            }
        }
        .clamp(0.0, 1.0);

        let mut matched_on = BTreeSet::new();
        if family_similarity >= FAMILY_SIGNAL_MIN {
            matched_on.insert(MatchSignal::FamilyName);
        }
        let (dg, vg) = (decedent.name.given.to_lowercase(), voter.name.given.to_lowercase());
        if !dg.is_empty() && !vg.is_empty() && tokens_compatible(&dg, &vg) {
            matched_on.insert(MatchSignal::GivenName);
        }
        if matches!(age, AgeCheck::Consistent { .. } | AgeCheck::Near { .. }) {
            matched_on.insert(MatchSignal::AgeConsistency);
        }

        MatchCandidate {
            decedent_id: decedent.id.clone(),
            voter_id: voter.voter_id.clone(),
            score,
            matched_on,
            ambiguity_flag: false,
            breakdown: ScoreBreakdown {
                family_similarity,
                given_similarity,
                age,
                reference_year,
            },
        }
    }
}

fn check_age(decedent: &DecedentRecord, voter: &VoterRecord, reference_year: i32) -> AgeCheck {
    let (Some(age), Some(birth_year)) = (decedent.age.valid(), voter.birth_year.valid()) else {
        return AgeCheck::Unknown;
    };
    let implied = reference_year as i64 - birth_year as i64;
    let delta_years = (implied - age as i64).abs();
    match delta_years {
        0..=1 => AgeCheck::Consistent { delta_years },
        2..=3 => AgeCheck::Near { delta_years },
        _ => AgeCheck::Inconsistent { delta_years },
    }
}

fn age_credit(age: AgeCheck) -> f64 {
    match age {
        AgeCheck::Consistent { .. } => 1.0,
        AgeCheck::Near { .. } => 0.5,
        AgeCheck::Inconsistent { .. } | AgeCheck::Unknown => 0.0,
    }
}
