//! Registrations whose birth year implies an implausible age.
//!
//! Independent of any decedent list: flags "ancient" voters for
//! list-maintenance review.

use std::borrow::Borrow;

use serde::Serialize;

use crate::model::{Checked, VoterRecord};

/// Implied age at which a registration is reported.
pub const DEFAULT_MIN_AGE: i64 = 120;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgeFinding {
    pub voter_id: String,
    pub name: String,
    pub birth_year: Checked<i32>,
    /// `reference_year - birth_year`, saturating; negative for birth years in
    /// the future.
    pub implied_age: i64,
}

/// Voters whose implied age is at least `min_age`, or whose birth year is
/// out of range altogether. Oldest first; ties by voter id.
pub fn implausible_ages<I>(voters: I, reference_year: i32, min_age: i64) -> Vec<AgeFinding>
where
    I: IntoIterator,
    I::Item: Borrow<VoterRecord>,
{
    let mut findings: Vec<AgeFinding> = voters
        .into_iter()
        .filter_map(|voter| {
            let voter: &VoterRecord = voter.borrow();
            let implied_age = match voter.birth_year {
                Checked::Unknown => return None,
                Checked::Valid(year) => {
                    let implied = reference_year as i64 - year as i64;
                    if implied < min_age {
                        return None;
                    }
                    implied
                }
                Checked::Invalid(raw) => (reference_year as i64).saturating_sub(raw),
            };
            Some(AgeFinding {
                voter_id: voter.voter_id.clone(),
                name: voter.name.canonical(),
                birth_year: voter.birth_year,
                implied_age,
            })
        })
        .collect();

    findings.sort_by(|a, b| {
        b.implied_age
            .cmp(&a.implied_age)
            .then_with(|| a.voter_id.cmp(&b.voter_id))
    });
    if !findings.is_empty() {
        log::info!(
            "{} registrations with implied age >= {min_age} or an invalid birth year",
            findings.len()
        );
    }
    findings
}
