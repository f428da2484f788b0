use rustc_hash::FxHashSet;

use crate::model::{Diagnostics, MatchCandidate, MatchSummary, NoMatch};

/// Compute summary statistics from engine output.
pub fn compute_summary(
    candidates: &[MatchCandidate],
    unmatched: &[NoMatch],
    voters_indexed: usize,
) -> MatchSummary {
    let mut matched: FxHashSet<&str> = FxHashSet::default();
    let mut ambiguous: FxHashSet<&str> = FxHashSet::default();

    for c in candidates {
        matched.insert(&c.decedent_id);
        if c.ambiguity_flag {
            ambiguous.insert(&c.decedent_id);
        }
    }

    MatchSummary {
        decedents: matched.len() + unmatched.len(),
        matched_decedents: matched.len(),
        unmatched_decedent_count: unmatched.len(),
        ambiguous_decedents: ambiguous.len(),
        candidates: candidates.len(),
        voters_indexed,
        diagnostics: Diagnostics::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AgeCheck, ScoreBreakdown};
    use std::collections::BTreeSet;

    fn candidate(decedent: &str, voter: &str, ambiguous: bool) -> MatchCandidate {
        MatchCandidate {
            decedent_id: decedent.into(),
            voter_id: voter.into(),
            score: 0.9,
            matched_on: BTreeSet::new(),
            ambiguity_flag: ambiguous,
            breakdown: ScoreBreakdown {
                family_similarity: 1.0,
                given_similarity: 1.0,
                age: AgeCheck::Unknown,
                reference_year: 2026,
            },
        }
    }

    fn miss(decedent: &str) -> NoMatch {
        NoMatch {
            decedent_id: decedent.into(),
            name: "Doe, Jane".into(),
            candidates_considered: 0,
            best_score: None,
        }
    }

    #[test]
    fn summary_counts() {
        let candidates = vec![
            candidate("d:0", "WA1", false),
            candidate("d:1", "WA2", true),
            candidate("d:1", "WA3", true),
            candidate("d:2", "WA4", false),
        ];
        let summary = compute_summary(&candidates, &[miss("d:3")], 40);
        assert_eq!(summary.decedents, 4);
        assert_eq!(summary.matched_decedents, 3);
        assert_eq!(summary.unmatched_decedent_count, 1);
        assert_eq!(summary.ambiguous_decedents, 1);
        assert_eq!(summary.candidates, 4);
        assert_eq!(summary.voters_indexed, 40);
        assert_eq!(summary.diagnostics, Diagnostics::default());
    }

    #[test]
    fn empty_run() {
        let summary = compute_summary(&[], &[], 0);
        assert_eq!(summary.decedents, 0);
        assert_eq!(summary.matched_decedents, 0);
    }
}
