use crate::config::MatchingConfig;
use crate::index::CandidateIndex;
use crate::model::{
    DecedentOutcome, DecedentRecord, MatchCandidate, MatchMeta, MatchReport, NoMatch,
};
use crate::scorer::MatchScorer;
use crate::summary::compute_summary;

/// Scores decedents against a built index. Borrows the index read-only, so
/// several engines may share one.
pub struct MatchEngine<'a> {
    index: &'a CandidateIndex,
    scorer: MatchScorer,
    threshold: f64,
    ambiguity_band: f64,
}

impl<'a> MatchEngine<'a> {
    pub fn new(index: &'a CandidateIndex, config: &MatchingConfig) -> Self {
        Self {
            index,
            scorer: MatchScorer::new(config),
            threshold: config.threshold,
            ambiguity_band: config.ambiguity_band,
        }
    }

    /// Replace the scorer, e.g. to pin the reference year.
    pub fn with_scorer(mut self, scorer: MatchScorer) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn scorer(&self) -> &MatchScorer {
        &self.scorer
    }

    /// Candidates at or above the threshold, ranked by score descending then
    /// voter id, with near-ties of the top score flagged.
    pub fn evaluate(&self, decedent: &DecedentRecord) -> DecedentOutcome {
        let voters = self.index.lookup(&decedent.name);
        let considered = voters.len();

        let mut best_score: Option<f64> = None;
        let mut retained = Vec::new();
        for voter in voters {
            let candidate = self.scorer.score(decedent, voter);
            best_score = Some(best_score.map_or(candidate.score, |b| b.max(candidate.score)));
            if candidate.score >= self.threshold {
                retained.push(candidate);
            }
        }

        if retained.is_empty() {
            return DecedentOutcome::Unmatched(NoMatch {
                decedent_id: decedent.id.clone(),
                name: decedent.name.canonical(),
                candidates_considered: considered,
                best_score,
            });
        }

        rank(&mut retained);
        flag_ties(&mut retained, self.ambiguity_band);
        DecedentOutcome::Matched(retained)
    }

    /// Lazy form: one outcome per decedent, in input order.
    pub fn outcomes<'s, I>(&'s self, decedents: I) -> impl Iterator<Item = DecedentOutcome> + 's
    where
        I: IntoIterator<Item = DecedentRecord>,
        I::IntoIter: 's,
    {
        decedents.into_iter().map(move |d| self.evaluate(&d))
    }
}

/// Absorbs float rounding in score gaps (`1.0 - 0.98` is not exactly `0.02`).
const BAND_EPSILON: f64 = 1e-9;

fn rank(candidates: &mut [MatchCandidate]) {
    candidates.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.voter_id.cmp(&b.voter_id))
    });
}

/// Expects `candidates` ranked. Flags every candidate within `band` of the
/// top score, but only when there are at least two of them.
fn flag_ties(candidates: &mut [MatchCandidate], band: f64) {
    let Some(top) = candidates.first().map(|c| c.score) else {
        return;
    };
    let tied = candidates
        .iter()
        .take_while(|c| top - c.score <= band + BAND_EPSILON)
        .count();
    if tied < 2 {
        return;
    }
    for candidate in &mut candidates[..tied] {
        candidate.ambiguity_flag = true;
    }
}

/// Match every decedent against the index and collect the report.
pub fn run<I>(decedents: I, index: &CandidateIndex, config: &MatchingConfig) -> MatchReport
where
    I: IntoIterator<Item = DecedentRecord>,
{
    run_with(MatchEngine::new(index, config), decedents, config)
}

/// `run` with a caller-supplied engine.
pub fn run_with<I>(engine: MatchEngine<'_>, decedents: I, config: &MatchingConfig) -> MatchReport
where
    I: IntoIterator<Item = DecedentRecord>,
{
    let mut candidates = Vec::new();
    let mut unmatched = Vec::new();
    for outcome in engine.outcomes(decedents) {
        match outcome {
            DecedentOutcome::Matched(found) => candidates.extend(found),
            DecedentOutcome::Unmatched(miss) => unmatched.push(miss),
        }
    }

    let summary = compute_summary(&candidates, &unmatched, engine.index.stats().voters);
    log::info!(
        "matched {} of {} decedents ({} ambiguous, {} candidates)",
        summary.matched_decedents,
        summary.decedents,
        summary.ambiguous_decedents,
        summary.candidates
    );

    MatchReport {
        meta: MatchMeta {
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
            threshold: config.threshold,
            ambiguity_band: config.ambiguity_band,
            reference_year: engine.scorer.default_reference_year(),
        },
        summary,
        candidates,
        unmatched,
    }
}
