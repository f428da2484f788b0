use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::Serialize;

// ---------------------------------------------------------------------------
// Names
// ---------------------------------------------------------------------------

/// Generational suffixes recognized at the end of a name.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Suffix {
    Jr,
    Sr,
    II,
    III,
    IV,
    V,
    VI,
}

impl Suffix {
    /// Case-insensitive match against the known suffix spellings.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "jr" | "jnr" => Some(Self::Jr),
            "sr" | "snr" => Some(Self::Sr),
            "ii" | "2nd" => Some(Self::II),
            "iii" | "3rd" => Some(Self::III),
            "iv" | "4th" => Some(Self::IV),
            "v" | "5th" => Some(Self::V),
            "vi" | "6th" => Some(Self::VI),
            _ => None,
        }
    }

    /// Parseable name tokens that must remain for this suffix to be split off.
    /// A lone `V` is far more often a middle initial.
    pub fn min_companions(self) -> usize {
        match self {
            Self::V => 2,
            _ => 1,
        }
    }
}

impl std::fmt::Display for Suffix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Jr => write!(f, "Jr"),
            Self::Sr => write!(f, "Sr"),
            Self::II => write!(f, "II"),
            Self::III => write!(f, "III"),
            Self::IV => write!(f, "IV"),
            Self::V => write!(f, "V"),
            Self::VI => write!(f, "VI"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NameQuality {
    Clean,
    /// Some tokens landed in `unparsed`, or no family name could be found.
    Degraded,
}

/// A structured, comparable person name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersonName {
    pub given: String,
    pub middle: Vec<String>,
    pub family: String,
    pub suffix: Option<Suffix>,
    pub raw_text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unparsed: Vec<String>,
    pub quality: NameQuality,
}

impl PersonName {
    pub fn is_degraded(&self) -> bool {
        self.quality == NameQuality::Degraded
    }

    /// Structural equality: every field except `raw_text`.
    pub fn eq_ignoring_raw(&self, other: &Self) -> bool {
        self.given == other.given
            && self.middle == other.middle
            && self.family == other.family
            && self.suffix == other.suffix
            && self.unparsed == other.unparsed
            && self.quality == other.quality
    }

    /// Canonical rendering. Normalizing this string reproduces the same
    /// structure.
    ///
    /// Uses `"Family, Given Middle Suffix"` so multi-word family names survive,
    /// except when the last given-side token reads like a suffix it isn't and
    /// natural order would keep the family intact; those names round-trip
    /// only in natural order.
    pub fn canonical(&self) -> String {
        let mut given_side: Vec<String> = Vec::new();
        if !self.given.is_empty() {
            given_side.push(self.given.clone());
        }
        given_side.extend(self.middle.iter().cloned());

        let ambiguous_tail = self.suffix.is_none()
            && given_side
                .last()
                .is_some_and(|t| Suffix::from_token(t).is_some())
            && self.family_survives_natural_order(given_side.len());

        let mut parts: Vec<String> = Vec::new();
        if ambiguous_tail {
            parts.extend(given_side);
            if !self.family.is_empty() {
                parts.push(self.family.clone());
            }
            parts.extend(self.unparsed.iter().cloned());
            return parts.join(" ");
        }

        if let Some(suffix) = self.suffix {
            given_side.push(suffix.to_string());
        }
        given_side.extend(self.unparsed.iter().cloned());
        if self.family.is_empty() {
            given_side.join(" ")
        } else {
            format!("{}, {}", self.family, given_side.join(" "))
                .trim_end()
                .to_string()
        }
    }

    /// Natural-order parsing pops a suffix-like last family token when enough
    /// other tokens remain.
    fn family_survives_natural_order(&self, given_side: usize) -> bool {
        let family: Vec<&str> = self.family.split(' ').filter(|t| !t.is_empty()).collect();
        match family.last().and_then(|t| Suffix::from_token(t)) {
            Some(suffix) => given_side + family.len() - 1 < suffix.min_companions(),
            None => true,
        }
    }

    /// Given name followed by middle names, lower-cased.
    pub fn given_tokens(&self) -> Vec<String> {
        std::iter::once(&self.given)
            .chain(self.middle.iter())
            .filter(|t| !t.is_empty())
            .map(|t| t.to_lowercase())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Checked numeric fields
// ---------------------------------------------------------------------------

/// A numeric field that may be missing or out of its allowed range.
/// Out-of-range values are kept as `Invalid`, never clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum Checked<T> {
    Unknown,
    Valid(T),
    Invalid(i64),
}

impl<T: Copy> Checked<T> {
    pub fn valid(&self) -> Option<T> {
        match self {
            Self::Valid(v) => Some(*v),
            _ => None,
        }
    }
}

/// Allowed age range in years, inclusive.
pub const MAX_AGE_YEARS: i64 = 130;

impl Checked<u8> {
    pub fn age(years: i64) -> Self {
        if (0..=MAX_AGE_YEARS).contains(&years) {
            Self::Valid(years as u8)
        } else {
            Self::Invalid(years)
        }
    }
}

impl Checked<i32> {
    /// A birth year is valid when it implies an age in `0..=130` at
    /// `reference_year`.
    pub fn birth_year(year: i64, reference_year: i32) -> Self {
        match (reference_year as i64).checked_sub(year) {
            Some(implied) if (0..=MAX_AGE_YEARS).contains(&implied) => Self::Valid(year as i32),
            _ => Self::Invalid(year),
        }
    }
}

// ---------------------------------------------------------------------------
// Decedents
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceLocation {
    /// Index of the person block within its document.
    pub block: usize,
    /// 1-based line of the name span inside the block, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecedentRecord {
    pub id: String,
    pub name: PersonName,
    pub age: Checked<u8>,
    pub source_document_id: String,
    pub source_location: SourceLocation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_date: Option<NaiveDate>,
}

// ---------------------------------------------------------------------------
// Voters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    Active,
    Inactive,
    Cancelled,
    Other(String),
}

impl RegistrationStatus {
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_lowercase().as_str() {
            "a" | "active" => Self::Active,
            "i" | "inactive" => Self::Inactive,
            "c" | "cancelled" | "canceled" => Self::Cancelled,
            _ => Self::Other(code.trim().to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoterRecord {
    pub voter_id: String,
    pub name: PersonName,
    pub birth_year: Checked<i32>,
    pub registration_status: RegistrationStatus,
    /// Configured pass-through columns only; the raw row is not retained.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub residual: BTreeMap<String, String>,
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchSignal {
    FamilyName,
    GivenName,
    AgeConsistency,
}

/// Outcome of the age comparison for one pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AgeCheck {
    /// Either side lacks a valid age; name weights were rescaled.
    Unknown,
    /// Delta of 0–1 years.
    Consistent { delta_years: i64 },
    /// Delta of 2–3 years.
    Near { delta_years: i64 },
    Inconsistent { delta_years: i64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub family_similarity: f64,
    pub given_similarity: f64,
    pub age: AgeCheck,
    pub reference_year: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchCandidate {
    pub decedent_id: String,
    pub voter_id: String,
    pub score: f64,
    pub matched_on: BTreeSet<MatchSignal>,
    pub ambiguity_flag: bool,
    pub breakdown: ScoreBreakdown,
}

/// A decedent with no candidate at or above the threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoMatch {
    pub decedent_id: String,
    pub name: String,
    pub candidates_considered: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_score: Option<f64>,
}

/// Per-decedent engine output.
#[derive(Debug, Clone, PartialEq)]
pub enum DecedentOutcome {
    Matched(Vec<MatchCandidate>),
    Unmatched(NoMatch),
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A name or age field was only partly parsed; the record was kept.
    ParseDegraded,
    /// A registration row had the wrong shape; skipped.
    RowMalformed,
    /// A decedent block had no extractable name; skipped.
    BlockSkipped,
    /// A decedent block repeated a case already seen in this run; skipped.
    DuplicateCase,
}

impl std::fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ParseDegraded => write!(f, "parse_degraded"),
            Self::RowMalformed => write!(f, "row_malformed"),
            Self::BlockSkipped => write!(f, "block_skipped"),
            Self::DuplicateCase => write!(f, "duplicate_case"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Where it happened, e.g. `line 17` or `doc-1:4`.
    pub location: String,
    pub detail: String,
}

/// Quality counters for one pass. The only channel for degraded input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    pub skipped_blocks: usize,
    pub skipped_rows: usize,
    pub duplicate_blocks: usize,
    pub parse_degraded: usize,
    /// First few occurrences, for audit.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub samples: Vec<Diagnostic>,
    #[serde(skip)]
    sample_limit: usize,
}

impl Diagnostics {
    pub fn with_sample_limit(sample_limit: usize) -> Self {
        Self {
            sample_limit,
            ..Self::default()
        }
    }

    pub fn record(&mut self, kind: DiagnosticKind, location: impl Into<String>, detail: impl Into<String>) {
        match kind {
            DiagnosticKind::ParseDegraded => self.parse_degraded += 1,
            DiagnosticKind::RowMalformed => self.skipped_rows += 1,
            DiagnosticKind::BlockSkipped => self.skipped_blocks += 1,
            DiagnosticKind::DuplicateCase => self.duplicate_blocks += 1,
        }
        let location = location.into();
        let detail = detail.into();
        log::debug!("{kind} at {location}: {detail}");
        if self.samples.len() < self.sample_limit {
            self.samples.push(Diagnostic { kind, location, detail });
        }
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        match kind {
            DiagnosticKind::ParseDegraded => self.parse_degraded,
            DiagnosticKind::RowMalformed => self.skipped_rows,
            DiagnosticKind::BlockSkipped => self.skipped_blocks,
            DiagnosticKind::DuplicateCase => self.duplicate_blocks,
        }
    }

    /// Fold another pass's counters in. Samples stay within this limit.
    pub fn merge(&mut self, other: &Diagnostics) {
        self.skipped_blocks += other.skipped_blocks;
        self.skipped_rows += other.skipped_rows;
        self.duplicate_blocks += other.duplicate_blocks;
        self.parse_degraded += other.parse_degraded;
        self.sample_limit = self.sample_limit.max(other.sample_limit);
        for sample in &other.samples {
            if self.samples.len() >= self.sample_limit {
                break;
            }
            self.samples.push(sample.clone());
        }
    }
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchSummary {
    pub decedents: usize,
    pub matched_decedents: usize,
    pub unmatched_decedent_count: usize,
    pub ambiguous_decedents: usize,
    pub candidates: usize,
    pub voters_indexed: usize,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchMeta {
    pub engine_version: String,
    pub run_at: String,
    pub threshold: f64,
    pub ambiguity_band: f64,
    pub reference_year: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchReport {
    pub meta: MatchMeta,
    pub summary: MatchSummary,
    pub candidates: Vec<MatchCandidate>,
    pub unmatched: Vec<NoMatch>,
}

impl MatchReport {
    /// Fold loader or extractor diagnostics into the summary.
    pub fn absorb(&mut self, diagnostics: &Diagnostics) {
        self.summary.diagnostics.merge(diagnostics);
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.summary.diagnostics
    }
}
