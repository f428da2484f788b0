use chrono::Datelike;
use serde::Deserialize;

use crate::error::LinkError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LinkageConfig {
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub registration: RegistrationConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingConfig {
    /// Candidates scoring below this are dropped.
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    /// Candidates within this margin of a decedent's top score are ties.
    #[serde(default = "default_ambiguity_band")]
    pub ambiguity_band: f64,
    /// Year ages are measured against when a document carries no date.
    /// Defaults to the current year.
    #[serde(default)]
    pub reference_year: Option<i32>,
}

fn default_threshold() -> f64 {
    0.8
}

fn default_ambiguity_band() -> f64 {
    0.02
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            ambiguity_band: default_ambiguity_band(),
            reference_year: None,
        }
    }
}

impl MatchingConfig {
    pub fn effective_reference_year(&self) -> i32 {
        self.reference_year
            .unwrap_or_else(|| chrono::Local::now().year())
    }
}

// ---------------------------------------------------------------------------
// Index
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct IndexConfig {
    /// Cap on buckets consulted beyond the exact blocking key.
    #[serde(default = "default_max_extra_buckets")]
    pub max_extra_buckets: usize,
}

fn default_max_extra_buckets() -> usize {
    16
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            max_extra_buckets: default_max_extra_buckets(),
        }
    }
}

// ---------------------------------------------------------------------------
// Registration extract layout
// ---------------------------------------------------------------------------

/// A column addressed by header name or zero-based position.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ColumnRef {
    Index(usize),
    Name(String),
}

impl From<&str> for ColumnRef {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistrationColumns {
    pub voter_id: ColumnRef,
    pub given: ColumnRef,
    #[serde(default)]
    pub middle: Option<ColumnRef>,
    pub family: ColumnRef,
    #[serde(default)]
    pub suffix: Option<ColumnRef>,
    pub birth_year: ColumnRef,
    #[serde(default)]
    pub status: Option<ColumnRef>,
}

impl Default for RegistrationColumns {
    /// Statewide voter extract layout.
    fn default() -> Self {
        Self {
            voter_id: "StateVoterID".into(),
            given: "FName".into(),
            middle: Some("MName".into()),
            family: "LName".into(),
            suffix: Some("NameSuffix".into()),
            birth_year: "Birthyear".into(),
            status: Some("StatusCode".into()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistrationConfig {
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
    #[serde(default = "default_has_header")]
    pub has_header: bool,
    /// Rows with any other width are malformed. Defaults to the header width.
    #[serde(default)]
    pub expected_columns: Option<usize>,
    #[serde(default)]
    pub columns: RegistrationColumns,
    /// Columns copied into `VoterRecord::residual`.
    #[serde(default)]
    pub passthrough: Vec<ColumnRef>,
}

fn default_delimiter() -> String {
    "|".into()
}

fn default_has_header() -> bool {
    true
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            has_header: default_has_header(),
            expected_columns: None,
            columns: RegistrationColumns::default(),
            passthrough: Vec::new(),
        }
    }
}

impl RegistrationConfig {
    /// The delimiter as a single byte. Checked by `LinkageConfig::validate`.
    pub fn delimiter_byte(&self) -> u8 {
        self.delimiter.as_bytes().first().copied().unwrap_or(b'|')
    }
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionConfig {
    /// Template used for documents that do not name one.
    #[serde(default = "default_template")]
    pub default_template: String,
    /// Diagnostic occurrences kept verbatim per pass.
    #[serde(default = "default_sample_limit")]
    pub sample_limit: usize,
}

fn default_template() -> String {
    "case_listing".into()
}

fn default_sample_limit() -> usize {
    20
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            default_template: default_template(),
            sample_limit: default_sample_limit(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl LinkageConfig {
    pub fn from_toml(input: &str) -> Result<Self, LinkError> {
        let config: LinkageConfig =
            toml::from_str(input).map_err(|e| LinkError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), LinkError> {
        let m = &self.matching;
        if !(0.0..=1.0).contains(&m.threshold) {
            return Err(LinkError::ConfigValidation(format!(
                "threshold must be within [0, 1], got {}",
                m.threshold
            )));
        }
        if !(0.0..=1.0).contains(&m.ambiguity_band) {
            return Err(LinkError::ConfigValidation(format!(
                "ambiguity_band must be within [0, 1], got {}",
                m.ambiguity_band
            )));
        }

        let delimiter = &self.registration.delimiter;
        if delimiter.len() != 1 {
            return Err(LinkError::ConfigValidation(format!(
                "delimiter must be a single byte, got {delimiter:?}"
            )));
        }

        if !self.registration.has_header {
            let cols = &self.registration.columns;
            let named = [Some(&cols.voter_id), Some(&cols.given), cols.middle.as_ref(),
                Some(&cols.family), cols.suffix.as_ref(), Some(&cols.birth_year), cols.status.as_ref()]
                .into_iter()
                .flatten()
                .chain(self.registration.passthrough.iter())
                .find(|c| matches!(c, ColumnRef::Name(_)));
            if let Some(ColumnRef::Name(name)) = named {
                return Err(LinkError::ConfigValidation(format!(
                    "column '{name}' is addressed by name but has_header = false"
                )));
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
