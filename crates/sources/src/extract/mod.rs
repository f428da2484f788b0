//! Decedent extraction from per-person text blocks.
//!
//! A document's text has already been split into blocks, one per listed
//! person. A [`BlockTemplate`] locates the name, age and case number inside a
//! block; the extractor turns those into [`DecedentRecord`]s and keeps the
//! per-pass diagnostics.

mod case_listing;
mod labeled;

use std::collections::{BTreeMap, HashSet};
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use rollcheck_linkage::config::ExtractionConfig;
use rollcheck_linkage::model::{Checked, DecedentRecord, DiagnosticKind, Diagnostics, SourceLocation};
use rollcheck_linkage::{normalize, LinkError};
use serde::{Deserialize, Serialize};

pub use case_listing::{split_case_blocks, CaseListingTemplate};
pub use labeled::LabeledTemplate;

/// One decedent list, already reduced to text blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub id: String,
    /// Template id; the extractor's default when absent.
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    pub blocks: Vec<String>,
}

impl SourceDocument {
    pub fn new(id: impl Into<String>, blocks: Vec<String>) -> Self {
        Self {
            id: id.into(),
            template: None,
            date: None,
            blocks,
        }
    }

    /// A case listing given as page text. The id is the file name and the
    /// date is read from it.
    pub fn from_case_pages<S: AsRef<str>>(file_name: &str, pages: &[S]) -> Self {
        Self {
            id: file_name.to_string(),
            template: Some(CaseListingTemplate::ID.to_string()),
            date: document_date_from_name(file_name),
            blocks: pages
                .iter()
                .flat_map(|page| split_case_blocks(page.as_ref()))
                .collect(),
        }
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }
}

/// What a template found in one block. Everything is raw text; the extractor
/// does the parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockFields {
    /// Name parts in reading order, with their 1-based line in the block.
    pub name_lines: Vec<(usize, String)>,
    pub age: Option<String>,
    pub case_id: Option<String>,
}

/// Locates the fields of one person block for a document layout.
pub trait BlockTemplate: Send + Sync {
    fn id(&self) -> &str;
    fn fields(&self, block: &str) -> BlockFields;
}

/// Template registry plus the per-pass extraction rules.
pub struct DecedentExtractor {
    templates: BTreeMap<String, Box<dyn BlockTemplate>>,
    default_template: String,
    sample_limit: usize,
}

impl DecedentExtractor {
    /// Registers the built-in templates. Fails when the configured default
    /// template is not among them.
    pub fn new(config: &ExtractionConfig) -> Result<Self, LinkError> {
        let mut extractor = Self {
            templates: BTreeMap::new(),
            default_template: config.default_template.clone(),
            sample_limit: config.sample_limit,
        };
        extractor.register(Box::new(LabeledTemplate));
        extractor.register(Box::new(CaseListingTemplate));

        if !extractor.templates.contains_key(&extractor.default_template) {
            return Err(LinkError::UnknownTemplate(format!(
                "{} (available: {})",
                extractor.default_template,
                extractor.template_ids().collect::<Vec<_>>().join(", ")
            )));
        }
        Ok(extractor)
    }

    /// Add or replace a template under its id.
    pub fn register(&mut self, template: Box<dyn BlockTemplate>) {
        self.templates.insert(template.id().to_string(), template);
    }

    pub fn template_ids(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    /// A fresh pass over `documents`. Case-number de-duplication is scoped
    /// to the pass.
    pub fn extract<'a>(&'a self, documents: &'a [SourceDocument]) -> Decedents<'a> {
        self.extract_excluding(documents, std::iter::empty::<String>())
    }

    /// A fresh pass that also skips the case numbers in `processed`, e.g.
    /// those handled by earlier runs. Skips count as duplicate blocks.
    pub fn extract_excluding<'a, I, S>(
        &'a self,
        documents: &'a [SourceDocument],
        processed: I,
    ) -> Decedents<'a>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Decedents {
            extractor: self,
            documents,
            doc: 0,
            block: 0,
            processed: processed.into_iter().map(Into::into).collect(),
            seen_cases: HashSet::new(),
            diagnostics: Diagnostics::with_sample_limit(self.sample_limit),
            emitted: 0,
            done: false,
        }
    }
}

/// Lazy decedent records from one extraction pass.
pub struct Decedents<'a> {
    extractor: &'a DecedentExtractor,
    documents: &'a [SourceDocument],
    doc: usize,
    block: usize,
    /// Cases from earlier runs.
    processed: HashSet<String>,
    seen_cases: HashSet<String>,
    diagnostics: Diagnostics,
    emitted: usize,
    done: bool,
}

impl Decedents<'_> {
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Case numbers extracted so far in this pass, unordered. Feed them to
    /// the next run's [`DecedentExtractor::extract_excluding`].
    pub fn cases_seen(&self) -> impl Iterator<Item = &str> {
        self.seen_cases.iter().map(String::as_str)
    }

    fn finish(&mut self) {
        if self.done {
            return;
        }
        self.done = true;
        let d = &self.diagnostics;
        log::info!(
            "extracted {} decedents from {} documents ({} blocks skipped, {} duplicate cases)",
            self.emitted,
            self.documents.len(),
            d.skipped_blocks,
            d.duplicate_blocks
        );
        if d.skipped_blocks > 0 {
            log::warn!("{} decedent blocks had no extractable name", d.skipped_blocks);
        }
    }

    fn extract_block(
        &mut self,
        doc: &SourceDocument,
        index: usize,
        template: &dyn BlockTemplate,
    ) -> Option<DecedentRecord> {
        let location = format!("{}:{}", doc.id, index);
        let fields = template.fields(&doc.blocks[index]);

        let raw_name = fields
            .name_lines
            .iter()
            .map(|(_, part)| part.trim())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if raw_name.is_empty() {
            self.diagnostics
                .record(DiagnosticKind::BlockSkipped, location, "no name found");
            return None;
        }

        if let Some(case) = &fields.case_id {
            if self.processed.contains(case) {
                self.diagnostics.record(
                    DiagnosticKind::DuplicateCase,
                    location,
                    format!("case {case} processed in an earlier run"),
                );
                return None;
            }
            if !self.seen_cases.insert(case.clone()) {
                self.diagnostics.record(
                    DiagnosticKind::DuplicateCase,
                    location,
                    format!("case {case} already extracted"),
                );
                return None;
            }
        }

        let name = normalize(&raw_name);
        if name.is_degraded() {
            self.diagnostics.record(
                DiagnosticKind::ParseDegraded,
                location.clone(),
                format!("name {raw_name:?}"),
            );
        }

        let age = match fields.age.as_deref().map(str::trim) {
            None | Some("") => Checked::Unknown,
            Some(text) => match parse_age(text) {
                Some(age) => age,
                None => {
                    self.diagnostics.record(
                        DiagnosticKind::ParseDegraded,
                        location.clone(),
                        format!("age {text:?}"),
                    );
                    Checked::Unknown
                }
            },
        };

        Some(DecedentRecord {
            id: location,
            name,
            age,
            source_document_id: doc.id.clone(),
            source_location: SourceLocation {
                block: index,
                line: fields.name_lines.first().map(|(line, _)| *line),
            },
            case_id: fields.case_id,
            document_date: doc.date,
        })
    }
}

impl Iterator for Decedents<'_> {
    type Item = DecedentRecord;

    fn next(&mut self) -> Option<DecedentRecord> {
        let documents = self.documents;
        let extractor = self.extractor;
        loop {
            let Some(doc) = documents.get(self.doc) else {
                self.finish();
                return None;
            };
            if self.block >= doc.blocks.len() {
                self.doc += 1;
                self.block = 0;
                continue;
            }
            let index = self.block;
            self.block += 1;

            let template_id = doc
                .template
                .as_deref()
                .unwrap_or(&extractor.default_template);
            let Some(template) = extractor.templates.get(template_id) else {
                if index == 0 {
                    log::warn!("document {}: unknown template '{template_id}'", doc.id);
                }
                self.diagnostics.record(
                    DiagnosticKind::BlockSkipped,
                    format!("{}:{}", doc.id, index),
                    format!("unknown template '{template_id}'"),
                );
                continue;
            };

            if let Some(record) = self.extract_block(doc, index, template.as_ref()) {
                self.emitted += 1;
                return Some(record);
            }
        }
    }
}

/// First integer in the age text; `None` when there is none.
fn parse_age(text: &str) -> Option<Checked<u8>> {
    let digits = age_number().find(text)?;
    digits.as_str().parse::<i64>().ok().map(Checked::<u8>::age)
}

/// Reads an `MMDDYYYY` run from a document file name, e.g.
/// `Decedents_List_10152024.pdf` → 2024-10-15.
pub fn document_date_from_name(name: &str) -> Option<NaiveDate> {
    let run = eight_digits().find(name)?;
    NaiveDate::parse_from_str(run.as_str(), "%m%d%Y").ok()
}

fn age_number() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"-?\d+").expect("age pattern"))
}

fn eight_digits() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d{8}").expect("date pattern"))
}
