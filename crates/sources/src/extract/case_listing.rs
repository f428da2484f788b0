//! Medical-examiner case listings.
//!
//! Each person starts with a case number (`24-01234`). The name follows it
//! and runs up to `NN years`; parts that wrapped onto later lines sit between
//! the age and `Date of Incident`, mixed with metadata lines.

use std::sync::OnceLock;

use regex::Regex;

use super::{BlockFields, BlockTemplate};

/// Lines containing any of these are metadata, never name parts.
const METADATA_MARKERS: &[&str] = &["years", "male", "female", "seattle"];

const INCIDENT_MARKER: &str = "date of incident";

pub struct CaseListingTemplate;

impl CaseListingTemplate {
    pub const ID: &'static str = "case_listing";
}

fn case_number() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b\d{2}-\d{5}\b").expect("case number pattern"))
}

fn age_years() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(\d+)\s*years").expect("age pattern"))
}

/// Segment page text into one block per case number. Text before the first
/// case number is dropped.
pub fn split_case_blocks(page: &str) -> Vec<String> {
    let starts: Vec<usize> = case_number().find_iter(page).map(|m| m.start()).collect();
    starts
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = starts.get(i + 1).copied().unwrap_or(page.len());
            page[start..end].to_string()
        })
        .collect()
}

/// 1-based line of byte offset `at` within `text`.
fn line_of(text: &str, at: usize) -> usize {
    text[..at].matches('\n').count() + 1
}

/// Drop digits and collapse whitespace.
fn clean_name_part(part: &str) -> String {
    part.split_whitespace()
        .map(|w| w.chars().filter(|c| !c.is_ascii_digit()).collect::<String>())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn push_part(fields: &mut BlockFields, line: usize, text: &str) {
    let cleaned = clean_name_part(text);
    if !cleaned.is_empty() {
        fields.name_lines.push((line, cleaned));
    }
}

impl BlockTemplate for CaseListingTemplate {
    fn id(&self) -> &str {
        Self::ID
    }

    fn fields(&self, block: &str) -> BlockFields {
        let mut fields = BlockFields::default();
        let Some(case) = case_number().find(block) else {
            return fields;
        };
        fields.case_id = Some(case.as_str().to_string());

        let lower = block.to_ascii_lowercase();
        let incident = lower[case.end()..]
            .find(INCIDENT_MARKER)
            .map(|i| case.end() + i);
        let age = age_years().captures(&block[case.end()..]);

        let name_end = match &age {
            Some(caps) => case.end() + caps.get(0).map_or(0, |m| m.start()),
            None => incident.unwrap_or(block.len()),
        };
        if let Some(caps) = &age {
            fields.age = caps.get(1).map(|m| m.as_str().to_string());
        }

        let first_line = line_of(block, case.end());
        for (i, text) in block[case.end()..name_end].split('\n').enumerate() {
            push_part(&mut fields, first_line + i, text);
        }

        // Wrapped name parts between the age and the incident line.
        if let (Some(_), Some(incident)) = (&age, incident) {
            if incident > name_end {
                let tail_line = line_of(block, name_end);
                for (i, text) in block[name_end..incident].split('\n').enumerate() {
                    let text = text.trim();
                    let lowered = text.to_lowercase();
                    if text.is_empty()
                        || text.starts_with(|c: char| c.is_ascii_digit())
                        || METADATA_MARKERS.iter().any(|m| lowered.contains(m))
                    {
                        continue;
                    }
                    push_part(&mut fields, tail_line + i, text);
                }
            }
        }
        fields
    }
}
