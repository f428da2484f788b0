use std::sync::OnceLock;

use regex::Regex;

use super::{BlockFields, BlockTemplate};

/// `Label: value` blocks:
///
/// ```text
/// Name: Deshaun Nathaniel
///       Nickelberry
/// Age: 47
/// Case: 24-01236
/// ```
///
/// Unlabeled lines after `Name:` continue the name until the next label.
/// Several known labels may share a line (`Name: Mary Smith Age: 82`).
pub struct LabeledTemplate;

impl LabeledTemplate {
    pub const ID: &'static str = "labeled";
}

enum Label {
    Name,
    Age,
    Case,
    Other,
}

fn classify(label: &str) -> Label {
    match label.trim().to_ascii_lowercase().as_str() {
        "name" | "full name" | "decedent" => Label::Name,
        "age" => Label::Age,
        "case" | "case no" | "case number" | "case #" | "case id" => Label::Case,
        _ => Label::Other,
    }
}

fn label_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*([A-Za-z][A-Za-z #.]{0,20}?)\s*:\s*(.*?)\s*$").expect("label pattern")
    })
}

/// A known label anywhere in a line; used to split one-line layouts.
fn inline_label() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:full\s+name|name|decedent|age|case(?:\s+(?:no\.?|number|#|id))?)\s*:")
            .expect("inline label pattern")
    })
}

/// Cut `line` before every known label that does not open it.
fn split_inline(line: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    for m in inline_label().find_iter(line) {
        if !line[start..m.start()].trim().is_empty() {
            pieces.push(&line[start..m.start()]);
            start = m.start();
        }
    }
    pieces.push(&line[start..]);
    pieces
}

impl BlockTemplate for LabeledTemplate {
    fn id(&self) -> &str {
        Self::ID
    }

    fn fields(&self, block: &str) -> BlockFields {
        let mut fields = BlockFields::default();
        let mut in_name = false;

        for (i, line) in block.lines().enumerate() {
            let line_no = i + 1;
            for piece in split_inline(line) {
                let Some(caps) = label_line().captures(piece) else {
                    let text = piece.trim();
                    if in_name && !text.is_empty() {
                        fields.name_lines.push((line_no, text.to_string()));
                    }
                    continue;
                };
                let value = caps.get(2).map_or("", |m| m.as_str());
                let label = caps.get(1).map_or("", |m| m.as_str()).trim_end_matches('.');

                in_name = false;
                match classify(label) {
                    Label::Name => {
                        in_name = true;
                        if !value.is_empty() {
                            fields.name_lines.push((line_no, value.to_string()));
                        }
                    }
                    Label::Age if !value.is_empty() => fields.age = Some(value.to_string()),
                    Label::Case if !value.is_empty() => fields.case_id = Some(value.to_string()),
                    _ => {}
                }
            }
        }
        fields
    }
}
