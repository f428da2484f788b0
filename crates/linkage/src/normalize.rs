//! Free-form person name text → [`PersonName`].
//!
//! Handles "First Middle Last" and "Last, First Middle" orders, trailing
//! generational suffixes, hyphenated and particle surnames, and OCR residue.
//! Never fails: anything that is not a name token goes to `unparsed`.

use crate::model::{NameQuality, PersonName, Suffix};

/// Separator punctuation stripped between tokens.
const SEPARATORS: &[char] = &[',', '.', ';', ':'];

/// Lower-case surname particles joined onto the family name in natural order.
const PARTICLES: &[&str] = &[
    "van", "von", "de", "del", "della", "der", "den", "da", "di", "du", "la", "le", "st", "ter",
];

/// Normalize a raw name string.
pub fn normalize(raw: &str) -> PersonName {
    let folded = raw.replace(['\u{2018}', '\u{2019}', '`'], "'");
    let mut unparsed = Vec::new();

    let (family_side, given_side) = match folded.split_once(',') {
        Some((left, right)) => (Some(left), right),
        None => (None, folded.as_str()),
    };
    // Scan in source order so `unparsed` keeps it.
    let family_tokens = family_side.map(|side| scan(side, &mut unparsed));
    let given_tokens = scan(given_side, &mut unparsed);

    let (given, middle, family, suffix) = match family_tokens {
        Some(family_tokens) if !family_tokens.is_empty() => {
            split_comma_order(family_tokens, given_tokens)
        }
        Some(_) | None => split_natural_order(given_tokens),
    };

    let quality = if family.is_empty() || !unparsed.is_empty() {
        NameQuality::Degraded
    } else {
        NameQuality::Clean
    };

    PersonName {
        given,
        middle,
        family,
        suffix,
        raw_text: raw.to_string(),
        unparsed,
        quality,
    }
}

/// Build a name from separate registration columns through the same rules.
pub fn normalize_parts(given: &str, middle: &str, family: &str, suffix: &str) -> PersonName {
    let family = family.replace(',', " ");
    let rest = [given, middle, suffix]
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    let mut name = normalize(&format!("{}, {}", family.trim(), rest));
    name.raw_text = [given, middle, family.as_str(), suffix]
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    name
}

type Split = (String, Vec<String>, String, Option<Suffix>);

fn split_comma_order(mut family: Vec<String>, mut given: Vec<String>) -> Split {
    let suffix = take_trailing_suffix(&mut given, family.len(), false)
        .or_else(|| take_trailing_suffix(&mut family, given.len(), true));

    let mut given = given.into_iter();
    let first = given.next().unwrap_or_default();
    (first, given.collect(), family.join(" "), suffix)
}

fn split_natural_order(mut tokens: Vec<String>) -> Split {
    let suffix = take_trailing_suffix(&mut tokens, 0, true);

    match tokens.len() {
        0 => (String::new(), Vec::new(), String::new(), suffix),
        1 => (String::new(), Vec::new(), tokens.remove(0), suffix),
        n => {
            // Family starts at the last token and absorbs particles before it,
            // never the given name.
            let mut start = n - 1;
            while start > 1 && is_particle(&tokens[start - 1]) {
                start -= 1;
            }
            let family = tokens.split_off(start).join(" ");
            let mut rest = tokens.into_iter();
            let given = rest.next().unwrap_or_default();
            (given, rest.collect(), family, suffix)
        }
    }
}

/// Pop a trailing suffix when enough parseable tokens remain without it.
/// `others` counts tokens outside `tokens`; `keep_one` forbids emptying it.
fn take_trailing_suffix(tokens: &mut Vec<String>, others: usize, keep_one: bool) -> Option<Suffix> {
    let suffix = Suffix::from_token(tokens.last()?)?;
    let remaining = tokens.len() - 1 + others;
    if (keep_one && tokens.len() < 2) || remaining < suffix.min_companions() {
        return None;
    }
    tokens.pop();
    Some(suffix)
}

fn is_particle(token: &str) -> bool {
    let lower = token.to_lowercase();
    PARTICLES.contains(&lower.as_str())
}

/// Split one side of the name into canonical-cased tokens. Tokens with
/// anything other than letters, apostrophes and hyphens go to `unparsed`,
/// unless they spell a suffix.
fn scan(side: &str, unparsed: &mut Vec<String>) -> Vec<String> {
    let mut tokens = Vec::new();
    for word in side.split(|c: char| c.is_whitespace() || SEPARATORS.contains(&c)) {
        let word = word.trim_matches(|c| c == '-' || c == '\'');
        if word.is_empty() {
            continue;
        }
        if let Some(suffix) = Suffix::from_token(word) {
            // Suffix spellings, ordinals included, in canonical form wherever
            // they land.
            tokens.push(suffix.to_string());
        } else if word.chars().all(|c| c.is_alphabetic() || c == '-' || c == '\'') {
            tokens.push(canonical_case(word));
        } else {
            unparsed.push(word.to_string());
        }
    }
    tokens
}

/// Upper-case the first letter of each hyphen/apostrophe segment, lower-case
/// the rest. Characters whose case mapping is not one char are left alone.
fn canonical_case(token: &str) -> String {
    let mut out = String::with_capacity(token.len());
    let mut boundary = true;
    for c in token.chars() {
        out.push(if boundary { single_upper(c) } else { single_lower(c) });
        boundary = c == '-' || c == '\'';
    }
    out
}

fn single_upper(c: char) -> char {
    let mut it = c.to_uppercase();
    match (it.next(), it.next()) {
        (Some(u), None) => u,
        _ => c,
    }
}

fn single_lower(c: char) -> char {
    let mut it = c.to_lowercase();
    match (it.next(), it.next()) {
        (Some(l), None) => l,
        _ => c,
    }
}
