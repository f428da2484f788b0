//! String similarity primitives shared by the index and the scorer.

use std::collections::BTreeSet;

/// Levenshtein distance over chars.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// `1 - distance / longer length`, case-insensitive. Two empty strings
/// carry no evidence and score 0.
pub fn edit_ratio(a: &str, b: &str) -> f64 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 0.0;
    }
    1.0 - levenshtein(&a, &b) as f64 / longest as f64
}

/// The string itself plus every single-char deletion of it. Two strings are
/// within edit distance 1 only if these sets intersect (the converse needs a
/// distance check: "ab"/"ba" share variants at distance 2).
pub fn deletion_variants(s: &str) -> BTreeSet<String> {
    let chars: Vec<char> = s.chars().collect();
    let mut out = BTreeSet::new();
    out.insert(s.to_string());
    for skip in 0..chars.len() {
        let variant: String = chars
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != skip)
            .map(|(_, c)| c)
            .collect();
        out.insert(variant);
    }
    out
}

/// Two given-name tokens agree when equal, or when one is a single-letter
/// initial of the other. Inputs are expected lower-cased.
pub fn tokens_compatible(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    let initial_of = |short: &str, long: &str| {
        let mut chars = short.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => long.starts_with(c),
            _ => false,
        }
    };
    initial_of(a, b) || initial_of(b, a)
}

/// Order-insensitive overlap of two token sets: tokens of the smaller set
/// that find a compatible partner, over the smaller set's size.
pub fn token_set_overlap(a: &[String], b: &[String]) -> f64 {
    let a: BTreeSet<&str> = a.iter().map(String::as_str).collect();
    let b: BTreeSet<&str> = b.iter().map(String::as_str).collect();
    let (small, large) = if a.len() <= b.len() { (&a, &b) } else { (&b, &a) };
    if small.is_empty() {
        return 0.0;
    }
    let matched = small
        .iter()
        .filter(|s| large.iter().any(|l| tokens_compatible(s, l)))
        .count();
    matched as f64 / small.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn levenshtein_basics() {
        assert_eq!(levenshtein("", ""), 0);
        assert_eq!(levenshtein("lee", ""), 3);
        assert_eq!(levenshtein("smith", "smyth"), 1);
        assert_eq!(levenshtein("o'brien-smith", "obrien-smith"), 1);
        assert_eq!(levenshtein("lee", "leigh"), 3);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
    }

    #[test]
    fn edit_ratio_is_case_insensitive() {
        assert_eq!(edit_ratio("SMITH", "smith"), 1.0);
        assert_eq!(edit_ratio("", ""), 0.0);
        assert_eq!(edit_ratio("abc", "xyz"), 0.0);
        let r = edit_ratio("O'Brien-Smith", "Obrien-Smith");
        assert!((r - 12.0 / 13.0).abs() < 1e-9);
    }

    #[test]
    fn deletion_variants_cover_distance_one() {
        let v = deletion_variants("lee");
        assert!(v.contains("lee"));
        assert!(v.contains("ee"));
        assert!(v.contains("le"));
        assert_eq!(v.len(), 3);
        // substitution: both sides share a deletion
        assert!(!deletion_variants("smith").is_disjoint(&deletion_variants("smyth")));
    }

    #[test]
    fn initials_are_compatible() {
        assert!(tokens_compatible("j", "joseph"));
        assert!(tokens_compatible("joseph", "j"));
        assert!(!tokens_compatible("jo", "joseph"));
        assert!(!tokens_compatible("k", "joseph"));
    }

    #[test]
    fn overlap_ignores_order_and_omitted_middles() {
        assert_eq!(token_set_overlap(&toks("john q"), &toks("q john")), 1.0);
        assert_eq!(token_set_overlap(&toks("john"), &toks("john quincy")), 1.0);
        assert_eq!(token_set_overlap(&toks("john quincy"), &toks("john q")), 1.0);
        assert_eq!(token_set_overlap(&toks("john paul"), &toks("peter paul")), 0.5);
        assert_eq!(token_set_overlap(&toks(""), &toks("mary")), 0.0);
    }
}
