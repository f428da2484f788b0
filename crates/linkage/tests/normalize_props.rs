// Property-based tests for name normalization.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use proptest::prelude::*;
use rollcheck_linkage::model::Suffix;
use rollcheck_linkage::normalize;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn config_256() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

fn arb_given() -> impl Strategy<Value = String> {
    prop::sample::select(vec![
        "mary", "john", "robert", "Scott", "ANNE", "josiah", "Kim", "J", "q", "Lee",
    ])
    .prop_map(String::from)
}

fn arb_family() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => prop::sample::select(vec!["smith", "PETERS", "Talai", "o'brien", "Lee", "Nguyen"])
            .prop_map(String::from),
        1 => (r"[a-z]{2,8}", r"[a-z]{2,8}").prop_map(|(a, b)| format!("{a}-{b}")),
    ]
}

fn arb_suffix() -> impl Strategy<Value = (&'static str, Suffix)> {
    prop::sample::select(vec![
        ("Jr", Suffix::Jr),
        ("SR.", Suffix::Sr),
        ("II", Suffix::II),
        ("iii", Suffix::III),
        ("IV", Suffix::IV),
        ("3rd", Suffix::III),
    ])
}

/// A well-formed name in one of the two accepted orders.
fn arb_name() -> impl Strategy<Value = String> {
    (
        arb_given(),
        proptest::collection::vec(arb_given(), 0..3),
        arb_family(),
        proptest::option::of(arb_suffix()),
        any::<bool>(),
    )
        .prop_map(|(given, middle, family, suffix, comma)| {
            let mut rest = vec![given];
            rest.extend(middle);
            if let Some((s, _)) = suffix {
                rest.push(s.to_string());
            }
            if comma {
                format!("{}, {}", family, rest.join(" "))
            } else {
                let suffix = if suffix.is_some() { rest.pop() } else { None };
                let mut parts = rest;
                parts.push(family);
                parts.extend(suffix);
                parts.join(" ")
            }
        })
}

fn word_count(raw: &str) -> usize {
    raw.split(|c: char| c.is_whitespace() || matches!(c, ',' | '.' | ';' | ':'))
        .map(|w| w.trim_matches(|c| c == '-' || c == '\''))
        .filter(|w| !w.is_empty())
        .count()
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]

    #[test]
    fn canonical_rendering_is_a_fixed_point(raw in arb_name()) {
        let first = normalize(&raw);
        let second = normalize(&first.canonical());
        prop_assert!(first.eq_ignoring_raw(&second), "{:?} vs {:?}", first, second);
        prop_assert_eq!(first.canonical(), second.canonical());
    }

    #[test]
    fn trailing_suffix_is_extracted(
        given in arb_given(),
        family in arb_family(),
        (spelling, suffix) in arb_suffix(),
    ) {
        let name = normalize(&format!("{given} {family} {spelling}"));
        prop_assert_eq!(name.suffix, Some(suffix));
        prop_assert_eq!(name.family.to_lowercase(), family.to_lowercase());
    }

    #[test]
    fn hyphenated_family_is_never_split(
        given in arb_given(),
        a in r"[a-z]{2,8}",
        b in r"[a-z]{2,8}",
        comma in any::<bool>(),
    ) {
        let family = format!("{a}-{b}");
        let raw = if comma { format!("{family}, {given}") } else { format!("{given} {family}") };
        let name = normalize(&raw);
        prop_assert_eq!(name.family.to_lowercase(), family);
        prop_assert!(name.middle.is_empty());
    }

    #[test]
    fn arbitrary_text_renders_to_a_fixed_point(raw in r"[A-Za-z ,.'\-0-9]{0,40}") {
        let first = normalize(&raw);
        let second = normalize(&first.canonical());
        prop_assert!(
            first.eq_ignoring_raw(&second),
            "{:?} rendered {:?} reparsed {:?}",
            first,
            first.canonical(),
            second
        );
    }

    #[test]
    fn suffix_words_render_to_a_fixed_point(
        words in proptest::collection::vec(
            prop::sample::select(vec!["v", "iii", "Jr", "3rd", "ii", "smith", "ann", "de"]),
            0..5,
        ),
        comma_at in proptest::option::of(0usize..5),
    ) {
        let mut parts: Vec<String> = words.iter().map(|w| w.to_string()).collect();
        if let Some(at) = comma_at {
            let at = at.min(parts.len());
            parts.insert(at, ",".to_string());
        }
        let raw = parts.join(" ");
        let first = normalize(&raw);
        let second = normalize(&first.canonical());
        prop_assert!(first.eq_ignoring_raw(&second), "{:?} vs {:?}", first, second);
    }

    #[test]
    fn arbitrary_text_keeps_every_token(raw in r"[A-Za-z ,.'\-0-9]{0,40}") {
        let name = normalize(&raw);
        prop_assert_eq!(&name.raw_text, &raw);

        let family_tokens = name.family.split(' ').filter(|t| !t.is_empty()).count();
        let kept = usize::from(!name.given.is_empty())
            + name.middle.len()
            + family_tokens
            + usize::from(name.suffix.is_some())
            + name.unparsed.len();
        prop_assert_eq!(kept, word_count(&raw));

        // Anything parseable yields a family name.
        if kept > name.unparsed.len() {
            prop_assert!(!name.family.is_empty());
        }
    }
}
