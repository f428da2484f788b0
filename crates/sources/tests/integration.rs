use std::io::Write;
use std::path::PathBuf;

use chrono::NaiveDate;
use rollcheck_linkage::model::{Checked, MatchSignal, RegistrationStatus, Suffix};
use rollcheck_linkage::{LinkError, LinkageConfig, MatchReport};
use rollcheck_sources::{
    audit_registrations, run_pipeline, run_pipeline_excluding, RegistrationLoader, SourceDocument,
};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn fixture_config(name: &str) -> LinkageConfig {
    let toml = std::fs::read_to_string(fixtures_dir().join(name)).unwrap();
    LinkageConfig::from_toml(&toml).unwrap()
}

fn case_listing() -> SourceDocument {
    let name = "Decedents_List_12312024.txt";
    let page = std::fs::read_to_string(fixtures_dir().join(name)).unwrap();
    SourceDocument::from_case_pages(name, &[page])
}

fn run_fixture() -> MatchReport {
    let config = fixture_config("rollcheck.toml");
    let loader = RegistrationLoader::open(fixtures_dir().join("voters.txt"), &config).unwrap();
    run_pipeline(&config, &[case_listing()], &loader).unwrap()
}

fn voters_for<'r>(report: &'r MatchReport, case: &str) -> Vec<&'r str> {
    report
        .candidates
        .iter()
        .filter(|c| c.decedent_id == case)
        .map(|c| c.voter_id.as_str())
        .collect()
}

// -------------------------------------------------------------------------
// End-to-end
// -------------------------------------------------------------------------

#[test]
fn case_listing_against_pipe_extract() {
    let report = run_fixture();

    assert_eq!(report.meta.reference_year, 2024);
    assert_eq!(report.summary.decedents, 5);
    assert_eq!(report.summary.matched_decedents, 4);
    assert_eq!(report.summary.unmatched_decedent_count, 1);
    assert_eq!(report.summary.ambiguous_decedents, 1);
    assert_eq!(report.summary.candidates, 5);
    assert_eq!(report.summary.voters_indexed, 8);

    let doc = "Decedents_List_12312024.txt";
    assert_eq!(voters_for(&report, &format!("{doc}:0")), vec!["WA0000001"]);
    assert_eq!(voters_for(&report, &format!("{doc}:1")), vec!["WA0000002"]);
    assert_eq!(voters_for(&report, &format!("{doc}:2")), vec!["WA0000003"]);
    assert_eq!(voters_for(&report, &format!("{doc}:3")), vec!["WA0000004", "WA0000005"]);

    assert_eq!(report.unmatched.len(), 1);
    assert_eq!(report.unmatched[0].decedent_id, format!("{doc}:4"));
    assert_eq!(report.unmatched[0].name, "Coonradt, Addison");
    assert_eq!(report.unmatched[0].candidates_considered, 0);
}

#[test]
fn apostrophe_variant_matches_on_every_signal() {
    let report = run_fixture();
    let mary = report
        .candidates
        .iter()
        .find(|c| c.voter_id == "WA0000002")
        .unwrap();
    assert!(mary.score >= 0.9, "score {}", mary.score);
    assert_eq!(
        mary.matched_on.iter().copied().collect::<Vec<_>>(),
        vec![MatchSignal::FamilyName, MatchSignal::GivenName, MatchSignal::AgeConsistency]
    );
    assert!(!mary.ambiguity_flag);
}

#[test]
fn robert_lee_ties_are_flagged_and_leigh_is_not_a_candidate() {
    let report = run_fixture();
    let lees: Vec<_> = report
        .candidates
        .iter()
        .filter(|c| c.decedent_id.ends_with(":3"))
        .collect();
    assert_eq!(lees.len(), 2);
    assert!(lees.iter().all(|c| c.ambiguity_flag));
    assert!((lees[0].score - lees[1].score).abs() <= 0.02);
    assert!(report.candidates.iter().all(|c| c.voter_id != "WA0000006"));
}

#[test]
fn diagnostics_from_both_sources_reach_the_summary() {
    let report = run_fixture();
    let diag = report.diagnostics();
    assert_eq!(diag.skipped_rows, 1);
    assert_eq!(diag.duplicate_blocks, 1);
    assert_eq!(diag.skipped_blocks, 0);
    assert!(diag
        .samples
        .iter()
        .any(|s| s.location == "line 8" && s.detail.contains("expected 9 columns, found 8")));
}

#[test]
fn cases_from_an_earlier_run_are_not_matched_again() {
    let config = fixture_config("rollcheck.toml");
    let loader = RegistrationLoader::open(fixtures_dir().join("voters.txt"), &config).unwrap();
    let report =
        run_pipeline_excluding(&config, &[case_listing()], &loader, ["24-01237"]).unwrap();

    assert_eq!(report.summary.decedents, 4);
    assert_eq!(report.summary.ambiguous_decedents, 0);
    assert_eq!(report.diagnostics().duplicate_blocks, 2);
    assert!(report.candidates.iter().all(|c| c.voter_id != "WA0000004"));
}

#[test]
fn rerun_gives_identical_candidates() {
    let first = run_fixture();
    let second = run_fixture();
    assert_eq!(first.candidates, second.candidates);
    assert_eq!(first.unmatched, second.unmatched);
    assert_eq!(first.summary, second.summary);
}

#[test]
fn report_json_contract() {
    let report = run_fixture();
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["meta"]["reference_year"], 2024);
    assert_eq!(json["meta"]["engine_version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(json["summary"]["diagnostics"]["skipped_rows"], 1);
    let first = &json["candidates"][0];
    assert_eq!(first["decedent_id"], "Decedents_List_12312024.txt:0");
    assert_eq!(first["breakdown"]["age"]["outcome"], "consistent");
    assert_eq!(first["breakdown"]["age"]["delta_years"], 0);
}

// -------------------------------------------------------------------------
// Loader
// -------------------------------------------------------------------------

#[test]
fn passthrough_columns_are_kept() {
    let config = fixture_config("rollcheck.toml");
    let loader = RegistrationLoader::open(fixtures_dir().join("voters.txt"), &config).unwrap();
    let voters: Vec<_> = loader.records().unwrap().collect();
    assert_eq!(voters[4].residual.get("RegStCity").map(String::as_str), Some("RENTON"));
    assert_eq!(voters[4].residual.len(), 1);
}

#[test]
fn ten_column_extract_skips_short_row() {
    let config = fixture_config("ten_column.toml");
    let loader =
        RegistrationLoader::open(fixtures_dir().join("voters_10col.csv"), &config).unwrap();
    let mut rows = loader.records().unwrap();
    let voters: Vec<_> = rows.by_ref().collect();

    assert_eq!(voters.len(), 2);
    assert_eq!(voters[0].voter_id, "1001");
    assert_eq!(voters[0].name.middle, vec!["A"]);
    assert_eq!(voters[1].voter_id, "1003");
    assert_eq!(voters[1].name.suffix, Some(Suffix::III));
    assert_eq!(voters[1].registration_status, RegistrationStatus::Inactive);
    assert_eq!(voters[1].residual.get("column_9").map(String::as_str), Some("PIERCE"));

    let diag = rows.diagnostics();
    assert_eq!(diag.skipped_rows, 1);
    assert_eq!(diag.samples[0].location, "line 2");
    assert!(diag.samples[0].detail.contains("expected 10 columns, found 3"));
}

#[test]
fn records_restart_on_every_call() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "StateVoterID|FName|MName|LName|NameSuffix|Birthyear|StatusCode").unwrap();
    writeln!(file, "WA1|ANN||LEE||1950|A").unwrap();
    writeln!(file, "WA2|BOB||LEE||1951|A").unwrap();
    file.flush().unwrap();

    let config = fixture_config("rollcheck.toml");
    let config = LinkageConfig {
        registration: rollcheck_linkage::config::RegistrationConfig {
            passthrough: Vec::new(),
            ..config.registration
        },
        ..config
    };
    let loader = RegistrationLoader::open(file.path(), &config).unwrap();
    assert_eq!(loader.records().unwrap().count(), 2);
    assert_eq!(loader.records().unwrap().count(), 2);
}

#[test]
fn missing_file_is_an_io_error() {
    let config = LinkageConfig::default();
    let err = RegistrationLoader::open(fixtures_dir().join("nope.txt"), &config).unwrap_err();
    assert!(matches!(err, LinkError::Io(ref msg) if msg.contains("nope.txt")));
}

#[test]
fn missing_passthrough_column_is_fatal() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "StateVoterID|FName|MName|LName|NameSuffix|Birthyear|StatusCode").unwrap();
    file.flush().unwrap();

    let config = fixture_config("rollcheck.toml");
    let err = RegistrationLoader::open(file.path(), &config).unwrap_err();
    assert!(matches!(err, LinkError::MissingColumn { ref column } if column == "RegStCity"));
}

// -------------------------------------------------------------------------
// Age audit
// -------------------------------------------------------------------------

#[test]
fn ancient_registrations_are_listed() {
    let config = fixture_config("rollcheck.toml");
    let loader = RegistrationLoader::open(fixtures_dir().join("voters.txt"), &config).unwrap();
    let findings = audit_registrations(&config, &loader, 120).unwrap();
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].voter_id, "WA0000008");
    assert_eq!(findings[0].birth_year, Checked::Invalid(1815));
    assert_eq!(findings[0].implied_age, 209);
}

#[test]
fn document_date_comes_from_file_name() {
    let doc = case_listing();
    assert_eq!(doc.date, NaiveDate::from_ymd_opt(2024, 12, 31));
    assert_eq!(doc.blocks.len(), 6);
}
