use rollcheck_linkage::audit::{implausible_ages, AgeFinding};
use rollcheck_linkage::{CandidateIndex, LinkError, LinkageConfig, MatchReport};

use crate::extract::{DecedentExtractor, SourceDocument};
use crate::loader::RegistrationLoader;

/// Load the extract into an index, extract decedents and match them. Loader
/// and extractor diagnostics are folded into the report summary.
pub fn run_pipeline(
    config: &LinkageConfig,
    documents: &[SourceDocument],
    loader: &RegistrationLoader,
) -> Result<MatchReport, LinkError> {
    run_pipeline_excluding(config, documents, loader, std::iter::empty::<String>())
}

/// [`run_pipeline`] skipping decedents whose case number is in `processed`.
pub fn run_pipeline_excluding<I, S>(
    config: &LinkageConfig,
    documents: &[SourceDocument],
    loader: &RegistrationLoader,
    processed: I,
) -> Result<MatchReport, LinkError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let extractor = DecedentExtractor::new(&config.extraction)?;

    let mut voters = loader.records()?;
    let index = CandidateIndex::build(&mut voters, &config.index);

    let mut decedents = extractor.extract_excluding(documents, processed);
    let mut report = rollcheck_linkage::run(&mut decedents, &index, &config.matching);

    report.absorb(voters.diagnostics());
    report.absorb(decedents.diagnostics());
    Ok(report)
}

/// One pass over the extract listing registrations with an implausible
/// implied age.
pub fn audit_registrations(
    config: &LinkageConfig,
    loader: &RegistrationLoader,
    min_age: i64,
) -> Result<Vec<AgeFinding>, LinkError> {
    let voters = loader.records()?;
    Ok(implausible_ages(
        voters,
        config.matching.effective_reference_year(),
        min_age,
    ))
}
