//! Input adapters for the linkage engine: the registration extract loader
//! and decedent list extraction.
//!
//! Streams the delimited voter-registration extract and turns per-person text
//! blocks from decedent lists into records.

pub mod extract;
pub mod loader;
pub mod pipeline;

pub use extract::{
    document_date_from_name, split_case_blocks, BlockFields, BlockTemplate, DecedentExtractor,
    SourceDocument,
};
pub use loader::{RegistrationLoader, VoterRows};
pub use pipeline::{audit_registrations, run_pipeline, run_pipeline_excluding};
