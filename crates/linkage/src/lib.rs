//! Name-and-age matching engine for decedent list maintenance.
//!
//! Pure engine crate: receives decedent and voter records, returns ranked,
//! explainable match candidates. File formats and text templates live in
//! `rollcheck-sources`.

pub mod audit;
pub mod config;
pub mod engine;
pub mod error;
pub mod index;
pub mod model;
pub mod normalize;
pub mod scorer;
pub mod similarity;
pub mod summary;

pub use config::LinkageConfig;
pub use engine::{run, MatchEngine};
pub use error::LinkError;
pub use index::CandidateIndex;
pub use model::{DecedentRecord, MatchCandidate, MatchReport, PersonName, VoterRecord};
pub use normalize::{normalize, normalize_parts};
pub use scorer::MatchScorer;
