//! The harvest-merge-classify pipeline.
//!
//! - [`collect`] - run adapters concurrently with per-adapter deadlines
//! - [`relevance`] - zero-shot relevance gate
//! - [`enrich`] / [`keywords`] - cleaning, sentiment, corpus keywords
//! - [`stance`] / [`patterns`] - hybrid stance classification
//! - [`view`] - dashboard aggregates
//! - [`harvest`] - end-to-end orchestration

pub mod collect;
pub mod enrich;
pub mod harvest;
pub mod keywords;
pub mod patterns;
pub mod relevance;
pub mod stance;
pub mod view;

pub use collect::{collect, AdapterOutcome, Collection};
pub use enrich::{clean_text, enrich, sentiment_compound};
pub use harvest::{run_harvest, HarvestReport};
pub use keywords::extract_keywords_corpus;
pub use patterns::PatternHits;
pub use relevance::RelevanceFilter;
pub use stance::{decide, fuse, lexical_fallback, FusedScores, StanceClassifier};
pub use view::{ClassifiedRecord, StanceView, ViewFilter, YearProportion};
