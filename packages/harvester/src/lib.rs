//! Scholarly Harvester for the AI Sentience Debate
//!
//! Pulls titles and abstracts about artificial intelligence from several
//! open scholarly providers, keeps the ones a zero-shot model judges to be
//! about AI sentience or consciousness, enriches them, and stores them
//! deduplicated on `(source, external_id)`. A hybrid stance classifier then
//! labels each stored item Yes, No or Uncertain for aggregate views.
//!
//! # Usage
//!
//! ```rust,ignore
//! use harvester::{default_adapters, run_harvest, HarvestOptions, HarvestQuery};
//! use harvester::{HuggingFaceClassifier, RelevanceFilter, SqliteStore, Source};
//! use std::sync::Arc;
//!
//! let adapters = default_adapters(&Source::ALL)?;
//! let classifier = Arc::new(HuggingFaceClassifier::from_env()?);
//! let relevance = RelevanceFilter::new(classifier, 0.5);
//! let store = SqliteStore::open("./ai_opinion.sqlite").await?;
//!
//! let report = run_harvest(
//!     &adapters,
//!     &HarvestQuery::default(),
//!     &relevance,
//!     &store,
//!     &HarvestOptions::default(),
//! )
//! .await?;
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Seams for providers, transport, zero-shot inference and storage
//! - [`types`] - Records, stances and configuration
//! - [`sources`] - arXiv, OpenAlex, Crossref and PsyArXiv adapters
//! - [`classifiers`] - Hosted zero-shot inference and result caching
//! - [`pipeline`] - Collect, gate, enrich, classify, aggregate
//! - [`stores`] - Storage implementations (MemoryStore, SqliteStore)
//! - [`security`] - Credential handling
//! - [`testing`] - Mock implementations for testing

pub mod classifiers;
pub mod error;
pub mod pipeline;
pub mod security;
pub mod sources;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use error::{FetchError, HarvestError, HarvestResult};
pub use traits::{
    classifier::{ZeroShotClassifier, ZeroShotOutput},
    source::{RecordStream, SourceAdapter},
    store::{RecordStore, StoredRecord},
    transport::Transport,
};
pub use types::{
    config::{HarvestOptions, HarvestQuery, RelevanceConfig, StanceConfig},
    record::{Record, RecordKey, Source, Stance, StanceResult},
};

// Re-export pipeline components
pub use pipeline::{
    // Collection and orchestration
    collect, run_harvest, AdapterOutcome, Collection, HarvestReport,
    // Enrichment
    clean_text, enrich, extract_keywords_corpus, sentiment_compound,
    // Classification
    RelevanceFilter, StanceClassifier,
    // Views
    ClassifiedRecord, StanceView, ViewFilter, YearProportion,
};

// Re-export adapters
pub use sources::{default_adapters, HttpTransport, PagedSource, Provider};

// Re-export classifiers
pub use classifiers::HuggingFaceClassifier;
pub use security::{InferenceCredentials, SecretString};

// Re-export stores
pub use stores::{MemoryStore, SqliteStore};

// Re-export testing utilities
pub use testing::{MockClassifier, MockSource, MockTransport};
