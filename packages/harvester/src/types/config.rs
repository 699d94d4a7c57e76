//! Configuration types for harvesting and classification.

use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{HarvestError, HarvestResult};
use crate::types::record::Stance;

/// Default broad search terms for AI-related papers.
pub const DEFAULT_QUERY_TERMS: [&str; 2] = ["artificial intelligence", "AI"];

/// Default per-source record cap.
pub const DEFAULT_MAX_RECORDS: usize = 500;

/// What to harvest from every provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarvestQuery {
    /// Search terms, OR-ed together in provider syntax
    pub terms: Vec<String>,

    /// Earliest publication year to keep (inclusive)
    pub start_year: i32,

    /// Latest year considered by year-bucketed providers (inclusive).
    ///
    /// Defaults to the current year.
    pub end_year: i32,

    /// Maximum records yielded per provider
    pub max_records: usize,
}

impl Default for HarvestQuery {
    fn default() -> Self {
        let current_year = Utc::now().year();
        Self {
            terms: DEFAULT_QUERY_TERMS.iter().map(|t| t.to_string()).collect(),
            start_year: current_year - 5,
            end_year: current_year,
            max_records: DEFAULT_MAX_RECORDS,
        }
    }
}

impl HarvestQuery {
    /// Create a query for the given terms with default limits.
    pub fn new(terms: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            terms: terms.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_start_year(mut self, year: i32) -> Self {
        self.start_year = year;
        self
    }

    pub fn with_end_year(mut self, year: i32) -> Self {
        self.end_year = year;
        self
    }

    pub fn with_max_records(mut self, max_records: usize) -> Self {
        self.max_records = max_records;
        self
    }

    /// Reject queries no provider could serve.
    pub fn validate(&self) -> HarvestResult<()> {
        if self.terms.iter().all(|t| t.trim().is_empty()) {
            return Err(HarvestError::InvalidQuery {
                reason: "at least one non-empty search term is required".into(),
            });
        }
        if self.start_year > self.end_year {
            return Err(HarvestError::InvalidQuery {
                reason: format!(
                    "start year {} is after end year {}",
                    self.start_year, self.end_year
                ),
            });
        }
        Ok(())
    }

    /// Non-empty, trimmed terms.
    pub fn clean_terms(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().map(|t| t.trim()).filter(|t| !t.is_empty())
    }
}

/// Relevance gate settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelevanceConfig {
    /// Positive candidate label
    pub relevant_label: String,

    /// Negative candidate label
    pub irrelevant_label: String,

    /// Hypothesis template handed to the capability
    pub hypothesis_template: String,

    /// Texts per capability call
    pub batch_size: usize,
}

impl Default for RelevanceConfig {
    fn default() -> Self {
        Self {
            relevant_label: "Relevant to AI sentience".to_string(),
            irrelevant_label: "Not relevant".to_string(),
            hypothesis_template: "This example is {}.".to_string(),
            batch_size: 8,
        }
    }
}

impl RelevanceConfig {
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }
}

/// Hybrid stance classifier constants.
///
/// Boosts are additive and applied before re-normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StanceConfig {
    /// Template framing the claim; `{}` is replaced by each label
    pub hypothesis_template: String,

    /// Added to No when a No-leaning pattern matches
    pub no_boost: f32,

    /// Added to Yes when a Yes-leaning pattern matches
    pub yes_boost: f32,

    /// Added to Uncertain when a hedging pattern matches
    pub uncertain_boost: f32,

    /// Best scores below this are forced to Uncertain
    pub confidence_floor: f32,

    /// Yes/No gap under which an Uncertain winner is resolved to the higher side
    pub tie_band: f32,

    /// Lexical fallback confidences
    pub fallback_no_confidence: f32,
    pub fallback_yes_confidence: f32,
    pub fallback_uncertain_confidence: f32,

    /// Lexical fallback result when no pattern matches
    pub fallback_default: Stance,
    pub fallback_default_confidence: f32,

    /// Texts per capability call
    pub batch_size: usize,
}

impl Default for StanceConfig {
    fn default() -> Self {
        Self {
            hypothesis_template: "This text suggests that AI sentience is {}.".to_string(),
            no_boost: 0.25,
            yes_boost: 0.20,
            uncertain_boost: 0.05,
            confidence_floor: 0.4,
            tie_band: 0.15,
            fallback_no_confidence: 0.85,
            fallback_yes_confidence: 0.75,
            fallback_uncertain_confidence: 0.6,
            fallback_default: Stance::No,
            fallback_default_confidence: 0.55,
            batch_size: 8,
        }
    }
}

impl StanceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_boosts(mut self, yes: f32, no: f32, uncertain: f32) -> Self {
        self.yes_boost = yes;
        self.no_boost = no;
        self.uncertain_boost = uncertain;
        self
    }

    pub fn with_confidence_floor(mut self, floor: f32) -> Self {
        self.confidence_floor = floor;
        self
    }

    pub fn with_tie_band(mut self, band: f32) -> Self {
        self.tie_band = band;
        self
    }

    pub fn with_fallback_default(mut self, stance: Stance, confidence: f32) -> Self {
        self.fallback_default = stance;
        self.fallback_default_confidence = confidence;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }
}

/// Settings for a full harvest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarvestOptions {
    /// Per-adapter deadline in seconds
    pub adapter_timeout_secs: u64,

    /// Keywords kept per record
    pub keywords_per_record: usize,
}

impl Default for HarvestOptions {
    fn default() -> Self {
        Self {
            adapter_timeout_secs: 600,
            keywords_per_record: 8,
        }
    }
}

impl HarvestOptions {
    pub fn with_adapter_timeout(mut self, secs: u64) -> Self {
        self.adapter_timeout_secs = secs;
        self
    }

    pub fn with_keywords_per_record(mut self, top_k: usize) -> Self {
        self.keywords_per_record = top_k;
        self
    }
}
