//! Record types - the normalized scholarly item and its stance.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::pipeline::enrich::clean_text;

/// Upstream provider a record was harvested from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// arXiv preprint repository
    Arxiv,
    /// OpenAlex scholarly graph
    OpenAlex,
    /// Crossref citation registry
    CrossRef,
    /// PsyArXiv (OSF) discipline repository
    PsyArxiv,
}

impl Source {
    /// All known providers, in harvest order.
    pub const ALL: [Source; 4] = [
        Source::Arxiv,
        Source::OpenAlex,
        Source::CrossRef,
        Source::PsyArxiv,
    ];

    /// Stable storage key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Arxiv => "arxiv",
            Source::OpenAlex => "openalex",
            Source::CrossRef => "crossref",
            Source::PsyArxiv => "psyarxiv",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "arxiv" => Ok(Source::Arxiv),
            "openalex" => Ok(Source::OpenAlex),
            "crossref" => Ok(Source::CrossRef),
            "psyarxiv" => Ok(Source::PsyArxiv),
            other => Err(format!("unknown source: {other}")),
        }
    }
}

/// Natural key of a record: `(source, external_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordKey {
    pub source: Source,
    pub external_id: String,
}

/// A normalized scholarly item flowing through the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Provider identity
    pub source: Source,

    /// Provider-scoped unique identifier
    pub external_id: String,

    pub title: String,

    /// Abstract text, empty when the provider has none
    #[serde(rename = "abstract", default)]
    pub abstract_text: String,

    /// Author display names, in byline order
    #[serde(default)]
    pub authors: Vec<String>,

    pub url: String,

    pub venue: Option<String>,

    /// Publication date, absent when the provider gives none
    pub published: Option<NaiveDate>,

    /// Keywords assigned by enrichment
    pub topics: Option<Vec<String>>,

    /// VADER compound polarity in [-1, 1]
    pub sentiment_compound: Option<f64>,

    /// Winning relevance probability in [0, 1]
    pub relevance_score: Option<f32>,
}

impl Record {
    /// Create a record with identity and title; everything else defaults.
    pub fn new(source: Source, external_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            source,
            external_id: external_id.into(),
            title: title.into(),
            abstract_text: String::new(),
            authors: Vec::new(),
            url: String::new(),
            venue: None,
            published: None,
            topics: None,
            sentiment_compound: None,
            relevance_score: None,
        }
    }

    pub fn with_abstract(mut self, abstract_text: impl Into<String>) -> Self {
        self.abstract_text = abstract_text.into();
        self
    }

    pub fn with_authors(mut self, authors: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.authors = authors.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_venue(mut self, venue: impl Into<String>) -> Self {
        self.venue = Some(venue.into());
        self
    }

    pub fn with_published(mut self, published: NaiveDate) -> Self {
        self.published = Some(published);
        self
    }

    /// The natural key of this record.
    pub fn key(&self) -> RecordKey {
        RecordKey {
            source: self.source,
            external_id: self.external_id.clone(),
        }
    }

    /// Publication year, if the record is dated.
    pub fn year(&self) -> Option<i32> {
        self.published.map(|d| d.year())
    }

    /// Cleaned `title. abstract` text used for scoring and classification.
    pub fn document_text(&self) -> String {
        clean_text(&format!("{}. {}", self.title, self.abstract_text))
    }
}

/// Three-way stance on whether AI is sentient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stance {
    Yes,
    No,
    Uncertain,
}

impl Stance {
    /// Candidate label order passed to the zero-shot capability.
    pub const LABELS: [Stance; 3] = [Stance::Yes, Stance::No, Stance::Uncertain];

    /// Display order used by aggregate views.
    pub const DISPLAY_ORDER: [Stance; 3] = [Stance::Yes, Stance::Uncertain, Stance::No];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stance::Yes => "Yes",
            Stance::No => "No",
            Stance::Uncertain => "Uncertain",
        }
    }

    /// Parse a zero-shot label back into a stance.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Yes" => Some(Stance::Yes),
            "No" => Some(Stance::No),
            "Uncertain" => Some(Stance::Uncertain),
            _ => None,
        }
    }
}

impl fmt::Display for Stance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final stance label with its confidence in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StanceResult {
    pub stance: Stance,
    pub confidence: f32,
}

impl StanceResult {
    pub fn new(stance: Stance, confidence: f32) -> Self {
        Self {
            stance,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_round_trips_through_str() {
        for source in Source::ALL {
            assert_eq!(source.as_str().parse::<Source>().unwrap(), source);
        }
        assert_eq!("CrossRef".parse::<Source>().unwrap(), Source::CrossRef);
        assert!("pubmed".parse::<Source>().is_err());
    }

    #[test]
    fn test_record_builder_and_key() {
        let record = Record::new(Source::Arxiv, "2401.00001", "Machine minds")
            .with_abstract("An essay.")
            .with_authors(["A. Turing", "J. Searle"])
            .with_published(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());

        assert_eq!(record.year(), Some(2024));
        assert_eq!(record.authors.len(), 2);
        assert_eq!(
            record.key(),
            RecordKey {
                source: Source::Arxiv,
                external_id: "2401.00001".to_string()
            }
        );
    }

    #[test]
    fn test_document_text_strips_citations() {
        let record = Record::new(Source::OpenAlex, "W1", "Title")
            .with_abstract("Some   claim [12] about   minds.");
        assert_eq!(record.document_text(), "Title. Some claim about minds.");
    }

    #[test]
    fn test_stance_result_clamps_confidence() {
        assert_eq!(StanceResult::new(Stance::Yes, 1.2).confidence, 1.0);
        assert_eq!(StanceResult::new(Stance::No, -0.1).confidence, 0.0);
    }
}
