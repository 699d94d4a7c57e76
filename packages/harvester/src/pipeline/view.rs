//! Stance view: the data behind the dashboard.
//!
//! Filters stored records the way the dashboard sidebar does, classifies
//! the visible ones, and aggregates them into a distribution, per-year
//! proportions and the most confident examples per stance. Rendering is
//! left to the caller.

use chrono::{Datelike, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

use crate::pipeline::stance::StanceClassifier;
use crate::types::record::{Record, Source, Stance, StanceResult};

/// Examples kept per stance.
pub const EXAMPLES_PER_STANCE: usize = 5;

/// Which stored records are visible.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewFilter {
    /// Only these providers; empty means all
    pub sources: Vec<Source>,

    /// Inclusive publication year range
    pub year_range: Option<(i32, i32)>,

    /// Case-insensitive substring of title or abstract
    pub search: Option<String>,

    /// Only the last N years before `current_year` (inclusive)
    pub recent_years: Option<i32>,

    pub current_year: i32,
}

impl Default for ViewFilter {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            year_range: None,
            search: None,
            recent_years: Some(5),
            current_year: Utc::now().year(),
        }
    }
}

impl ViewFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sources(mut self, sources: impl IntoIterator<Item = Source>) -> Self {
        self.sources = sources.into_iter().collect();
        self
    }

    pub fn with_year_range(mut self, from: i32, to: i32) -> Self {
        self.year_range = Some((from.min(to), from.max(to)));
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        let search = search.into();
        self.search = (!search.trim().is_empty()).then(|| search.trim().to_lowercase());
        self
    }

    pub fn with_recent_years(mut self, years: Option<i32>) -> Self {
        self.recent_years = years;
        self
    }

    pub fn with_current_year(mut self, year: i32) -> Self {
        self.current_year = year;
        self
    }

    /// Undated records never match.
    pub fn matches(&self, record: &Record) -> bool {
        let Some(year) = record.year() else {
            return false;
        };
        if self
            .recent_years
            .is_some_and(|n| year < self.current_year - n)
        {
            return false;
        }
        if !self.sources.is_empty() && !self.sources.contains(&record.source) {
            return false;
        }
        if let Some((from, to)) = self.year_range {
            if year < from || year > to {
                return false;
            }
        }
        if let Some(needle) = &self.search {
            let needle = needle.to_lowercase();
            if !record.title.to_lowercase().contains(&needle)
                && !record.abstract_text.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        true
    }
}

/// A visible record with its stance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedRecord {
    pub record: Record,
    pub stance: StanceResult,
}

/// Share of one stance among a year's records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearProportion {
    pub year: i32,
    pub stance: Stance,
    pub count: usize,
    pub proportion: f64,
}

/// Aggregated stance data for the visible records.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StanceView {
    pub rows: Vec<ClassifiedRecord>,

    /// Counts in display order (Yes, Uncertain, No)
    pub distribution: Vec<(Stance, usize)>,

    /// Per year ascending, stances in display order; absent combinations omitted
    pub by_year: Vec<YearProportion>,

    /// Most confident rows per stance, in display order
    pub examples: Vec<(Stance, Vec<ClassifiedRecord>)>,
}

impl StanceView {
    /// Filter `records`, classify what is visible and aggregate.
    pub async fn build(
        records: Vec<Record>,
        filter: &ViewFilter,
        classifier: &StanceClassifier,
    ) -> Self {
        let visible: Vec<Record> = records.into_iter().filter(|r| filter.matches(r)).collect();
        if visible.is_empty() {
            info!("No records visible for stance view");
            return Self::default();
        }

        let texts: Vec<String> = visible.iter().map(Record::document_text).collect();
        let stances = classifier.classify_batch(&texts).await;
        let rows: Vec<ClassifiedRecord> = visible
            .into_iter()
            .zip(stances)
            .map(|(record, stance)| ClassifiedRecord { record, stance })
            .collect();

        let view = Self::aggregate(rows);
        info!(
            records = view.rows.len(),
            lexical = classifier.is_lexical(),
            "Stance view built"
        );
        view
    }

    /// Aggregate already-classified rows.
    pub fn aggregate(rows: Vec<ClassifiedRecord>) -> Self {
        let distribution = Stance::DISPLAY_ORDER
            .iter()
            .map(|s| (*s, rows.iter().filter(|r| r.stance.stance == *s).count()))
            .collect();

        let mut per_year: BTreeMap<i32, BTreeMap<usize, usize>> = BTreeMap::new();
        for row in &rows {
            if let Some(year) = row.record.year() {
                let order = display_rank(row.stance.stance);
                *per_year.entry(year).or_default().entry(order).or_insert(0) += 1;
            }
        }
        let by_year = per_year
            .into_iter()
            .flat_map(|(year, counts)| {
                let total: usize = counts.values().sum();
                counts.into_iter().map(move |(rank, count)| YearProportion {
                    year,
                    stance: Stance::DISPLAY_ORDER[rank],
                    count,
                    proportion: count as f64 / total as f64,
                })
            })
            .collect();

        let examples = Stance::DISPLAY_ORDER
            .iter()
            .map(|s| {
                let mut subset: Vec<ClassifiedRecord> = rows
                    .iter()
                    .filter(|r| r.stance.stance == *s)
                    .cloned()
                    .collect();
                subset.sort_by(|a, b| b.stance.confidence.total_cmp(&a.stance.confidence));
                subset.truncate(EXAMPLES_PER_STANCE);
                (*s, subset)
            })
            .collect();

        Self {
            rows,
            distribution,
            by_year,
            examples,
        }
    }

    /// Nothing visible; distinct from an error.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn total(&self) -> usize {
        self.rows.len()
    }

    pub fn count(&self, stance: Stance) -> usize {
        self.distribution
            .iter()
            .find(|(s, _)| *s == stance)
            .map_or(0, |(_, n)| *n)
    }

    pub fn examples_for(&self, stance: Stance) -> &[ClassifiedRecord] {
        self.examples
            .iter()
            .find(|(s, _)| *s == stance)
            .map(|(_, rows)| rows.as_slice())
            .unwrap_or(&[])
    }
}

fn display_rank(stance: Stance) -> usize {
    Stance::DISPLAY_ORDER
        .iter()
        .position(|s| *s == stance)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::config::StanceConfig;
    use chrono::NaiveDate;

    fn dated(source: Source, id: &str, title: &str, year: i32) -> Record {
        Record::new(source, id, title).with_published(NaiveDate::from_ymd_opt(year, 3, 1).unwrap())
    }

    fn row(id: &str, year: i32, stance: Stance, confidence: f32) -> ClassifiedRecord {
        ClassifiedRecord {
            record: dated(Source::Arxiv, id, id, year),
            stance: StanceResult::new(stance, confidence),
        }
    }

    #[test]
    fn test_filter_rules() {
        let filter = ViewFilter::new()
            .with_current_year(2025)
            .with_sources([Source::Arxiv])
            .with_search("Sentience");

        assert!(filter.matches(&dated(Source::Arxiv, "1", "On machine sentience", 2023)));
        assert!(!filter.matches(&dated(Source::CrossRef, "2", "On machine sentience", 2023)));
        assert!(!filter.matches(&dated(Source::Arxiv, "3", "On machine sentience", 2019)));
        assert!(!filter.matches(&dated(Source::Arxiv, "4", "Protein folding", 2023)));
        assert!(!filter.matches(&Record::new(Source::Arxiv, "5", "Undated sentience")));

        let ranged = ViewFilter::new()
            .with_recent_years(None)
            .with_year_range(2024, 2021);
        assert!(ranged.matches(&dated(Source::OpenAlex, "6", "t", 2021)));
        assert!(!ranged.matches(&dated(Source::OpenAlex, "7", "t", 2025)));
    }

    #[test]
    fn test_aggregate_distribution_and_years() {
        let view = StanceView::aggregate(vec![
            row("a", 2023, Stance::No, 0.9),
            row("b", 2023, Stance::Yes, 0.7),
            row("c", 2023, Stance::No, 0.6),
            row("d", 2024, Stance::Uncertain, 0.3),
        ]);

        assert_eq!(
            view.distribution,
            vec![(Stance::Yes, 1), (Stance::Uncertain, 1), (Stance::No, 2)]
        );
        let y2023: Vec<(Stance, usize)> = view
            .by_year
            .iter()
            .filter(|p| p.year == 2023)
            .map(|p| (p.stance, p.count))
            .collect();
        assert_eq!(y2023, vec![(Stance::Yes, 1), (Stance::No, 2)]);

        let total: f64 = view.by_year.iter().filter(|p| p.year == 2023).map(|p| p.proportion).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_examples_top_five_by_confidence() {
        let rows = (0..7)
            .map(|i| row(&format!("n{i}"), 2024, Stance::No, 0.5 + i as f32 * 0.05))
            .collect();
        let view = StanceView::aggregate(rows);

        let examples = view.examples_for(Stance::No);
        assert_eq!(examples.len(), EXAMPLES_PER_STANCE);
        assert_eq!(examples[0].record.external_id, "n6");
        assert!(view.examples_for(Stance::Yes).is_empty());
    }

    #[tokio::test]
    async fn test_build_empty_view() {
        let classifier = StanceClassifier::lexical(StanceConfig::default());
        let view = StanceView::build(
            vec![Record::new(Source::Arxiv, "undated", "No date")],
            &ViewFilter::new(),
            &classifier,
        )
        .await;
        assert!(view.is_empty());
        assert_eq!(view.count(Stance::No), 0);
    }

    #[tokio::test]
    async fn test_build_classifies_visible_records() {
        let classifier = StanceClassifier::lexical(StanceConfig::default());
        let filter = ViewFilter::new().with_current_year(2025);
        let records = vec![
            dated(Source::Arxiv, "1", "Language models are not sentient", 2024),
            dated(Source::Arxiv, "2", "Toward machine consciousness", 2024),
        ];

        let view = StanceView::build(records, &filter, &classifier).await;
        assert_eq!(view.total(), 2);
        assert_eq!(view.count(Stance::No), 1);
        assert_eq!(view.count(Stance::Yes), 1);
    }
}
