//! Harvest orchestration: collect, gate, enrich, store.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::error::HarvestResult;
use crate::pipeline::collect::{collect, AdapterOutcome};
use crate::pipeline::enrich::enrich;
use crate::pipeline::relevance::RelevanceFilter;
use crate::traits::source::SourceAdapter;
use crate::traits::store::RecordStore;
use crate::types::config::{HarvestOptions, HarvestQuery};
use crate::types::record::Source;

/// Per-run summary.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HarvestReport {
    /// One entry per adapter, in adapter order
    pub outcomes: Vec<AdapterOutcome>,

    /// Records collected before the relevance gate
    pub collected: usize,

    /// Records that passed the relevance gate
    pub relevant: usize,

    /// Records written to the store
    pub stored: usize,
}

impl HarvestReport {
    pub fn collected_by_source(&self) -> BTreeMap<Source, usize> {
        self.outcomes
            .iter()
            .map(|o| (o.source, o.records))
            .collect()
    }

    pub fn failed_sources(&self) -> Vec<Source> {
        self.outcomes
            .iter()
            .filter(|o| !o.is_ok())
            .map(|o| o.source)
            .collect()
    }
}

/// Run one harvest end to end.
///
/// Adapter failures are reported, not raised. A relevance classifier
/// failure aborts the run before anything is stored.
pub async fn run_harvest(
    adapters: &[Arc<dyn SourceAdapter>],
    query: &HarvestQuery,
    relevance: &RelevanceFilter,
    store: &dyn RecordStore,
    options: &HarvestOptions,
) -> HarvestResult<HarvestReport> {
    query.validate()?;

    info!(
        terms = ?query.terms,
        start_year = query.start_year,
        max_records = query.max_records,
        adapters = adapters.len(),
        "Starting harvest"
    );

    let collection = collect(
        adapters,
        query,
        Duration::from_secs(options.adapter_timeout_secs),
    )
    .await;

    let mut report = HarvestReport {
        collected: collection.records.len(),
        outcomes: collection.outcomes,
        ..Default::default()
    };
    if collection.records.is_empty() {
        info!("Nothing collected, skipping relevance and storage");
        return Ok(report);
    }

    let mut relevant = relevance.apply(collection.records).await?;
    report.relevant = relevant.len();

    enrich(&mut relevant, options.keywords_per_record);
    report.stored = store.upsert(&relevant).await?;

    info!(
        collected = report.collected,
        relevant = report.relevant,
        stored = report.stored,
        "Harvest finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::MemoryStore;
    use crate::testing::{MockClassifier, MockSource};
    use crate::types::record::Record;

    #[tokio::test]
    async fn test_empty_collection_stores_nothing() {
        let adapters: Vec<Arc<dyn SourceAdapter>> =
            vec![Arc::new(MockSource::new(Source::Arxiv).failing())];
        let classifier = MockClassifier::new();
        let relevance = RelevanceFilter::new(Arc::new(classifier.clone()), 0.5);
        let store = MemoryStore::new();

        let report = run_harvest(
            &adapters,
            &HarvestQuery::default(),
            &relevance,
            &store,
            &HarvestOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(report.collected, 0);
        assert_eq!(report.failed_sources(), vec![Source::Arxiv]);
        assert_eq!(classifier.call_count(), 0);
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_relevance_failure_aborts_before_storage() {
        let adapters: Vec<Arc<dyn SourceAdapter>> = vec![Arc::new(
            MockSource::new(Source::Arxiv)
                .with_records(vec![Record::new(Source::Arxiv, "1", "Machine minds")]),
        )];
        let relevance = RelevanceFilter::new(Arc::new(MockClassifier::new().failing()), 0.5);
        let store = MemoryStore::new();

        let result = run_harvest(
            &adapters,
            &HarvestQuery::default(),
            &relevance,
            &store,
            &HarvestOptions::default(),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(store.count().await.unwrap(), 0);
    }
}
