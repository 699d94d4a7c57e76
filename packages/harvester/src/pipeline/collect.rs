//! Collector: run every adapter concurrently and merge their records.
//!
//! Each adapter gets its own tokio task and deadline. An adapter that
//! cannot start, panics, or runs past its deadline contributes nothing and
//! is reported in the outcomes; the others are unaffected.

use futures::future::join_all;
use futures::StreamExt;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::{HarvestError, HarvestResult};
use crate::traits::source::SourceAdapter;
use crate::types::{config::HarvestQuery, record::Record, record::Source};

/// What one adapter contributed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdapterOutcome {
    pub source: Source,
    pub records: usize,

    /// Why the adapter contributed nothing, if it failed
    pub error: Option<String>,
}

impl AdapterOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Records from all adapters, concatenated in adapter order without
/// deduplication.
#[derive(Debug, Clone, Default)]
pub struct Collection {
    pub records: Vec<Record>,
    pub outcomes: Vec<AdapterOutcome>,
}

impl Collection {
    pub fn counts_by_source(&self) -> BTreeMap<Source, usize> {
        let mut counts = BTreeMap::new();
        for outcome in &self.outcomes {
            *counts.entry(outcome.source).or_insert(0) += outcome.records;
        }
        counts
    }

    pub fn failures(&self) -> impl Iterator<Item = &AdapterOutcome> {
        self.outcomes.iter().filter(|o| !o.is_ok())
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

async fn drain(adapter: &dyn SourceAdapter, query: &HarvestQuery) -> HarvestResult<Vec<Record>> {
    let stream = adapter.fetch(query)?;
    Ok(stream.collect().await)
}

/// Run all adapters, each bounded by `timeout`.
pub async fn collect(
    adapters: &[Arc<dyn SourceAdapter>],
    query: &HarvestQuery,
    timeout: Duration,
) -> Collection {
    let handles: Vec<_> = adapters
        .iter()
        .map(|adapter| {
            let adapter = Arc::clone(adapter);
            let query = query.clone();
            let source = adapter.source();
            let handle = tokio::spawn(async move {
                tokio::time::timeout(timeout, drain(adapter.as_ref(), &query)).await
            });
            (source, handle)
        })
        .collect();

    let (sources, handles): (Vec<Source>, Vec<_>) = handles.into_iter().unzip();
    let results = join_all(handles).await;

    let mut collection = Collection::default();
    for (source, result) in sources.into_iter().zip(results) {
        let outcome = match result {
            Ok(Ok(Ok(records))) => {
                let count = records.len();
                collection.records.extend(records);
                Ok(count)
            }
            Ok(Ok(Err(e))) => Err(e),
            Ok(Err(_elapsed)) => Err(HarvestError::Timeout {
                provider: source,
                deadline: timeout,
            }),
            Err(join_error) => Err(HarvestError::Worker {
                provider: source,
                reason: join_error.to_string(),
            }),
        };

        let outcome = match outcome {
            Ok(records) => {
                info!(source = %source, records, "Adapter finished");
                AdapterOutcome {
                    source,
                    records,
                    error: None,
                }
            }
            Err(e) => {
                warn!(source = %source, error = %e, "Adapter contributed no records");
                AdapterOutcome {
                    source,
                    records: 0,
                    error: Some(e.to_string()),
                }
            }
        };
        collection.outcomes.push(outcome);
    }

    info!(
        adapters = adapters.len(),
        records = collection.records.len(),
        failed = collection.failures().count(),
        "Collection finished"
    );
    collection
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockSource;

    fn records(source: Source, ids: &[&str]) -> Vec<Record> {
        ids.iter().map(|id| Record::new(source, *id, "t")).collect()
    }

    #[tokio::test]
    async fn test_concatenates_in_adapter_order_without_dedup() {
        let adapters: Vec<Arc<dyn SourceAdapter>> = vec![
            Arc::new(MockSource::new(Source::Arxiv).with_records(records(Source::Arxiv, &["a", "a"]))),
            Arc::new(MockSource::new(Source::CrossRef).with_records(records(Source::CrossRef, &["c"]))),
        ];

        let collection = collect(&adapters, &HarvestQuery::default(), Duration::from_secs(5)).await;
        let ids: Vec<&str> = collection.records.iter().map(|r| r.external_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "a", "c"]);
        assert_eq!(collection.counts_by_source()[&Source::Arxiv], 2);
        assert_eq!(collection.failures().count(), 0);
    }

    #[tokio::test]
    async fn test_failing_adapter_is_isolated() {
        let adapters: Vec<Arc<dyn SourceAdapter>> = vec![
            Arc::new(MockSource::new(Source::OpenAlex).failing()),
            Arc::new(MockSource::new(Source::PsyArxiv).with_records(records(Source::PsyArxiv, &["p"]))),
        ];

        let collection = collect(&adapters, &HarvestQuery::default(), Duration::from_secs(5)).await;
        assert_eq!(collection.records.len(), 1);
        assert_eq!(collection.outcomes[0].records, 0);
        assert!(collection.outcomes[0].error.is_some());
        assert!(collection.outcomes[1].is_ok());
    }

    #[tokio::test]
    async fn test_slow_adapter_times_out() {
        let adapters: Vec<Arc<dyn SourceAdapter>> = vec![
            Arc::new(
                MockSource::new(Source::Arxiv)
                    .with_records(records(Source::Arxiv, &["late"]))
                    .with_delay(Duration::from_secs(2)),
            ),
            Arc::new(MockSource::new(Source::CrossRef).with_records(records(Source::CrossRef, &["c"]))),
        ];

        let collection =
            collect(&adapters, &HarvestQuery::default(), Duration::from_millis(50)).await;
        assert_eq!(collection.records.len(), 1);
        assert_eq!(collection.records[0].external_id, "c");
        assert!(collection.outcomes[0]
            .error
            .as_deref()
            .is_some_and(|e| e.contains("timed out after 50ms")));
    }

    #[tokio::test]
    async fn test_panicking_adapter_is_reported() {
        let adapters: Vec<Arc<dyn SourceAdapter>> =
            vec![Arc::new(MockSource::new(Source::CrossRef).panicking())];

        let collection = collect(&adapters, &HarvestQuery::default(), Duration::from_secs(5)).await;
        assert!(collection.is_empty());
        assert!(!collection.outcomes[0].is_ok());
    }
}
