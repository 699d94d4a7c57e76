//! Storage trait for durable record persistence.
//!
//! Stores deduplicate on the natural key `(source, external_id)`:
//! re-harvested records are merged into the existing row, never duplicated.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::error::HarvestResult;
use crate::types::record::{Record, Source};

/// A persisted record plus its bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub record: Record,

    /// When the row was last written
    pub added_at: DateTime<Utc>,
}

/// Durable record store.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert new records and merge existing natural keys.
    ///
    /// Mutable fields (title, abstract, authors, url, date, venue) take the
    /// latest values; computed fields (topics, sentiment, relevance) keep
    /// the stored value when the incoming record has none. Returns the
    /// number of records written.
    async fn upsert(&self, records: &[Record]) -> HarvestResult<usize>;

    /// All records, most recent publication first, undated last.
    async fn fetch_all(&self) -> HarvestResult<Vec<StoredRecord>>;

    /// Number of stored records.
    async fn count(&self) -> HarvestResult<usize>;

    /// Stored record counts per provider.
    async fn count_by_source(&self) -> HarvestResult<BTreeMap<Source, usize>> {
        let mut counts = BTreeMap::new();
        for stored in self.fetch_all().await? {
            *counts.entry(stored.record.source).or_insert(0) += 1;
        }
        Ok(counts)
    }
}

/// Merge an incoming harvest into a previously stored record.
pub fn merge_record(existing: &Record, incoming: &Record) -> Record {
    Record {
        topics: incoming.topics.clone().or_else(|| existing.topics.clone()),
        sentiment_compound: incoming.sentiment_compound.or(existing.sentiment_compound),
        relevance_score: incoming.relevance_score.or(existing.relevance_score),
        ..incoming.clone()
    }
}

/// Ordering used by `fetch_all`: published descending, undated last.
pub fn by_recency(a: &StoredRecord, b: &StoredRecord) -> Ordering {
    match (a.record.published, b.record.published) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
