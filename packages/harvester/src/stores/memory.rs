//! In-memory record store for testing and dry runs.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::HarvestResult;
use crate::traits::store::{by_recency, merge_record, RecordStore, StoredRecord};
use crate::types::record::{Record, RecordKey};

/// In-memory storage keyed by `(source, external_id)`.
///
/// Data is lost on drop.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<RecordKey, StoredRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&self) {
        self.write().clear();
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<RecordKey, StoredRecord>> {
        self.records.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<RecordKey, StoredRecord>> {
        self.records.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn upsert(&self, records: &[Record]) -> HarvestResult<usize> {
        let mut stored = self.write();
        for record in records {
            let merged = match stored.get(&record.key()) {
                Some(existing) => merge_record(&existing.record, record),
                None => record.clone(),
            };
            stored.insert(
                record.key(),
                StoredRecord {
                    record: merged,
                    added_at: Utc::now(),
                },
            );
        }
        Ok(records.len())
    }

    async fn fetch_all(&self) -> HarvestResult<Vec<StoredRecord>> {
        let mut all: Vec<StoredRecord> = self.read().values().cloned().collect();
        all.sort_by(|a, b| by_recency(a, b).then_with(|| a.record.key().cmp(&b.record.key())));
        Ok(all)
    }

    async fn count(&self) -> HarvestResult<usize> {
        Ok(self.read().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::record::Source;
    use chrono::NaiveDate;
    use std::time::Duration;

    #[tokio::test]
    async fn test_overlapping_upserts_never_duplicate() {
        let store = MemoryStore::new();
        let a = Record::new(Source::Arxiv, "1", "A");
        let b = Record::new(Source::CrossRef, "1", "B");

        store.upsert(&[a.clone(), b.clone()]).await.unwrap();
        store.upsert(&[a.clone(), a]).await.unwrap();
        store.upsert(&[b]).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 2);
        let counts = store.count_by_source().await.unwrap();
        assert_eq!(counts[&Source::Arxiv], 1);
        assert_eq!(counts[&Source::CrossRef], 1);
    }

    #[tokio::test]
    async fn test_reupsert_updates_in_place() {
        let store = MemoryStore::new();
        let mut record = Record::new(Source::OpenAlex, "W1", "Draft title");
        record.topics = Some(vec!["qualia".into()]);
        store.upsert(&[record]).await.unwrap();
        let first = store.fetch_all().await.unwrap().remove(0);

        tokio::time::sleep(Duration::from_millis(5)).await;
        let revised = Record::new(Source::OpenAlex, "W1", "Final title").with_abstract("Now with abstract.");
        store.upsert(&[revised]).await.unwrap();

        let all = store.fetch_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].record.title, "Final title");
        assert_eq!(all[0].record.abstract_text, "Now with abstract.");
        assert_eq!(all[0].record.topics, Some(vec!["qualia".to_string()]));
        assert!(all[0].added_at > first.added_at);
    }

    #[tokio::test]
    async fn test_fetch_all_orders_by_publication() {
        let store = MemoryStore::new();
        store
            .upsert(&[
                Record::new(Source::Arxiv, "undated", "u"),
                Record::new(Source::Arxiv, "old", "o")
                    .with_published(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()),
                Record::new(Source::Arxiv, "new", "n")
                    .with_published(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
            ])
            .await
            .unwrap();

        let ids: Vec<String> = store
            .fetch_all()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.record.external_id)
            .collect();
        assert_eq!(ids, vec!["new", "old", "undated"]);
    }
}
