//! Source adapter trait for pluggable provider ingestion.
//!
//! Every upstream provider (preprint server, scholarly graph, citation
//! registry, discipline repository) is exposed through the same contract:
//! given a [`HarvestQuery`], produce a lazy stream of normalized
//! [`Record`]s. The collector depends only on this trait.
//!
//! # Usage
//!
//! ```rust,ignore
//! use futures::StreamExt;
//! use harvester::{HarvestQuery, SourceAdapter};
//!
//! let query = HarvestQuery::new(["machine consciousness"]).with_max_records(50);
//! let mut records = adapter.fetch(&query)?;
//! while let Some(record) = records.next().await {
//!     println!("{}", record.title);
//! }
//! ```

use futures::Stream;
use std::pin::Pin;

use crate::error::HarvestResult;
use crate::types::{config::HarvestQuery, record::Record, record::Source};

/// A finite, forward-only stream of records from one provider.
///
/// Not restartable: call [`SourceAdapter::fetch`] again for a fresh harvest.
pub type RecordStream<'a> = Pin<Box<dyn Stream<Item = Record> + Send + 'a>>;

/// Source adapter trait.
///
/// Implementations paginate their provider until `max_records` records were
/// yielded or the provider is exhausted. Page-level failures are soft: the
/// stream logs them and ends, keeping what was already yielded.
pub trait SourceAdapter: Send + Sync {
    /// Provider identity (used for the natural key and reporting).
    fn source(&self) -> Source;

    /// Start a harvest.
    ///
    /// Errs only when the harvest cannot start at all (e.g. an invalid
    /// query); network failures surface as an early end of the stream.
    fn fetch<'a>(&'a self, query: &'a HarvestQuery) -> HarvestResult<RecordStream<'a>>;

    /// Adapter name (for logging/debugging).
    fn name(&self) -> &str {
        self.source().as_str()
    }
}
