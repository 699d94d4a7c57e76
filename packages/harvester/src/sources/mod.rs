//! Provider adapters.
//!
//! Each provider is a [`Provider`] (URL building + payload decoding) driven
//! by the generic [`PagedSource`] over a rate-limited [`HttpTransport`]:
//! - `Arxiv` - Atom API, year-bucketed
//! - `OpenAlex` - works endpoint, cursor paging
//! - `CrossRef` - works endpoint, offset paging
//! - `PsyArxiv` - OSF preprints, next-link paging

pub mod arxiv;
pub mod crossref;
pub mod http;
pub mod openalex;
pub mod paged;
pub mod psyarxiv;

use std::sync::Arc;
use std::time::Duration;

pub use arxiv::{Arxiv, ArxivCursor};
pub use crossref::CrossRef;
pub use http::HttpTransport;
pub use openalex::OpenAlex;
pub use paged::{Page, PagedSource, Provider};
pub use psyarxiv::{PsyArxiv, PsyArxivCursor};

use crate::error::HarvestResult;
use crate::traits::source::SourceAdapter;
use crate::types::record::Source;

/// arXiv asks clients to wait three seconds between API calls.
const ARXIV_PERIOD: Duration = Duration::from_secs(3);

/// Build one live adapter per requested provider, each with its own quota.
///
/// Duplicates in `sources` are ignored.
pub fn default_adapters(sources: &[Source]) -> HarvestResult<Vec<Arc<dyn SourceAdapter>>> {
    let mut adapters: Vec<Arc<dyn SourceAdapter>> = Vec::new();
    let mut seen = Vec::new();

    for source in sources.iter().copied() {
        if seen.contains(&source) {
            continue;
        }
        seen.push(source);

        let adapter: Arc<dyn SourceAdapter> = match source {
            Source::Arxiv => Arc::new(PagedSource::new(
                Arxiv::new(),
                Arc::new(HttpTransport::every(ARXIV_PERIOD)?),
            )),
            Source::OpenAlex => Arc::new(PagedSource::new(
                OpenAlex::new(),
                Arc::new(HttpTransport::new(10)?),
            )),
            Source::CrossRef => Arc::new(PagedSource::new(
                CrossRef::new(),
                Arc::new(HttpTransport::new(5)?),
            )),
            Source::PsyArxiv => Arc::new(PagedSource::new(
                PsyArxiv::new(),
                Arc::new(HttpTransport::new(2)?),
            )),
        };
        adapters.push(adapter);
    }

    Ok(adapters)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_adapters_one_per_source() {
        let adapters =
            default_adapters(&[Source::Arxiv, Source::CrossRef, Source::Arxiv]).unwrap();
        let sources: Vec<Source> = adapters.iter().map(|a| a.source()).collect();
        assert_eq!(sources, vec![Source::Arxiv, Source::CrossRef]);
    }

    #[test]
    fn test_adapter_names_match_storage_keys() {
        let adapters = default_adapters(&Source::ALL).unwrap();
        let names: Vec<&str> = adapters.iter().map(|a| a.name()).collect();
        assert_eq!(names, vec!["arxiv", "openalex", "crossref", "psyarxiv"]);
    }
}
