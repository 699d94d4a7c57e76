//! Generic paginated source.
//!
//! Providers only describe their wire format: how to build a page URL from
//! a cursor and how to turn a response body into records plus the next
//! cursor. [`PagedSource`] owns the rules every adapter shares: the record
//! cap, the start-year filter, skipping unkeyed records, and soft failure.

use async_stream::stream;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{FetchResult, HarvestResult};
use crate::traits::source::{RecordStream, SourceAdapter};
use crate::traits::transport::Transport;
use crate::types::{config::HarvestQuery, record::Record, record::Source};

/// Upper bound on requests per harvest, guarding against cursors that never end.
const DEFAULT_MAX_PAGES: usize = 1_000;

/// One decoded provider page.
#[derive(Debug, Clone)]
pub struct Page<C> {
    pub records: Vec<Record>,

    /// Where to continue; `None` means the provider is exhausted
    pub next: Option<C>,
}

impl<C> Page<C> {
    pub fn new(records: Vec<Record>, next: Option<C>) -> Self {
        Self { records, next }
    }

    /// A page that ends the harvest.
    pub fn last(records: Vec<Record>) -> Self {
        Self {
            records,
            next: None,
        }
    }
}

/// Wire-level description of one provider API.
pub trait Provider: Send + Sync {
    /// Pagination state (offset, opaque cursor, year bucket, next link, ...)
    type Cursor: Clone + fmt::Debug + Send + Sync;

    fn source(&self) -> Source;

    /// Cursor for the first request, or `None` if the query selects nothing.
    fn first_cursor(&self, query: &HarvestQuery) -> Option<Self::Cursor>;

    /// URL for the page at `cursor`.
    fn page_url(&self, query: &HarvestQuery, cursor: &Self::Cursor) -> FetchResult<Url>;

    /// Decode a response body.
    fn parse_page(
        &self,
        query: &HarvestQuery,
        cursor: &Self::Cursor,
        body: &str,
    ) -> FetchResult<Page<Self::Cursor>>;
}

/// A [`SourceAdapter`] driving a [`Provider`] over a [`Transport`].
pub struct PagedSource<P: Provider> {
    provider: P,
    transport: Arc<dyn Transport>,
    max_pages: usize,
}

impl<P: Provider> PagedSource<P> {
    pub fn new(provider: P, transport: Arc<dyn Transport>) -> Self {
        Self {
            provider,
            transport,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    /// Cap the number of requests per harvest.
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    async fn fetch_page(
        &self,
        query: &HarvestQuery,
        cursor: &P::Cursor,
    ) -> FetchResult<Page<P::Cursor>> {
        let url = self.provider.page_url(query, cursor)?;
        let body = self.transport.get(&url).await?;
        self.provider.parse_page(query, cursor, &body)
    }
}

impl<P: Provider> SourceAdapter for PagedSource<P> {
    fn source(&self) -> Source {
        self.provider.source()
    }

    fn fetch<'a>(&'a self, query: &'a HarvestQuery) -> HarvestResult<RecordStream<'a>> {
        query.validate()?;
        let source = self.provider.source();

        Ok(Box::pin(stream! {
            let mut yielded = 0usize;
            let mut pages = 0usize;
            let mut cursor = self.provider.first_cursor(query);

            while let Some(current) = cursor.take() {
                if yielded >= query.max_records {
                    break;
                }
                if pages >= self.max_pages {
                    warn!(source = %source, pages, "Page cap reached, stopping");
                    break;
                }

                debug!(source = %source, cursor = ?current, "Fetching page");
                let page = match self.fetch_page(query, &current).await {
                    Ok(page) => page,
                    Err(e) if pages == 0 => {
                        warn!(source = %source, error = %e, "First request failed, source yields nothing");
                        break;
                    }
                    Err(e) => {
                        warn!(
                            source = %source,
                            error = %e,
                            records_so_far = yielded,
                            "Page request failed, stopping source"
                        );
                        break;
                    }
                };
                pages += 1;

                for record in page.records {
                    if yielded >= query.max_records {
                        break;
                    }
                    if record.external_id.trim().is_empty() {
                        debug!(source = %source, title = %record.title, "Skipping record without identifier");
                        continue;
                    }
                    if record.year().is_some_and(|year| year < query.start_year) {
                        continue;
                    }
                    yielded += 1;
                    yield record;
                }

                cursor = page.next;
            }

            info!(source = %source, records = yielded, pages, "Source harvest finished");
        }))
    }
}

/// Render terms as a quoted OR-list: `"a" OR "b"`.
pub(crate) fn quoted_or(query: &HarvestQuery) -> String {
    query
        .clean_terms()
        .map(|t| format!("\"{t}\""))
        .collect::<Vec<_>>()
        .join(" OR ")
}
