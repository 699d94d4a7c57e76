//! arXiv preprint repository (Atom API).
//!
//! Pagination is year-bucketed: one `submittedDate` window per calendar
//! year from the start year to the end year, paging with `start` inside
//! each window.

use feed_rs::model::Entry;
use url::Url;

use crate::error::{FetchError, FetchResult};
use crate::pipeline::enrich::{clean_text, collapse_whitespace};
use crate::sources::paged::{Page, Provider};
use crate::types::{config::HarvestQuery, record::Record, record::Source};

const BASE_URL: &str = "https://export.arxiv.org/api/query";
const PAGE_SIZE: usize = 100;

/// Position inside the year buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArxivCursor {
    pub year: i32,
    pub start: usize,
}

/// arXiv provider.
#[derive(Debug, Clone)]
pub struct Arxiv {
    base_url: String,
    page_size: usize,
}

impl Default for Arxiv {
    fn default() -> Self {
        Self::new()
    }
}

impl Arxiv {
    pub fn new() -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            page_size: PAGE_SIZE,
        }
    }

    /// Set a custom base URL (mirrors, tests).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn search_query(query: &HarvestQuery, year: i32) -> String {
        let terms = query
            .clean_terms()
            .map(|t| format!("all:\"{t}\""))
            .collect::<Vec<_>>()
            .join(" OR ");
        format!("({terms}) AND submittedDate:[{year}01010000 TO {year}12312359]")
    }

    fn next_cursor(&self, query: &HarvestQuery, cursor: &ArxivCursor, entries: usize) -> Option<ArxivCursor> {
        if entries >= self.page_size {
            Some(ArxivCursor {
                year: cursor.year,
                start: cursor.start + self.page_size,
            })
        } else if cursor.year < query.end_year {
            Some(ArxivCursor {
                year: cursor.year + 1,
                start: 0,
            })
        } else {
            None
        }
    }
}

impl Provider for Arxiv {
    type Cursor = ArxivCursor;

    fn source(&self) -> Source {
        Source::Arxiv
    }

    fn first_cursor(&self, query: &HarvestQuery) -> Option<ArxivCursor> {
        (query.start_year <= query.end_year).then_some(ArxivCursor {
            year: query.start_year,
            start: 0,
        })
    }

    fn page_url(&self, query: &HarvestQuery, cursor: &ArxivCursor) -> FetchResult<Url> {
        Url::parse_with_params(
            &self.base_url,
            &[
                ("search_query", Self::search_query(query, cursor.year)),
                ("start", cursor.start.to_string()),
                ("max_results", self.page_size.to_string()),
                ("sortBy", "submittedDate".to_string()),
                ("sortOrder", "descending".to_string()),
            ],
        )
        .map_err(|_| FetchError::InvalidUrl {
            url: self.base_url.clone(),
        })
    }

    fn parse_page(
        &self,
        query: &HarvestQuery,
        cursor: &ArxivCursor,
        body: &str,
    ) -> FetchResult<Page<ArxivCursor>> {
        let feed = feed_rs::parser::parse(body.as_bytes()).map_err(|e| FetchError::Malformed {
            format: "atom",
            reason: e.to_string(),
        })?;

        // The API reports bad queries as a single entry under /api/errors.
        if let Some(error) = feed.entries.iter().find(|e| e.id.contains("/api/errors")) {
            return Err(FetchError::Malformed {
                format: "atom",
                reason: error
                    .summary
                    .as_ref()
                    .map(|s| s.content.clone())
                    .unwrap_or_else(|| error.id.clone()),
            });
        }

        let entries = feed.entries.len();
        let records = feed.entries.into_iter().map(entry_to_record).collect();
        Ok(Page::new(records, self.next_cursor(query, cursor, entries)))
    }
}

/// `http://arxiv.org/abs/2401.01234v2` -> `2401.01234`
pub fn arxiv_id(entry_id: &str) -> String {
    let id = entry_id
        .rsplit_once("/abs/")
        .map(|(_, id)| id)
        .unwrap_or(entry_id);
    match id.rfind('v') {
        Some(pos) if pos > 0 && id[pos + 1..].chars().all(|c| c.is_ascii_digit()) && pos + 1 < id.len() => {
            id[..pos].to_string()
        }
        _ => id.to_string(),
    }
}

fn entry_to_record(entry: Entry) -> Record {
    let url = entry
        .links
        .iter()
        .find(|l| l.rel.as_deref() == Some("alternate"))
        .or_else(|| entry.links.first())
        .map(|l| l.href.clone())
        .unwrap_or_else(|| entry.id.clone());

    let mut record = Record::new(
        Source::Arxiv,
        arxiv_id(&entry.id),
        entry
            .title
            .as_ref()
            .map(|t| collapse_whitespace(&t.content))
            .unwrap_or_default(),
    )
    .with_abstract(
        entry
            .summary
            .as_ref()
            .map(|s| clean_text(&s.content))
            .unwrap_or_default(),
    )
    .with_authors(entry.authors.iter().map(|a| a.name.trim().to_string()))
    .with_url(url)
    .with_venue("arXiv");

    record.published = entry.published.or(entry.updated).map(|dt| dt.date_naive());
    record
}
