//! Crossref citation registry (works endpoint, offset pagination).
//!
//! Crossref's `from-pub-date` filter is loose and its `created` timestamp is
//! the deposit date, so records are dated from the publication date-parts
//! and the year filter is re-applied downstream.

use chrono::NaiveDate;
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;
use url::Url;

use crate::error::{FetchError, FetchResult};
use crate::pipeline::enrich::{clean_text, collapse_whitespace};
use crate::sources::paged::{Page, Provider};
use crate::types::{config::HarvestQuery, record::Record, record::Source};

const BASE_URL: &str = "https://api.crossref.org/works";
const PAGE_SIZE: usize = 100;

/// Crossref refuses offsets past this; deeper scans need cursors.
const MAX_OFFSET: usize = 10_000;

static JATS_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</?[A-Za-z][^>]*>").expect("valid JATS tag regex"));

#[derive(Debug, Deserialize)]
struct WorksResponse {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    #[serde(default)]
    items: Vec<Work>,
    #[serde(rename = "total-results")]
    total_results: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct Work {
    #[serde(rename = "DOI")]
    doi: Option<String>,
    #[serde(default)]
    title: Vec<String>,
    #[serde(default)]
    author: Vec<Author>,
    #[serde(rename = "abstract")]
    abstract_text: Option<String>,
    #[serde(rename = "URL")]
    url: Option<String>,
    #[serde(rename = "container-title", default)]
    container_title: Vec<String>,
    published: Option<DateParts>,
    #[serde(rename = "published-print")]
    published_print: Option<DateParts>,
    #[serde(rename = "published-online")]
    published_online: Option<DateParts>,
    issued: Option<DateParts>,
}

#[derive(Debug, Deserialize)]
struct Author {
    given: Option<String>,
    family: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DateParts {
    #[serde(rename = "date-parts", default)]
    date_parts: Vec<Vec<Option<i64>>>,
}

impl DateParts {
    /// First date-part triple as a date; missing month/day default to 1.
    fn to_date(&self) -> Option<NaiveDate> {
        let parts = self.date_parts.first()?;
        let year = (*parts.first()?)?;
        let month = parts.get(1).copied().flatten().unwrap_or(1);
        let day = parts.get(2).copied().flatten().unwrap_or(1);
        NaiveDate::from_ymd_opt(
            i32::try_from(year).ok()?,
            u32::try_from(month).ok()?,
            u32::try_from(day).ok()?,
        )
    }
}

/// Crossref provider.
#[derive(Debug, Clone)]
pub struct CrossRef {
    base_url: String,
    rows: usize,
    mailto: Option<String>,
}

impl Default for CrossRef {
    fn default() -> Self {
        Self::new()
    }
}

impl CrossRef {
    pub fn new() -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            rows: PAGE_SIZE,
            mailto: None,
        }
    }

    pub fn with_mailto(mut self, email: impl Into<String>) -> Self {
        self.mailto = Some(email.into());
        self
    }

    pub fn with_rows(mut self, rows: usize) -> Self {
        self.rows = rows.max(1);
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

impl Provider for CrossRef {
    /// Row offset.
    type Cursor = usize;

    fn source(&self) -> Source {
        Source::CrossRef
    }

    fn first_cursor(&self, _query: &HarvestQuery) -> Option<usize> {
        Some(0)
    }

    fn page_url(&self, query: &HarvestQuery, offset: &usize) -> FetchResult<Url> {
        let mut url = Url::parse(&self.base_url).map_err(|_| FetchError::InvalidUrl {
            url: self.base_url.clone(),
        })?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("query", &query.clean_terms().collect::<Vec<_>>().join(" "))
                .append_pair("filter", &format!("from-pub-date:{}-01-01", query.start_year))
                .append_pair("rows", &self.rows.to_string())
                .append_pair("offset", &offset.to_string());
            if let Some(mailto) = &self.mailto {
                pairs.append_pair("mailto", mailto);
            }
        }
        Ok(url)
    }

    fn parse_page(
        &self,
        _query: &HarvestQuery,
        offset: &usize,
        body: &str,
    ) -> FetchResult<Page<usize>> {
        let response: WorksResponse =
            serde_json::from_str(body).map_err(FetchError::malformed_json)?;
        let message = response.message;

        let next_offset = offset + self.rows;
        let more = !message.items.is_empty()
            && next_offset <= MAX_OFFSET
            && message.total_results.map_or(true, |total| next_offset < total);

        let records = message.items.into_iter().map(work_to_record).collect();
        Ok(Page::new(records, more.then_some(next_offset)))
    }
}

/// Strip JATS markup (`<jats:p>` etc.) and normalize whitespace.
pub fn strip_jats(text: &str) -> String {
    clean_text(&JATS_TAG.replace_all(text, " "))
}

fn author_name(author: Author) -> Option<String> {
    let parts: Vec<String> = [author.given, author.family]
        .into_iter()
        .flatten()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();
    if parts.is_empty() {
        author.name.filter(|n| !n.trim().is_empty())
    } else {
        Some(parts.join(" "))
    }
}

fn work_to_record(work: Work) -> Record {
    let published = [
        &work.published,
        &work.published_print,
        &work.published_online,
        &work.issued,
    ]
    .into_iter()
    .flatten()
    .find_map(DateParts::to_date);

    let doi = work.doi.unwrap_or_default();
    let url = work
        .url
        .unwrap_or_else(|| format!("https://doi.org/{doi}"));

    let mut record = Record::new(
        Source::CrossRef,
        doi,
        work.title
            .first()
            .map(|t| collapse_whitespace(t))
            .unwrap_or_default(),
    )
    .with_abstract(work.abstract_text.as_deref().map(strip_jats).unwrap_or_default())
    .with_authors(work.author.into_iter().filter_map(author_name))
    .with_url(url);

    record.venue = work
        .container_title
        .into_iter()
        .next()
        .filter(|v| !v.trim().is_empty());
    record.published = published;
    record
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"{
        "status": "ok",
        "message": {
            "total-results": 150,
            "items": [
                {
                    "DOI": "10.1007/s11023-021-09555-1",
                    "title": ["Is   AI Conscious?"],
                    "author": [
                        {"given": "Susan", "family": "Schneider"},
                        {"name": "The Consciousness Consortium"},
                        {"family": "Searle"}
                    ],
                    "abstract": "<jats:title>Abstract</jats:title><jats:p>Machines are merely a tool.</jats:p>",
                    "URL": "http://dx.doi.org/10.1007/s11023-021-09555-1",
                    "container-title": ["Minds and Machines"],
                    "created": {"date-time": "2023-01-01T00:00:00Z"},
                    "published-print": {"date-parts": [[2021, 9]]}
                },
                {
                    "DOI": "10.1/undated",
                    "title": [],
                    "issued": {"date-parts": [[null]]}
                }
            ]
        }
    }"#;

    #[test]
    fn test_parses_items() {
        let provider = CrossRef::new();
        let page = provider.parse_page(&HarvestQuery::default(), &0, PAGE).unwrap();

        assert_eq!(page.next, Some(100));
        let first = &page.records[0];
        assert_eq!(first.external_id, "10.1007/s11023-021-09555-1");
        assert_eq!(first.title, "Is AI Conscious?");
        assert_eq!(first.abstract_text, "Abstract Machines are merely a tool.");
        assert_eq!(
            first.authors,
            vec!["Susan Schneider", "The Consciousness Consortium", "Searle"]
        );
        assert_eq!(first.venue.as_deref(), Some("Minds and Machines"));
        // Publication date wins over the deposit timestamp.
        assert_eq!(first.published, NaiveDate::from_ymd_opt(2021, 9, 1));

        let second = &page.records[1];
        assert_eq!(second.title, "");
        assert_eq!(second.published, None);
        assert_eq!(second.venue, None);
        assert_eq!(second.url, "https://doi.org/10.1/undated");
    }

    #[test]
    fn test_last_page_by_total_results() {
        let provider = CrossRef::new();
        let page = provider.parse_page(&HarvestQuery::default(), &100, PAGE).unwrap();
        assert_eq!(page.next, None);
    }

    #[test]
    fn test_empty_items_end_scan() {
        let provider = CrossRef::new();
        let body = r#"{"message": {"items": [], "total-results": 5000}}"#;
        let page = provider.parse_page(&HarvestQuery::default(), &0, body).unwrap();
        assert_eq!(page.next, None);
    }

    #[test]
    fn test_offset_cap() {
        let provider = CrossRef::new();
        let page = provider
            .parse_page(&HarvestQuery::default(), &MAX_OFFSET, PAGE)
            .unwrap();
        assert_eq!(page.next, None);
    }

    #[test]
    fn test_page_url() {
        let provider = CrossRef::new();
        let query = HarvestQuery::new(["machine", "consciousness"]).with_start_year(2020);
        let url = provider.page_url(&query, &200).unwrap();
        let pairs: std::collections::HashMap<String, String> =
            url.query_pairs().into_owned().collect();

        assert_eq!(pairs["query"], "machine consciousness");
        assert_eq!(pairs["filter"], "from-pub-date:2020-01-01");
        assert_eq!(pairs["offset"], "200");
        assert_eq!(pairs["rows"], "100");
    }
}
