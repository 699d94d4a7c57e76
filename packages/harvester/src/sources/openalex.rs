//! OpenAlex scholarly graph (works endpoint, cursor pagination).

use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashMap;
use url::Url;

use crate::error::{FetchError, FetchResult};
use crate::pipeline::enrich::collapse_whitespace;
use crate::sources::paged::{quoted_or, Page, Provider};
use crate::types::{config::HarvestQuery, record::Record, record::Source};

const BASE_URL: &str = "https://api.openalex.org/works";
const PAGE_SIZE: usize = 200;

#[derive(Debug, Deserialize)]
struct WorksResponse {
    #[serde(default)]
    meta: Meta,
    #[serde(default)]
    results: Vec<Work>,
}

#[derive(Debug, Default, Deserialize)]
struct Meta {
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Work {
    id: Option<String>,
    doi: Option<String>,
    title: Option<String>,
    display_name: Option<String>,
    publication_date: Option<String>,
    #[serde(default)]
    authorships: Vec<Authorship>,
    abstract_inverted_index: Option<HashMap<String, Vec<usize>>>,
    primary_location: Option<Location>,
    host_venue: Option<NamedSource>,
}

#[derive(Debug, Deserialize)]
struct Authorship {
    author: Option<NamedSource>,
}

#[derive(Debug, Deserialize)]
struct Location {
    source: Option<NamedSource>,
    landing_page_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NamedSource {
    display_name: Option<String>,
}

/// OpenAlex provider.
#[derive(Debug, Clone)]
pub struct OpenAlex {
    base_url: String,
    mailto: Option<String>,
}

impl Default for OpenAlex {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenAlex {
    pub fn new() -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            mailto: None,
        }
    }

    /// Identify the caller to get the "polite pool" rate limits.
    pub fn with_mailto(mut self, email: impl Into<String>) -> Self {
        self.mailto = Some(email.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

impl Provider for OpenAlex {
    /// Opaque cursor; `*` starts a new scan.
    type Cursor = String;

    fn source(&self) -> Source {
        Source::OpenAlex
    }

    fn first_cursor(&self, _query: &HarvestQuery) -> Option<String> {
        Some("*".to_string())
    }

    fn page_url(&self, query: &HarvestQuery, cursor: &String) -> FetchResult<Url> {
        let mut url = Url::parse(&self.base_url).map_err(|_| FetchError::InvalidUrl {
            url: self.base_url.clone(),
        })?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("search", &quoted_or(query))
                .append_pair(
                    "filter",
                    &format!("from_publication_date:{}-01-01", query.start_year),
                )
                .append_pair("per-page", &PAGE_SIZE.to_string())
                .append_pair("cursor", cursor);
            if let Some(mailto) = &self.mailto {
                pairs.append_pair("mailto", mailto);
            }
        }
        Ok(url)
    }

    fn parse_page(
        &self,
        _query: &HarvestQuery,
        _cursor: &String,
        body: &str,
    ) -> FetchResult<Page<String>> {
        let response: WorksResponse =
            serde_json::from_str(body).map_err(FetchError::malformed_json)?;

        // An empty page ends the scan even if a cursor is returned.
        let next = if response.results.is_empty() {
            None
        } else {
            response.meta.next_cursor.filter(|c| !c.is_empty())
        };
        let records = response.results.into_iter().map(work_to_record).collect();
        Ok(Page::new(records, next))
    }
}

/// Rebuild abstract text from OpenAlex's `word -> [positions]` index.
pub fn rebuild_abstract(index: &HashMap<String, Vec<usize>>) -> String {
    let mut positioned: Vec<(usize, &str)> = index
        .iter()
        .flat_map(|(word, positions)| positions.iter().map(move |p| (*p, word.as_str())))
        .collect();
    positioned.sort_by_key(|(p, _)| *p);
    positioned
        .into_iter()
        .map(|(_, w)| w)
        .collect::<Vec<_>>()
        .join(" ")
}

fn work_to_record(work: Work) -> Record {
    let id = work.id.clone().unwrap_or_default();
    let title = work
        .title
        .or(work.display_name)
        .map(|t| collapse_whitespace(&t))
        .unwrap_or_default();

    let venue = work
        .primary_location
        .as_ref()
        .and_then(|l| l.source.as_ref())
        .and_then(|s| s.display_name.clone())
        .or_else(|| work.host_venue.and_then(|v| v.display_name));

    let url = work
        .doi
        .or_else(|| work.primary_location.and_then(|l| l.landing_page_url))
        .unwrap_or_else(|| id.clone());

    let mut record = Record::new(Source::OpenAlex, id, title)
        .with_abstract(
            work.abstract_inverted_index
                .as_ref()
                .map(rebuild_abstract)
                .unwrap_or_default(),
        )
        .with_authors(
            work.authorships
                .into_iter()
                .filter_map(|a| a.author.and_then(|au| au.display_name)),
        )
        .with_url(url);

    record.venue = venue;
    record.published = work
        .publication_date
        .as_deref()
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());
    record
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"{
        "meta": {"count": 2, "next_cursor": "IlsxNjA5"},
        "results": [
            {
                "id": "https://openalex.org/W123",
                "doi": "https://doi.org/10.1000/xyz",
                "title": "Machine  Sentience Revisited",
                "publication_date": "2022-07-14",
                "authorships": [
                    {"author": {"display_name": "Ada Lovelace"}},
                    {"author": {"display_name": null}},
                    {"author": {"display_name": "Alan Turing"}}
                ],
                "abstract_inverted_index": {"minds": [2], "Machine": [0], "lack": [1]},
                "primary_location": {"source": {"display_name": "Minds and Machines"}}
            },
            {
                "id": "https://openalex.org/W456",
                "display_name": "Untitled draft",
                "publication_date": null,
                "host_venue": {"display_name": "Legacy Venue"}
            }
        ]
    }"#;

    #[test]
    fn test_parses_works() {
        let provider = OpenAlex::new();
        let page = provider
            .parse_page(&HarvestQuery::default(), &"*".to_string(), PAGE)
            .unwrap();

        assert_eq!(page.next.as_deref(), Some("IlsxNjA5"));
        assert_eq!(page.records.len(), 2);

        let first = &page.records[0];
        assert_eq!(first.external_id, "https://openalex.org/W123");
        assert_eq!(first.title, "Machine Sentience Revisited");
        assert_eq!(first.abstract_text, "Machine lack minds");
        assert_eq!(first.authors, vec!["Ada Lovelace", "Alan Turing"]);
        assert_eq!(first.url, "https://doi.org/10.1000/xyz");
        assert_eq!(first.venue.as_deref(), Some("Minds and Machines"));
        assert_eq!(first.year(), Some(2022));

        let second = &page.records[1];
        assert_eq!(second.title, "Untitled draft");
        assert_eq!(second.abstract_text, "");
        assert!(second.authors.is_empty());
        assert_eq!(second.published, None);
        assert_eq!(second.venue.as_deref(), Some("Legacy Venue"));
        assert_eq!(second.url, "https://openalex.org/W456");
    }

    #[test]
    fn test_empty_results_end_scan() {
        let provider = OpenAlex::new();
        let body = r#"{"meta": {"next_cursor": "abc"}, "results": []}"#;
        let page = provider
            .parse_page(&HarvestQuery::default(), &"*".to_string(), body)
            .unwrap();
        assert!(page.records.is_empty());
        assert_eq!(page.next, None);
    }

    #[test]
    fn test_page_url_carries_cursor_and_filter() {
        let provider = OpenAlex::new().with_mailto("team@example.org");
        let query = HarvestQuery::new(["AI"]).with_start_year(2021);
        let url = provider.page_url(&query, &"*".to_string()).unwrap();
        let pairs: HashMap<String, String> = url.query_pairs().into_owned().collect();

        assert_eq!(pairs["cursor"], "*");
        assert_eq!(pairs["filter"], "from_publication_date:2021-01-01");
        assert_eq!(pairs["search"], "\"AI\"");
        assert_eq!(pairs["mailto"], "team@example.org");
    }

    #[test]
    fn test_malformed_body_is_an_error() {
        let provider = OpenAlex::new();
        assert!(provider
            .parse_page(&HarvestQuery::default(), &"*".to_string(), "<html>")
            .is_err());
    }
}
