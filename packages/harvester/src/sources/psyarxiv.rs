//! PsyArXiv preprints via the OSF JSON:API (next-link pagination).

use chrono::NaiveDate;
use serde::Deserialize;
use url::Url;

use crate::error::{FetchError, FetchResult};
use crate::pipeline::enrich::{clean_text, collapse_whitespace};
use crate::sources::paged::{Page, Provider};
use crate::types::{config::HarvestQuery, record::Record, record::Source};

const BASE_URL: &str = "https://api.osf.io/v2/preprints/";
const PAGE_SIZE: usize = 100;

/// Where the next request goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PsyArxivCursor {
    /// Build the search URL from the query
    First,
    /// Follow the `links.next` URL returned by the previous page
    Next(Url),
}

#[derive(Debug, Deserialize)]
struct PreprintsResponse {
    #[serde(default)]
    data: Vec<Preprint>,
    #[serde(default)]
    links: PageLinks,
}

#[derive(Debug, Default, Deserialize)]
struct PageLinks {
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Preprint {
    id: Option<String>,
    #[serde(default)]
    attributes: Attributes,
    #[serde(default)]
    links: PreprintLinks,
    embeds: Option<Embeds>,
}

#[derive(Debug, Default, Deserialize)]
struct Attributes {
    title: Option<String>,
    description: Option<String>,
    date_published: Option<String>,
    date_created: Option<String>,
    doi: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PreprintLinks {
    html: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Embeds {
    contributors: Option<Contributors>,
}

#[derive(Debug, Deserialize)]
struct Contributors {
    #[serde(default)]
    data: Vec<Contributor>,
}

#[derive(Debug, Deserialize)]
struct Contributor {
    embeds: Option<ContributorEmbeds>,
}

#[derive(Debug, Deserialize)]
struct ContributorEmbeds {
    users: Option<UserEnvelope>,
}

#[derive(Debug, Deserialize)]
struct UserEnvelope {
    data: Option<User>,
}

#[derive(Debug, Deserialize)]
struct User {
    #[serde(default)]
    attributes: UserAttributes,
}

#[derive(Debug, Default, Deserialize)]
struct UserAttributes {
    full_name: Option<String>,
}

/// PsyArXiv provider.
#[derive(Debug, Clone)]
pub struct PsyArxiv {
    base_url: String,
}

impl Default for PsyArxiv {
    fn default() -> Self {
        Self::new()
    }
}

impl PsyArxiv {
    pub fn new() -> Self {
        Self {
            base_url: BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

impl Provider for PsyArxiv {
    type Cursor = PsyArxivCursor;

    fn source(&self) -> Source {
        Source::PsyArxiv
    }

    fn first_cursor(&self, _query: &HarvestQuery) -> Option<PsyArxivCursor> {
        Some(PsyArxivCursor::First)
    }

    fn page_url(&self, query: &HarvestQuery, cursor: &PsyArxivCursor) -> FetchResult<Url> {
        match cursor {
            PsyArxivCursor::Next(url) => Ok(url.clone()),
            PsyArxivCursor::First => Url::parse_with_params(
                &self.base_url,
                &[
                    ("q", query.clean_terms().collect::<Vec<_>>().join(" OR ")),
                    ("filter[provider]", "psyarxiv".to_string()),
                    (
                        "filter[date_published][gte]",
                        format!("{}-01-01", query.start_year),
                    ),
                    ("page[size]", PAGE_SIZE.to_string()),
                    ("embed", "contributors".to_string()),
                ],
            )
            .map_err(|_| FetchError::InvalidUrl {
                url: self.base_url.clone(),
            }),
        }
    }

    fn parse_page(
        &self,
        _query: &HarvestQuery,
        _cursor: &PsyArxivCursor,
        body: &str,
    ) -> FetchResult<Page<PsyArxivCursor>> {
        let response: PreprintsResponse =
            serde_json::from_str(body).map_err(FetchError::malformed_json)?;

        let next = if response.data.is_empty() {
            None
        } else {
            response
                .links
                .next
                .as_deref()
                .and_then(|link| Url::parse(link).ok())
                .map(PsyArxivCursor::Next)
        };

        let records = response.data.into_iter().map(preprint_to_record).collect();
        Ok(Page::new(records, next))
    }
}

/// OSF timestamps come with or without offsets; only the date matters.
fn parse_osf_date(value: &str) -> Option<NaiveDate> {
    value
        .get(..10)
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
}

fn preprint_to_record(preprint: Preprint) -> Record {
    let attrs = preprint.attributes;

    let authors: Vec<String> = preprint
        .embeds
        .and_then(|e| e.contributors)
        .map(|c| c.data)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|c| c.embeds?.users?.data?.attributes.full_name)
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect();

    let published = attrs
        .date_published
        .as_deref()
        .or(attrs.date_created.as_deref())
        .and_then(parse_osf_date);

    let url = attrs
        .doi
        .or(preprint.links.html)
        .unwrap_or_default();

    let mut record = Record::new(
        Source::PsyArxiv,
        preprint.id.unwrap_or_default(),
        attrs
            .title
            .map(|t| collapse_whitespace(&t))
            .unwrap_or_default(),
    )
    .with_abstract(attrs.description.as_deref().map(clean_text).unwrap_or_default())
    .with_authors(authors)
    .with_url(url)
    .with_venue("PsyArXiv");

    record.published = published;
    record
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"{
        "data": [
            {
                "id": "x7k2p",
                "type": "preprints",
                "attributes": {
                    "title": "Folk attributions of machine consciousness",
                    "description": "People   attribute minds [3] to chatbots.",
                    "date_published": "2023-05-10T14:22:01.123456",
                    "date_created": "2023-05-01T09:00:00.000000",
                    "doi": null
                },
                "links": {"html": "https://osf.io/preprints/psyarxiv/x7k2p/"},
                "embeds": {
                    "contributors": {
                        "data": [
                            {"embeds": {"users": {"data": {"attributes": {"full_name": "Clara Colombatto"}}}}},
                            {"embeds": {"users": {"errors": [{"detail": "private"}]}}}
                        ]
                    }
                }
            },
            {
                "id": "b9q1z",
                "attributes": {
                    "title": "Draft",
                    "date_published": null,
                    "date_created": "2022-11-30T00:00:00Z",
                    "doi": "https://doi.org/10.31234/osf.io/b9q1z"
                }
            }
        ],
        "links": {"next": "https://api.osf.io/v2/preprints/?page=2&filter%5Bprovider%5D=psyarxiv"}
    }"#;

    #[test]
    fn test_parses_preprints() {
        let provider = PsyArxiv::new();
        let page = provider
            .parse_page(&HarvestQuery::default(), &PsyArxivCursor::First, PAGE)
            .unwrap();

        assert!(matches!(page.next, Some(PsyArxivCursor::Next(_))));
        let first = &page.records[0];
        assert_eq!(first.external_id, "x7k2p");
        assert_eq!(first.abstract_text, "People attribute minds to chatbots.");
        assert_eq!(first.authors, vec!["Clara Colombatto"]);
        assert_eq!(first.url, "https://osf.io/preprints/psyarxiv/x7k2p/");
        assert_eq!(first.published, NaiveDate::from_ymd_opt(2023, 5, 10));
        assert_eq!(first.venue.as_deref(), Some("PsyArXiv"));

        let second = &page.records[1];
        assert_eq!(second.published, NaiveDate::from_ymd_opt(2022, 11, 30));
        assert_eq!(second.url, "https://doi.org/10.31234/osf.io/b9q1z");
        assert!(second.authors.is_empty());
    }

    #[test]
    fn test_missing_next_link_ends_scan() {
        let provider = PsyArxiv::new();
        let body = r#"{"data": [{"id": "a", "attributes": {"title": "t"}}], "links": {"next": null}}"#;
        let page = provider
            .parse_page(&HarvestQuery::default(), &PsyArxivCursor::First, body)
            .unwrap();
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.next, None);
    }

    #[test]
    fn test_first_url_filters_provider_and_date() {
        let provider = PsyArxiv::new();
        let query = HarvestQuery::new(["AI", "sentience"]).with_start_year(2021);
        let url = provider.page_url(&query, &PsyArxivCursor::First).unwrap();
        let pairs: std::collections::HashMap<String, String> =
            url.query_pairs().into_owned().collect();

        assert_eq!(pairs["q"], "AI OR sentience");
        assert_eq!(pairs["filter[provider]"], "psyarxiv");
        assert_eq!(pairs["filter[date_published][gte]"], "2021-01-01");
    }

    #[test]
    fn test_next_cursor_url_is_followed_verbatim() {
        let provider = PsyArxiv::new();
        let next = Url::parse("https://api.osf.io/v2/preprints/?page=3").unwrap();
        let url = provider
            .page_url(&HarvestQuery::default(), &PsyArxivCursor::Next(next.clone()))
            .unwrap();
        assert_eq!(url, next);
    }
}
