use anyhow::{Context, Result};
use chrono::{Datelike, Utc};
use dotenvy::dotenv;
use harvester::types::config::{DEFAULT_MAX_RECORDS, DEFAULT_QUERY_TERMS};
use harvester::{classifiers::DEFAULT_MODEL, stores::DEFAULT_DB_PATH, Source};
use std::env;

/// Default minimum probability for the relevance gate.
pub const DEFAULT_RELEVANCE_THRESHOLD: f32 = 0.5;

/// CLI configuration loaded from environment variables.
///
/// Command-line flags override every field.
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub query_terms: Vec<String>,
    pub max_records: usize,
    pub start_year: i32,
    pub relevance_threshold: f32,
    pub sources: Vec<Source>,
    pub hf_api_token: Option<String>,
    pub hf_model: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            db_path: lookup("HARVEST_DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string()),
            query_terms: match lookup("HARVEST_QUERY_TERMS") {
                Some(raw) => split_list(&raw),
                None => DEFAULT_QUERY_TERMS.iter().map(|t| t.to_string()).collect(),
            },
            max_records: match lookup("HARVEST_MAX_RECORDS") {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .context("HARVEST_MAX_RECORDS must be a valid number")?,
                None => DEFAULT_MAX_RECORDS,
            },
            start_year: match lookup("HARVEST_START_YEAR") {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .context("HARVEST_START_YEAR must be a valid year")?,
                None => Utc::now().year() - 5,
            },
            relevance_threshold: match lookup("HARVEST_RELEVANCE_THRESHOLD") {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .context("HARVEST_RELEVANCE_THRESHOLD must be a number in [0, 1]")?,
                None => DEFAULT_RELEVANCE_THRESHOLD,
            },
            sources: match lookup("HARVEST_SOURCES") {
                Some(raw) => parse_sources(&split_list(&raw))?,
                None => Source::ALL.to_vec(),
            },
            hf_api_token: lookup("HF_API_TOKEN").filter(|t| !t.trim().is_empty()),
            hf_model: lookup("HF_MODEL")
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        })
    }
}

/// Split a comma separated list, dropping blanks.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn parse_sources(names: &[String]) -> Result<Vec<Source>> {
    names
        .iter()
        .map(|name| {
            name.parse::<Source>()
                .map_err(anyhow::Error::msg)
                .with_context(|| format!("invalid source '{name}'"))
        })
        .collect()
}
