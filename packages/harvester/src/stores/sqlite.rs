//! SQLite record store.
//!
//! One `articles` table keyed by `(source, external_id)`. Authors and
//! topics are JSON arrays, dates ISO-8601 text.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

use crate::error::{HarvestError, HarvestResult};
use crate::traits::store::{RecordStore, StoredRecord};
use crate::types::record::{Record, Source};

/// Default database file, relative to the working directory.
pub const DEFAULT_DB_PATH: &str = "./ai_opinion.sqlite";

/// SQLite-backed record store.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect to a database URL and run migrations.
    ///
    /// # Example URLs
    /// - `sqlite::memory:` - in-memory database (see [`SqliteStore::in_memory`])
    /// - `sqlite://./ai_opinion.sqlite?mode=rwc` - file, created if missing
    pub async fn new(database_url: &str) -> HarvestResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?;
        Self::connect(options, 5).await
    }

    /// Open (and create if missing) a database file.
    pub async fn open(path: impl AsRef<Path>) -> HarvestResult<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true);
        Self::connect(options, 5).await
    }

    /// In-memory store for tests.
    ///
    /// Uses a single long-lived connection; every new connection would see
    /// a fresh empty database.
    pub async fn in_memory() -> HarvestResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        Self::connect(options, 1).await
    }

    async fn connect(options: SqliteConnectOptions, max_connections: u32) -> HarvestResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> HarvestResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS articles (
                id INTEGER PRIMARY KEY,
                source TEXT NOT NULL,
                external_id TEXT NOT NULL,
                title TEXT NOT NULL,
                authors TEXT NOT NULL DEFAULT '[]',
                abstract TEXT NOT NULL DEFAULT '',
                url TEXT NOT NULL DEFAULT '',
                published TEXT,
                venue TEXT,
                topics TEXT,
                sentiment_compound REAL,
                relevance_score REAL,
                added_at TEXT NOT NULL,
                UNIQUE(source, external_id)
            );

            CREATE INDEX IF NOT EXISTS idx_articles_published ON articles(published);
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get the underlying pool (for ad-hoc queries).
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Database row for `articles`.
#[derive(FromRow)]
struct ArticleRow {
    source: String,
    external_id: String,
    title: String,
    authors: String,
    abstract_text: String,
    url: String,
    published: Option<String>,
    venue: Option<String>,
    topics: Option<String>,
    sentiment_compound: Option<f64>,
    relevance_score: Option<f64>,
    added_at: String,
}

fn corrupt(reason: String) -> HarvestError {
    HarvestError::Storage(reason.into())
}

impl ArticleRow {
    fn into_stored(self) -> HarvestResult<StoredRecord> {
        let source = Source::from_str(&self.source).map_err(corrupt)?;
        let published = self
            .published
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());
        let topics = self
            .topics
            .as_deref()
            .map(serde_json::from_str::<Vec<String>>)
            .transpose()?;
        let added_at = DateTime::parse_from_rfc3339(&self.added_at)
            .map_err(|e| corrupt(format!("bad added_at '{}': {e}", self.added_at)))?
            .with_timezone(&Utc);

        Ok(StoredRecord {
            record: Record {
                source,
                external_id: self.external_id,
                title: self.title,
                abstract_text: self.abstract_text,
                authors: serde_json::from_str(&self.authors)?,
                url: self.url,
                venue: self.venue,
                published,
                topics,
                sentiment_compound: self.sentiment_compound,
                relevance_score: self.relevance_score.map(|s| s as f32),
            },
            added_at,
        })
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn upsert(&self, records: &[Record]) -> HarvestResult<usize> {
        let added_at = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        for record in records {
            let authors = serde_json::to_string(&record.authors)?;
            let topics = record
                .topics
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?;

            sqlx::query(
                r#"
                INSERT INTO articles
                    (source, external_id, title, authors, abstract, url, published, venue,
                     topics, sentiment_compound, relevance_score, added_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(source, external_id) DO UPDATE SET
                    title = excluded.title,
                    authors = excluded.authors,
                    abstract = excluded.abstract,
                    url = excluded.url,
                    published = excluded.published,
                    venue = excluded.venue,
                    topics = COALESCE(excluded.topics, articles.topics),
                    sentiment_compound = COALESCE(excluded.sentiment_compound, articles.sentiment_compound),
                    relevance_score = COALESCE(excluded.relevance_score, articles.relevance_score),
                    added_at = excluded.added_at
                "#,
            )
            .bind(record.source.as_str())
            .bind(&record.external_id)
            .bind(&record.title)
            .bind(&authors)
            .bind(&record.abstract_text)
            .bind(&record.url)
            .bind(record.published.map(|d| d.format("%Y-%m-%d").to_string()))
            .bind(&record.venue)
            .bind(&topics)
            .bind(record.sentiment_compound)
            .bind(record.relevance_score.map(f64::from))
            .bind(&added_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(records = records.len(), "Upserted articles");
        Ok(records.len())
    }

    async fn fetch_all(&self) -> HarvestResult<Vec<StoredRecord>> {
        let rows = sqlx::query_as::<_, ArticleRow>(
            r#"
            SELECT source, external_id, title, authors, abstract AS abstract_text, url,
                   published, venue, topics, sentiment_compound, relevance_score, added_at
            FROM articles
            ORDER BY published IS NULL, published DESC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ArticleRow::into_stored).collect()
    }

    async fn count(&self) -> HarvestResult<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM articles")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }

    async fn count_by_source(&self) -> HarvestResult<BTreeMap<Source, usize>> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT source, COUNT(*) FROM articles GROUP BY source")
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter()
            .map(|(source, count)| Ok((Source::from_str(&source).map_err(corrupt)?, count as usize)))
            .collect()
    }
}
