//! `harvest` - collect AI sentience literature and report stances.
//!
//! ```text
//! harvest run --query "machine consciousness" --sources arxiv,openalex --report
//! harvest stance --lexical-only --from-year 2022 --search qualia
//! ```

mod config;
mod report;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use harvester::{
    default_adapters, run_harvest, HarvestOptions, HarvestQuery, HuggingFaceClassifier,
    HarvestError, InferenceCredentials, RecordStore, RelevanceFilter, SqliteStore,
    StanceClassifier, StanceView, ViewFilter, ZeroShotClassifier,
};
use harvester::types::config::StanceConfig;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{parse_sources, Config};

#[derive(Parser)]
#[command(name = "harvest")]
#[command(about = "Harvest scholarly work on AI sentience and summarize its stance")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Harvest, filter, enrich and store new articles
    Run(RunArgs),

    /// Classify stored articles and print the stance view
    Stance(StanceArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Search terms (OR-ed together)
    #[arg(long, num_args = 1..)]
    query: Vec<String>,

    /// Earliest publication year to keep
    #[arg(long)]
    start_year: Option<i32>,

    /// Maximum records per source
    #[arg(long)]
    max_records: Option<usize>,

    /// SQLite database file
    #[arg(long)]
    db: Option<String>,

    /// Minimum relevance probability in [0, 1]
    #[arg(long)]
    relevance_threshold: Option<f32>,

    /// Providers to query (arxiv, openalex, crossref, psyarxiv)
    #[arg(long, value_delimiter = ',')]
    sources: Vec<String>,

    /// Print database totals after the run
    #[arg(long)]
    report: bool,

    /// Per-source deadline in seconds
    #[arg(long, default_value_t = 600)]
    timeout: u64,
}

#[derive(Args)]
struct StanceArgs {
    /// Skip the zero-shot model and use stance patterns only
    #[arg(long)]
    lexical_only: bool,

    /// Only these providers
    #[arg(long = "source", value_delimiter = ',')]
    sources: Vec<String>,

    #[arg(long)]
    from_year: Option<i32>,

    #[arg(long)]
    to_year: Option<i32>,

    /// Case-insensitive title/abstract substring
    #[arg(long)]
    search: Option<String>,

    /// Include everything, not just the last five years
    #[arg(long)]
    all_years: bool,

    /// SQLite database file
    #[arg(long)]
    db: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "harvester=info,harvest_cli=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Commands::Run(args) => run(args, config).await,
        Commands::Stance(args) => stance(args, config).await,
    }
}

fn credentials(config: &Config) -> Option<InferenceCredentials> {
    config
        .hf_api_token
        .as_ref()
        .map(|token| InferenceCredentials::new(token.clone(), config.hf_model.clone()))
}

async fn open_store(path: &str) -> Result<SqliteStore> {
    SqliteStore::open(path)
        .await
        .with_context(|| format!("Failed to open database at {path}"))
}

async fn run(args: RunArgs, config: Config) -> Result<()> {
    let terms = if args.query.is_empty() {
        config.query_terms.clone()
    } else {
        args.query
    };
    let sources = if args.sources.is_empty() {
        config.sources.clone()
    } else {
        parse_sources(&args.sources)?
    };
    let query = HarvestQuery::new(terms)
        .with_start_year(args.start_year.unwrap_or(config.start_year))
        .with_max_records(args.max_records.unwrap_or(config.max_records));
    query.validate().context("Invalid harvest query")?;

    // Relevance gating has no lexical substitute.
    let credentials = credentials(&config)
        .context("HF_API_TOKEN must be set: the relevance gate needs the zero-shot model")?;
    let classifier = HuggingFaceClassifier::new(credentials)
        .context("Failed to initialize the zero-shot classifier")?;
    let relevance = RelevanceFilter::new(
        Arc::new(classifier),
        args.relevance_threshold.unwrap_or(config.relevance_threshold),
    );

    let db_path = args.db.unwrap_or(config.db_path);
    let store = open_store(&db_path).await?;
    let adapters = default_adapters(&sources).context("Failed to build source adapters")?;
    let options = HarvestOptions::default().with_adapter_timeout(args.timeout);

    info!(
        db = %db_path,
        sources = ?sources,
        threshold = relevance.threshold(),
        "Starting harvest run"
    );

    let report = run_harvest(&adapters, &query, &relevance, &store, &options)
        .await
        .context("Harvest aborted")?;
    info!(
        collected = report.collected,
        relevant = report.relevant,
        stored = report.stored,
        failed = report.failed_sources().len(),
        "Harvest run complete"
    );

    report::print_harvest_summary(&report);
    if args.report {
        report::print_db_report(&store).await?;
    }
    Ok(())
}

async fn stance(args: StanceArgs, config: Config) -> Result<()> {
    let db_path = args.db.unwrap_or(config.db_path.clone());
    let store = open_store(&db_path).await?;

    let stance_config = StanceConfig::default();
    let classifier = if args.lexical_only {
        StanceClassifier::lexical(stance_config)
    } else {
        if config.hf_api_token.is_none() {
            warn!("HF_API_TOKEN not set, stance view uses lexical patterns only");
        }
        let capability = credentials(&config)
            .ok_or_else(|| HarvestError::ClassifierUnavailable {
                reason: "HF_API_TOKEN not set".into(),
            })
            .and_then(HuggingFaceClassifier::new)
            .map(|c| Arc::new(c) as Arc<dyn ZeroShotClassifier>);
        StanceClassifier::from_capability(capability, stance_config)
    };

    let mut filter = ViewFilter::new();
    if !args.sources.is_empty() {
        filter = filter.with_sources(parse_sources(&args.sources)?);
    }
    if args.from_year.is_some() || args.to_year.is_some() {
        filter = filter.with_year_range(
            args.from_year.unwrap_or(i32::MIN),
            args.to_year.unwrap_or(i32::MAX),
        );
    }
    if let Some(search) = args.search {
        filter = filter.with_search(search);
    }
    if args.all_years {
        filter = filter.with_recent_years(None);
    }

    let records: Vec<_> = store
        .fetch_all()
        .await
        .context("Failed to load stored articles")?
        .into_iter()
        .map(|stored| stored.record)
        .collect();

    info!(
        db = %db_path,
        stored = records.len(),
        lexical = classifier.is_lexical(),
        "Building stance view"
    );
    let view = StanceView::build(records, &filter, &classifier).await;
    report::print_stance_view(&view, classifier.is_lexical());
    Ok(())
}
