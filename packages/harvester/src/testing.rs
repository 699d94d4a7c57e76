//! Testing utilities including mock implementations.
//!
//! These let applications and tests exercise the pipeline without network
//! access or a hosted inference model.

use async_stream::stream;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use url::Url;

use crate::error::{FetchError, FetchResult, HarvestError, HarvestResult};
use crate::traits::{
    classifier::{ZeroShotClassifier, ZeroShotOutput},
    source::{RecordStream, SourceAdapter},
    transport::Transport,
};
use crate::types::{config::HarvestQuery, record::Record, record::Source};

fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

/// A mock zero-shot classifier.
///
/// Texts containing a registered pattern get that pattern's scores (the
/// longest matching pattern wins); anything else gets a uniform
/// distribution over the candidate labels. Clones share state.
#[derive(Clone, Default)]
pub struct MockClassifier {
    scores: Arc<RwLock<Vec<(String, Vec<(String, f32)>)>>>,

    fail: bool,

    /// Batch sizes of every `classify` call
    calls: Arc<RwLock<Vec<usize>>>,
}

impl MockClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scores for texts containing `pattern`.
    pub fn with_scores(
        self,
        pattern: impl Into<String>,
        scores: impl IntoIterator<Item = (impl Into<String>, f32)>,
    ) -> Self {
        write(&self.scores).push((
            pattern.into(),
            scores.into_iter().map(|(l, s)| (l.into(), s)).collect(),
        ));
        self
    }

    /// Make every call fail.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Batch sizes of the calls made so far.
    pub fn calls(&self) -> Vec<usize> {
        read(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        read(&self.calls).len()
    }

    fn output_for(&self, text: &str, candidate_labels: &[String]) -> ZeroShotOutput {
        let scores = read(&self.scores);
        let matched = scores
            .iter()
            .filter(|(pattern, _)| text.contains(pattern.as_str()))
            .max_by_key(|(pattern, _)| pattern.len());

        match matched {
            Some((_, pairs)) => ZeroShotOutput::ranked(pairs.iter().cloned()),
            None => {
                let share = 1.0 / candidate_labels.len().max(1) as f32;
                ZeroShotOutput::ranked(candidate_labels.iter().map(|l| (l.clone(), share)))
            }
        }
    }
}

#[async_trait]
impl ZeroShotClassifier for MockClassifier {
    async fn classify(
        &self,
        texts: &[String],
        candidate_labels: &[String],
        _hypothesis_template: &str,
    ) -> HarvestResult<Vec<ZeroShotOutput>> {
        write(&self.calls).push(texts.len());
        if self.fail {
            return Err(HarvestError::Classifier("mock classifier failure".into()));
        }
        Ok(texts
            .iter()
            .map(|t| self.output_for(t, candidate_labels))
            .collect())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// A mock transport serving canned bodies by URL substring.
///
/// The first registered substring found in the URL decides the response;
/// unmatched URLs get a 404. Clones share state.
#[derive(Clone, Default)]
pub struct MockTransport {
    routes: Arc<RwLock<Vec<(String, Option<String>)>>>,
    calls: Arc<RwLock<Vec<String>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for URLs containing `pattern`.
    pub fn with_response(self, pattern: impl Into<String>, body: impl Into<String>) -> Self {
        write(&self.routes).push((pattern.into(), Some(body.into())));
        self
    }

    /// Fail with a 503 for URLs containing `pattern`.
    pub fn with_failure(self, pattern: impl Into<String>) -> Self {
        write(&self.routes).push((pattern.into(), None));
        self
    }

    /// URLs requested so far.
    pub fn requested_urls(&self) -> Vec<String> {
        read(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        read(&self.calls).len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, url: &Url) -> FetchResult<String> {
        let url = url.to_string();
        write(&self.calls).push(url.clone());

        let routes = read(&self.routes);
        match routes.iter().find(|(pattern, _)| url.contains(pattern.as_str())) {
            Some((_, Some(body))) => Ok(body.clone()),
            Some((_, None)) => Err(FetchError::Status { status: 503, url }),
            None => Err(FetchError::Status { status: 404, url }),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[derive(Clone, Copy, Default)]
enum SourceBehavior {
    #[default]
    Normal,
    Fail,
    Panic,
}

/// A mock source adapter yielding fixed records.
///
/// Honors `max_records`. Clones share the call counter.
#[derive(Clone)]
pub struct MockSource {
    source: Source,
    records: Vec<Record>,
    behavior: SourceBehavior,
    delay: Option<Duration>,
    fetches: Arc<RwLock<HashMap<Source, usize>>>,
}

impl MockSource {
    pub fn new(source: Source) -> Self {
        Self {
            source,
            records: Vec::new(),
            behavior: SourceBehavior::Normal,
            delay: None,
            fetches: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn with_records(mut self, records: Vec<Record>) -> Self {
        self.records = records;
        self
    }

    /// Sleep before yielding anything.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Refuse to start (`fetch` errs).
    pub fn failing(mut self) -> Self {
        self.behavior = SourceBehavior::Fail;
        self
    }

    /// Panic while streaming.
    pub fn panicking(mut self) -> Self {
        self.behavior = SourceBehavior::Panic;
        self
    }

    pub fn fetch_count(&self) -> usize {
        read(&self.fetches).get(&self.source).copied().unwrap_or(0)
    }
}

impl SourceAdapter for MockSource {
    fn source(&self) -> Source {
        self.source
    }

    fn fetch<'a>(&'a self, query: &'a HarvestQuery) -> HarvestResult<RecordStream<'a>> {
        *write(&self.fetches).entry(self.source).or_insert(0) += 1;

        if let SourceBehavior::Fail = self.behavior {
            return Err(HarvestError::Fetch(FetchError::Status {
                status: 503,
                url: format!("mock://{}", self.source),
            }));
        }

        Ok(Box::pin(stream! {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if let SourceBehavior::Panic = self.behavior {
                panic!("mock source {} panicked", self.source);
            }
            for record in self.records.iter().take(query.max_records) {
                yield record.clone();
            }
        }))
    }
}
