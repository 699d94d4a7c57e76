//! Relevance gate.
//!
//! Asks the zero-shot capability whether a text is about AI sentience at
//! all. The winning label's probability is the relevance score; a text
//! passes when the positive label wins with at least `threshold`.

use std::sync::Arc;
use tracing::{debug, info};

use crate::classifiers::cache::TextCache;
use crate::error::{HarvestError, HarvestResult};
use crate::traits::classifier::ZeroShotClassifier;
use crate::types::config::RelevanceConfig;
use crate::types::record::Record;

/// Zero-shot relevance filter with exact-text memoization.
pub struct RelevanceFilter {
    classifier: Arc<dyn ZeroShotClassifier>,
    threshold: f32,
    config: RelevanceConfig,
    labels: Vec<String>,
    cache: TextCache<(bool, f32)>,
}

impl RelevanceFilter {
    /// Create a filter; `threshold` is the minimum winning probability
    /// (clamped to [0, 1]).
    pub fn new(classifier: Arc<dyn ZeroShotClassifier>, threshold: f32) -> Self {
        Self::with_config(classifier, threshold, RelevanceConfig::default())
    }

    pub fn with_config(
        classifier: Arc<dyn ZeroShotClassifier>,
        threshold: f32,
        config: RelevanceConfig,
    ) -> Self {
        let labels = vec![
            config.relevant_label.clone(),
            config.irrelevant_label.clone(),
        ];
        Self {
            classifier,
            threshold: threshold.clamp(0.0, 1.0),
            config,
            labels,
            cache: TextCache::new(),
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// `(passes, score)` for one text.
    pub async fn is_relevant(&self, text: &str) -> HarvestResult<(bool, f32)> {
        let mut results = self.relevance_batch(&[text.to_string()]).await?;
        results.pop().ok_or_else(|| HarvestError::InvalidClassifierOutput {
            reason: "no relevance result for single text".into(),
        })
    }

    /// `(passes, score)` per text, in input order.
    ///
    /// Blank texts short-circuit to `(false, 0.0)` without a classifier
    /// call. A failing batch fails the whole call.
    pub async fn relevance_batch(&self, texts: &[String]) -> HarvestResult<Vec<(bool, f32)>> {
        let mut pending: Vec<String> = Vec::new();
        for text in texts {
            if text.trim().is_empty() || self.cache.get(text).is_some() || pending.contains(text) {
                continue;
            }
            pending.push(text.clone());
        }

        for chunk in pending.chunks(self.config.batch_size.max(1)) {
            let outputs = self
                .classifier
                .classify(chunk, &self.labels, &self.config.hypothesis_template)
                .await?;
            if outputs.len() != chunk.len() {
                return Err(HarvestError::InvalidClassifierOutput {
                    reason: format!("expected {} outputs, got {}", chunk.len(), outputs.len()),
                });
            }

            for (text, output) in chunk.iter().zip(outputs) {
                let (label, score) = output.top().ok_or_else(|| {
                    HarvestError::InvalidClassifierOutput {
                        reason: "empty label ranking".into(),
                    }
                })?;
                let score = if score.is_finite() {
                    score.clamp(0.0, 1.0)
                } else {
                    0.0
                };
                let passes = label == self.config.relevant_label && score >= self.threshold;
                self.cache.insert(text, (passes, score));
            }
        }

        debug!(texts = texts.len(), classified = pending.len(), "Relevance batch scored");

        Ok(texts
            .iter()
            .map(|t| {
                if t.trim().is_empty() {
                    (false, 0.0)
                } else {
                    self.cache.get(t).unwrap_or((false, 0.0))
                }
            })
            .collect())
    }

    /// Score every record, set `relevance_score`, and keep the ones that pass.
    pub async fn apply(&self, records: Vec<Record>) -> HarvestResult<Vec<Record>> {
        let total = records.len();
        let texts: Vec<String> = records.iter().map(Record::document_text).collect();
        let scores = self.relevance_batch(&texts).await?;

        let kept: Vec<Record> = records
            .into_iter()
            .zip(scores)
            .filter_map(|(mut record, (passes, score))| {
                record.relevance_score = Some(score);
                passes.then_some(record)
            })
            .collect();

        info!(
            total,
            kept = kept.len(),
            threshold = self.threshold,
            "Relevance gate applied"
        );
        Ok(kept)
    }
}
