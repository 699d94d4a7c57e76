//! Zero-shot classification capability.
//!
//! The inference engine is a black box: given texts, candidate labels and a
//! hypothesis template, it returns for each text the labels ranked by
//! descending probability, with probabilities summing to 1. The relevance
//! gate and the stance classifier both consume it through this trait so
//! tests can substitute [`crate::testing::MockClassifier`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{HarvestError, HarvestResult};

/// Tolerance for the probabilities-sum-to-one contract.
const SUM_TOLERANCE: f32 = 1e-3;

/// Ranked labels for one input text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZeroShotOutput {
    /// Labels by descending score
    pub labels: Vec<String>,

    /// Parallel scores
    pub scores: Vec<f32>,
}

impl ZeroShotOutput {
    /// Build an output from `(label, score)` pairs, ranking them.
    pub fn ranked(pairs: impl IntoIterator<Item = (impl Into<String>, f32)>) -> Self {
        let mut pairs: Vec<(String, f32)> = pairs.into_iter().map(|(l, s)| (l.into(), s)).collect();
        pairs.sort_by(|a, b| b.1.total_cmp(&a.1));
        let (labels, scores) = pairs.into_iter().unzip();
        Self { labels, scores }
    }

    /// Probability assigned to `label`.
    pub fn score_for(&self, label: &str) -> Option<f32> {
        self.labels
            .iter()
            .position(|l| l == label)
            .map(|i| self.scores[i])
    }

    /// Winning label and its probability.
    pub fn top(&self) -> Option<(&str, f32)> {
        self.labels
            .first()
            .zip(self.scores.first())
            .map(|(l, s)| (l.as_str(), *s))
    }

    /// Check the output against the candidate labels that were requested.
    pub fn validate(&self, candidate_labels: &[String]) -> HarvestResult<()> {
        if self.labels.len() != self.scores.len() {
            return Err(HarvestError::InvalidClassifierOutput {
                reason: format!(
                    "{} labels but {} scores",
                    self.labels.len(),
                    self.scores.len()
                ),
            });
        }
        if let Some(missing) = candidate_labels
            .iter()
            .find(|c| !self.labels.iter().any(|l| l == *c))
        {
            return Err(HarvestError::InvalidClassifierOutput {
                reason: format!("label '{missing}' missing from output"),
            });
        }
        if self.scores.iter().any(|s| !s.is_finite() || *s < 0.0) {
            return Err(HarvestError::InvalidClassifierOutput {
                reason: "scores must be finite and non-negative".into(),
            });
        }
        let total: f32 = self.scores.iter().sum();
        if (total - 1.0).abs() > SUM_TOLERANCE {
            return Err(HarvestError::InvalidClassifierOutput {
                reason: format!("scores sum to {total}, expected 1"),
            });
        }
        Ok(())
    }
}

/// Zero-shot classification capability.
///
/// Implementations wrap a specific inference provider and handle request
/// batching and response parsing. Initialized once at startup and shared as
/// `Arc<dyn ZeroShotClassifier>`.
#[async_trait]
pub trait ZeroShotClassifier: Send + Sync {
    /// Classify a batch of texts.
    ///
    /// Returns one output per input text, in input order.
    async fn classify(
        &self,
        texts: &[String],
        candidate_labels: &[String],
        hypothesis_template: &str,
    ) -> HarvestResult<Vec<ZeroShotOutput>>;

    /// Classify one text; equivalent to a one-element batch.
    async fn classify_one(
        &self,
        text: &str,
        candidate_labels: &[String],
        hypothesis_template: &str,
    ) -> HarvestResult<ZeroShotOutput> {
        let mut outputs = self
            .classify(&[text.to_string()], candidate_labels, hypothesis_template)
            .await?;
        outputs.pop().ok_or_else(|| HarvestError::InvalidClassifierOutput {
            reason: "empty response for single text".into(),
        })
    }

    /// Get the classifier name (for logging/debugging).
    fn name(&self) -> &str {
        "unknown"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_ranked_orders_by_score() {
        let output = ZeroShotOutput::ranked([("No", 0.2), ("Yes", 0.5), ("Uncertain", 0.3)]);
        assert_eq!(output.labels, labels(&["Yes", "Uncertain", "No"]));
        assert_eq!(output.top(), Some(("Yes", 0.5)));
        assert_eq!(output.score_for("No"), Some(0.2));
        assert_eq!(output.score_for("Maybe"), None);
    }

    #[test]
    fn test_validate_accepts_well_formed_output() {
        let output = ZeroShotOutput::ranked([("Yes", 0.6), ("No", 0.4)]);
        assert!(output.validate(&labels(&["Yes", "No"])).is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_sum_and_missing_labels() {
        let unnormalized = ZeroShotOutput::ranked([("Yes", 0.9), ("No", 0.4)]);
        assert!(unnormalized.validate(&labels(&["Yes", "No"])).is_err());

        let missing = ZeroShotOutput::ranked([("Yes", 1.0)]);
        assert!(missing.validate(&labels(&["Yes", "No"])).is_err());
    }
}
