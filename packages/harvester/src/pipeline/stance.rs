//! Hybrid stance classification.
//!
//! Zero-shot probabilities for Yes/No/Uncertain are nudged by lexical cues
//! ([`crate::pipeline::patterns`]), re-normalized, then passed through a
//! small decision policy:
//!
//! 1. best score below the confidence floor: `Uncertain`, confidence = best
//! 2. best label `Uncertain` and |Yes - No| below the tie band: the higher
//!    of Yes/No (Yes on equality), confidence = that score
//! 3. otherwise the best label with its score
//!
//! Without a zero-shot capability the patterns alone decide, in priority
//! order No, Yes, Uncertain, with a conservative `No` default.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::classifiers::cache::TextCache;
use crate::error::HarvestResult;
use crate::pipeline::patterns::PatternHits;
use crate::traits::classifier::{ZeroShotClassifier, ZeroShotOutput};
use crate::types::config::StanceConfig;
use crate::types::record::{Stance, StanceResult};

/// Three-way stance score vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusedScores {
    pub yes: f32,
    pub no: f32,
    pub uncertain: f32,
}

impl FusedScores {
    pub fn new(yes: f32, no: f32, uncertain: f32) -> Self {
        Self { yes, no, uncertain }
    }

    /// Base scores from a zero-shot output; missing or invalid labels count as 0.
    pub fn from_output(output: &ZeroShotOutput) -> Self {
        let score = |stance: Stance| {
            output
                .score_for(stance.as_str())
                .filter(|s| s.is_finite())
                .map_or(0.0, |s| s.clamp(0.0, 1.0))
        };
        Self::new(score(Stance::Yes), score(Stance::No), score(Stance::Uncertain))
    }

    pub fn get(&self, stance: Stance) -> f32 {
        match stance {
            Stance::Yes => self.yes,
            Stance::No => self.no,
            Stance::Uncertain => self.uncertain,
        }
    }

    pub fn sum(&self) -> f32 {
        self.yes + self.no + self.uncertain
    }

    /// Scale to sum to 1; an all-zero vector becomes uniform.
    pub fn normalized(&self) -> Self {
        let total = self.sum();
        if total > 0.0 && total.is_finite() {
            Self::new(self.yes / total, self.no / total, self.uncertain / total)
        } else {
            let third = 1.0 / 3.0;
            Self::new(third, third, third)
        }
    }

    /// Labels by descending score; ties keep Yes, No, Uncertain order.
    pub fn ranked(&self) -> [(Stance, f32); 3] {
        let mut ranked = Stance::LABELS.map(|s| (s, self.get(s)));
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }

    pub fn best(&self) -> (Stance, f32) {
        self.ranked()[0]
    }
}

/// Apply lexical boosts to base scores and re-normalize.
pub fn fuse(base: FusedScores, hits: PatternHits, config: &StanceConfig) -> FusedScores {
    let mut boosted = base;
    if hits.no {
        boosted.no += config.no_boost;
    }
    if hits.yes {
        boosted.yes += config.yes_boost;
    }
    if hits.uncertain {
        boosted.uncertain += config.uncertain_boost;
    }
    boosted.normalized()
}

/// Decision policy over a score vector.
pub fn decide(scores: &FusedScores, config: &StanceConfig) -> StanceResult {
    let [(best, best_score), _second, _] = scores.ranked();

    if best_score < config.confidence_floor {
        return StanceResult::new(Stance::Uncertain, best_score);
    }

    if best == Stance::Uncertain {
        if (scores.yes - scores.no).abs() < config.tie_band {
            return if scores.yes >= scores.no {
                StanceResult::new(Stance::Yes, scores.yes)
            } else {
                StanceResult::new(Stance::No, scores.no)
            };
        }
        return StanceResult::new(Stance::Uncertain, best_score);
    }

    StanceResult::new(best, best_score)
}

/// Pattern-only stance used when no zero-shot capability is available.
pub fn lexical_fallback(hits: PatternHits, config: &StanceConfig) -> StanceResult {
    if hits.no {
        StanceResult::new(Stance::No, config.fallback_no_confidence)
    } else if hits.yes {
        StanceResult::new(Stance::Yes, config.fallback_yes_confidence)
    } else if hits.uncertain {
        StanceResult::new(Stance::Uncertain, config.fallback_uncertain_confidence)
    } else {
        StanceResult::new(config.fallback_default, config.fallback_default_confidence)
    }
}

/// Stance classifier with optional zero-shot backing and a result cache.
pub struct StanceClassifier {
    classifier: Option<Arc<dyn ZeroShotClassifier>>,
    config: StanceConfig,
    labels: Vec<String>,
    cache: TextCache<StanceResult>,
}

impl StanceClassifier {
    /// Hybrid classifier over a zero-shot capability.
    pub fn new(classifier: Arc<dyn ZeroShotClassifier>, config: StanceConfig) -> Self {
        Self::build(Some(classifier), config)
    }

    /// Lexical-only classifier.
    pub fn lexical(config: StanceConfig) -> Self {
        Self::build(None, config)
    }

    /// Use the capability if initialization succeeded, else fall back to
    /// lexical scoring.
    pub fn from_capability(
        capability: HarvestResult<Arc<dyn ZeroShotClassifier>>,
        config: StanceConfig,
    ) -> Self {
        match capability {
            Ok(classifier) => Self::new(classifier, config),
            Err(e) => {
                warn!(error = %e, "Zero-shot capability unavailable, using lexical stance");
                Self::lexical(config)
            }
        }
    }

    fn build(classifier: Option<Arc<dyn ZeroShotClassifier>>, config: StanceConfig) -> Self {
        Self {
            classifier,
            config,
            labels: Stance::LABELS.iter().map(|s| s.as_str().to_string()).collect(),
            cache: TextCache::new(),
        }
    }

    pub fn config(&self) -> &StanceConfig {
        &self.config
    }

    pub fn is_lexical(&self) -> bool {
        self.classifier.is_none()
    }

    /// Fused score vector for a text given its zero-shot output.
    pub fn fused_scores(&self, text: &str, output: &ZeroShotOutput) -> FusedScores {
        fuse(
            FusedScores::from_output(output),
            PatternHits::scan(text),
            &self.config,
        )
    }

    /// Final stance for a text given its zero-shot output.
    pub fn score(&self, text: &str, output: &ZeroShotOutput) -> StanceResult {
        decide(&self.fused_scores(text, output), &self.config)
    }

    pub fn classify_lexical(&self, text: &str) -> StanceResult {
        lexical_fallback(PatternHits::scan(text), &self.config)
    }

    pub async fn classify(&self, text: &str) -> StanceResult {
        self.classify_batch(&[text.to_string()])
            .await
            .pop()
            .unwrap_or_else(|| self.classify_lexical(text))
    }

    /// Classify texts in input order.
    ///
    /// Each text is fused and decided on its own even though the capability
    /// is called once per chunk. A failing chunk falls back to lexical
    /// scoring for its texts.
    pub async fn classify_batch(&self, texts: &[String]) -> Vec<StanceResult> {
        let mut results: HashMap<&str, StanceResult> = HashMap::new();
        let mut pending: Vec<String> = Vec::new();

        for text in texts {
            if results.contains_key(text.as_str()) || pending.contains(text) {
                continue;
            }
            match self.cache.get(text) {
                Some(hit) => {
                    results.insert(text.as_str(), hit);
                }
                None => pending.push(text.clone()),
            }
        }

        let cached = texts.len() - pending.len();
        let computed = self.compute(&pending).await;
        for (text, result) in pending.iter().zip(&computed) {
            self.cache.insert(text, *result);
        }
        let computed: HashMap<&str, StanceResult> = pending
            .iter()
            .map(String::as_str)
            .zip(computed)
            .collect();

        debug!(
            texts = texts.len(),
            computed = computed.len(),
            cached,
            "Stance batch classified"
        );

        texts
            .iter()
            .map(|t| {
                results
                    .get(t.as_str())
                    .or_else(|| computed.get(t.as_str()))
                    .copied()
                    .unwrap_or_else(|| self.classify_lexical(t))
            })
            .collect()
    }

    async fn compute(&self, texts: &[String]) -> Vec<StanceResult> {
        let Some(classifier) = &self.classifier else {
            return texts.iter().map(|t| self.classify_lexical(t)).collect();
        };

        let mut results = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.config.batch_size.max(1)) {
            match classifier
                .classify(chunk, &self.labels, &self.config.hypothesis_template)
                .await
            {
                Ok(outputs) if outputs.len() == chunk.len() => {
                    results.extend(
                        chunk
                            .iter()
                            .zip(&outputs)
                            .map(|(text, output)| self.score(text, output)),
                    );
                }
                Ok(outputs) => {
                    warn!(
                        expected = chunk.len(),
                        got = outputs.len(),
                        classifier = classifier.name(),
                        "Zero-shot output count mismatch, using lexical stance for chunk"
                    );
                    results.extend(chunk.iter().map(|t| self.classify_lexical(t)));
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        classifier = classifier.name(),
                        "Zero-shot batch failed, using lexical stance for chunk"
                    );
                    results.extend(chunk.iter().map(|t| self.classify_lexical(t)));
                }
            }
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockClassifier;
    use proptest::prelude::*;

    fn config() -> StanceConfig {
        StanceConfig::default()
    }

    fn output(yes: f32, no: f32, uncertain: f32) -> ZeroShotOutput {
        ZeroShotOutput::ranked([("Yes", yes), ("No", no), ("Uncertain", uncertain)])
    }

    #[test]
    fn test_no_pattern_with_no_argmax_is_no() {
        let classifier = StanceClassifier::lexical(config());
        let result = classifier.score(
            "These systems lack consciousness entirely.",
            &output(0.2, 0.5, 0.3),
        );
        assert_eq!(result.stance, Stance::No);
        assert!(result.confidence > 0.4);
    }

    #[test]
    fn test_low_best_score_forces_uncertain() {
        let scores = fuse(
            FusedScores::new(0.34, 0.33, 0.33),
            PatternHits::default(),
            &config(),
        );
        let result = decide(&scores, &config());
        assert_eq!(result.stance, Stance::Uncertain);
        assert!((result.confidence - 0.34).abs() < 1e-6);
    }

    #[test]
    fn test_uncertain_argmax_with_close_yes_no_resolves_to_higher() {
        let result = decide(&FusedScores::new(0.45, 0.40, 0.48), &config());
        assert_eq!(result.stance, Stance::Yes);
        assert!((result.confidence - 0.45).abs() < 1e-6);

        let result = decide(&FusedScores::new(0.40, 0.45, 0.48), &config());
        assert_eq!(result.stance, Stance::No);
    }

    #[test]
    fn test_exact_yes_no_tie_goes_to_yes() {
        let result = decide(&FusedScores::new(0.2, 0.2, 0.6), &config());
        assert_eq!(result.stance, Stance::Yes);
        assert!((result.confidence - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_uncertain_kept_when_yes_no_far_apart() {
        let result = decide(&FusedScores::new(0.05, 0.45, 0.5), &config());
        assert_eq!(result.stance, Stance::Uncertain);
        assert!((result.confidence - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_boosts_are_non_exclusive() {
        let hits = PatternHits {
            yes: true,
            no: true,
            uncertain: true,
        };
        let fused = fuse(FusedScores::new(0.2, 0.2, 0.6), hits, &config());
        let total = 0.2 + 0.2 + 0.6 + 0.25 + 0.20 + 0.05;
        assert!((fused.no - 0.45 / total).abs() < 1e-6);
        assert!((fused.yes - 0.40 / total).abs() < 1e-6);
        assert!((fused.uncertain - 0.65 / total).abs() < 1e-6);
    }

    #[test]
    fn test_lexical_fallback_priority() {
        let c = config();
        let all = PatternHits {
            yes: true,
            no: true,
            uncertain: true,
        };
        assert_eq!(lexical_fallback(all, &c), StanceResult::new(Stance::No, 0.85));

        let yes_and_unsure = PatternHits {
            yes: true,
            uncertain: true,
            ..Default::default()
        };
        assert_eq!(
            lexical_fallback(yes_and_unsure, &c),
            StanceResult::new(Stance::Yes, 0.75)
        );

        let unsure = PatternHits {
            uncertain: true,
            ..Default::default()
        };
        assert_eq!(
            lexical_fallback(unsure, &c),
            StanceResult::new(Stance::Uncertain, 0.6)
        );

        assert_eq!(
            lexical_fallback(PatternHits::default(), &c),
            StanceResult::new(Stance::No, 0.55)
        );
    }

    #[test]
    fn test_missing_labels_count_as_zero() {
        let partial = ZeroShotOutput::ranked([("Yes", 0.9)]);
        let scores = FusedScores::from_output(&partial);
        assert_eq!(scores, FusedScores::new(0.9, 0.0, 0.0));
        assert_eq!(FusedScores::new(0.0, 0.0, 0.0).normalized().sum(), 1.0);
    }

    #[tokio::test]
    async fn test_batch_keeps_documents_independent() {
        let mock = MockClassifier::new()
            .with_scores("It is merely a tool.", [("Yes", 0.3), ("No", 0.4), ("Uncertain", 0.3)])
            .with_scores("Plain text.", [("Yes", 0.3), ("No", 0.4), ("Uncertain", 0.3)]);
        let classifier = StanceClassifier::new(Arc::new(mock.clone()), config());

        let texts = vec!["It is merely a tool.".to_string(), "Plain text.".to_string()];
        let batch = classifier.classify_batch(&texts).await;

        // Same base scores, only the first gets the No boost.
        assert_eq!(batch[0].stance, Stance::No);
        assert!(batch[0].confidence > batch[1].confidence);
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_results_are_cached_by_text() {
        let mock = MockClassifier::new();
        let classifier =
            StanceClassifier::new(Arc::new(mock.clone()), config().with_batch_size(2));

        let texts: Vec<String> = ["a", "b", "c", "a"].iter().map(|s| s.to_string()).collect();
        let first = classifier.classify_batch(&texts).await;
        assert_eq!(first.len(), 4);
        assert_eq!(first[0], first[3]);
        assert_eq!(mock.call_count(), 2);

        classifier.classify_batch(&texts).await;
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn test_failing_capability_falls_back_to_lexical() {
        let mock = MockClassifier::new().failing();
        let classifier = StanceClassifier::new(Arc::new(mock), config());

        let result = classifier.classify("Such systems are not sentient.").await;
        assert_eq!(result, StanceResult::new(Stance::No, 0.85));
    }

    #[tokio::test]
    async fn test_unavailable_capability_builds_lexical_classifier() {
        let capability: HarvestResult<Arc<dyn ZeroShotClassifier>> =
            Err(crate::error::HarvestError::ClassifierUnavailable {
                reason: "no token".into(),
            });
        let classifier = StanceClassifier::from_capability(capability, config());
        assert!(classifier.is_lexical());
        assert_eq!(
            classifier.classify("Nothing to see here").await,
            StanceResult::new(Stance::No, 0.55)
        );
    }

    proptest! {
        #[test]
        fn prop_fused_scores_sum_to_one(
            yes in 0.0f32..1.0,
            no in 0.0f32..1.0,
            uncertain in 0.0f32..1.0,
            hit_yes: bool,
            hit_no: bool,
            hit_unsure: bool,
        ) {
            let hits = PatternHits { yes: hit_yes, no: hit_no, uncertain: hit_unsure };
            let fused = fuse(FusedScores::new(yes, no, uncertain), hits, &config());
            prop_assert!((fused.sum() - 1.0).abs() < 1e-5);

            let result = decide(&fused, &config());
            prop_assert!((0.0..=1.0).contains(&result.confidence));
        }
    }
}
