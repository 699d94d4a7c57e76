//! Text enrichment: cleaning, sentiment and keyword assignment.

use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;
use vader_sentiment::SentimentIntensityAnalyzer;

use crate::pipeline::keywords::extract_keywords_corpus;
use crate::types::record::Record;

static CITATION_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\]]*\]").expect("valid citation regex"));

thread_local! {
    static VADER: SentimentIntensityAnalyzer<'static> = SentimentIntensityAnalyzer::new();
}

/// Collapse runs of whitespace to single spaces and trim.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove bracketed citation markers (`[12]`, `[Smith 2020]`) and normalize
/// whitespace.
///
/// Idempotent: `clean_text(clean_text(x)) == clean_text(x)`.
pub fn clean_text(text: &str) -> String {
    collapse_whitespace(&CITATION_MARKER.replace_all(text, " "))
}

/// VADER compound polarity of the cleaned text, in [-1, 1].
pub fn sentiment_compound(text: &str) -> f64 {
    let cleaned = clean_text(text);
    if cleaned.is_empty() {
        return 0.0;
    }
    VADER.with(|analyzer| {
        analyzer
            .polarity_scores(&cleaned)
            .get("compound")
            .copied()
            .unwrap_or(0.0)
            .clamp(-1.0, 1.0)
    })
}

/// Assign `topics` (corpus TF-IDF keywords) and `sentiment_compound` to
/// every record in the batch.
pub fn enrich(records: &mut [Record], top_k: usize) {
    let texts: Vec<String> = records.iter().map(Record::document_text).collect();
    let keywords = extract_keywords_corpus(&texts, top_k);

    for ((record, topics), text) in records.iter_mut().zip(keywords).zip(&texts) {
        record.topics = Some(topics);
        record.sentiment_compound = Some(sentiment_compound(text));
    }

    debug!(records = records.len(), top_k, "Enriched records");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::record::Source;
    use proptest::prelude::*;

    #[test]
    fn test_clean_text_strips_citations_and_whitespace() {
        assert_eq!(
            clean_text("  Minds [1, 2] and\n\tmachines [Searle 1980].  "),
            "Minds and machines ."
        );
        assert_eq!(clean_text(""), "");
    }

    #[test]
    fn test_clean_text_is_idempotent_on_clean_input() {
        let once = clean_text("Already clean text.");
        assert_eq!(clean_text(&once), once);
    }

    #[test]
    fn test_sentiment_polarity() {
        assert!(sentiment_compound("This is a wonderful, brilliant and happy result!") > 0.5);
        assert!(sentiment_compound("A terrible, awful and horrible failure.") < -0.5);
        assert_eq!(sentiment_compound("   "), 0.0);
    }

    #[test]
    fn test_enrich_fills_topics_and_sentiment() {
        let mut records = vec![
            Record::new(Source::Arxiv, "1", "Machine consciousness")
                .with_abstract("Machine consciousness in large language models."),
            Record::new(Source::Arxiv, "2", "Machine consciousness debate")
                .with_abstract("Philosophers debate machine consciousness."),
            Record::new(Source::Arxiv, "3", "Protein folding")
                .with_abstract("Structure prediction with deep networks."),
        ];
        enrich(&mut records, 8);

        for record in &records {
            assert!(record.topics.is_some());
            assert!(record.sentiment_compound.is_some());
        }
        let first = records[0].topics.as_ref().unwrap();
        assert!(first.contains(&"machine consciousness".to_string()));
        assert!(records[2].topics.as_ref().unwrap().is_empty());
    }

    proptest! {
        #[test]
        fn prop_clean_text_idempotent(text in "[a-z \\[\\]\\t\\n.,0-9]{0,80}") {
            let once = clean_text(&text);
            prop_assert_eq!(clean_text(&once), once);
        }

        #[test]
        fn prop_sentiment_in_range(text in "[a-zA-Z !.,]{0,80}") {
            let score = sentiment_compound(&text);
            prop_assert!((-1.0..=1.0).contains(&score));
        }
    }
}
