//! Corpus-level TF-IDF keyword extraction.
//!
//! Vocabulary is unigrams plus bigrams, where bigrams are formed after
//! stopword removal. Terms must appear in at least [`MIN_DOC_FREQ`]
//! documents and in at most [`MAX_DOC_RATIO`] of them, so keywords are only
//! meaningful relative to the batch they were extracted from.

use regex::Regex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::LazyLock;
use stop_words::{get, LANGUAGE};

/// Minimum number of documents a term must occur in.
pub const MIN_DOC_FREQ: usize = 2;

/// Maximum share of documents a term may occur in.
pub const MAX_DOC_RATIO: f64 = 0.9;

static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\w\w+\b").expect("valid token regex"));

/// NLTK English list (the `nltk` flavour of `stop-words`); keeps domain
/// terms such as "ai" and "system".
static STOP_WORDS: LazyLock<HashSet<String>> = LazyLock::new(|| {
    get(LANGUAGE::English)
        .into_iter()
        .map(|w| w.to_string())
        .collect()
});

/// Unigram and bigram term counts for one document.
fn term_counts(text: &str) -> BTreeMap<String, usize> {
    let lowered = text.to_lowercase();
    let tokens: Vec<&str> = TOKEN
        .find_iter(&lowered)
        .map(|m| m.as_str())
        .filter(|t| !STOP_WORDS.contains(*t))
        .collect();

    let mut counts = BTreeMap::new();
    for token in &tokens {
        *counts.entry((*token).to_string()).or_insert(0) += 1;
    }
    for pair in tokens.windows(2) {
        *counts.entry(format!("{} {}", pair[0], pair[1])).or_insert(0) += 1;
    }
    counts
}

/// Top `top_k` keywords per document, in input order.
///
/// Weights are `tf * idf` with `idf = ln((1 + n) / (1 + df)) + 1`, rows
/// L2-normalized. Only positive weights are returned, by descending weight
/// with ties broken alphabetically. A document with no surviving terms
/// gets an empty list.
pub fn extract_keywords_corpus(texts: &[String], top_k: usize) -> Vec<Vec<String>> {
    let n = texts.len();
    let counts: Vec<BTreeMap<String, usize>> = texts.iter().map(|t| term_counts(t)).collect();

    let mut doc_freq: HashMap<&str, usize> = HashMap::new();
    for doc in &counts {
        for term in doc.keys() {
            *doc_freq.entry(term.as_str()).or_insert(0) += 1;
        }
    }

    let max_docs = MAX_DOC_RATIO * n as f64;
    let idf: HashMap<&str, f64> = doc_freq
        .iter()
        .filter(|(_, &df)| df >= MIN_DOC_FREQ && df as f64 <= max_docs)
        .map(|(&term, &df)| (term, ((1 + n) as f64 / (1 + df) as f64).ln() + 1.0))
        .collect();

    counts
        .iter()
        .map(|doc| {
            let mut weighted: Vec<(&str, f64)> = doc
                .iter()
                .filter_map(|(term, &tf)| {
                    idf.get(term.as_str()).map(|w| (term.as_str(), tf as f64 * w))
                })
                .collect();

            let norm = weighted.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
            if norm > 0.0 {
                for (_, w) in &mut weighted {
                    *w /= norm;
                }
            }

            weighted.retain(|(_, w)| *w > 0.0);
            weighted.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
            weighted
                .into_iter()
                .take(top_k)
                .map(|(term, _)| term.to_string())
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_two_document_corpus_excludes_shared_terms() {
        // With two documents, a term must be in both (min df) and at most
        // in 1.8 of them (max df), so nothing survives.
        let corpus = docs(&[
            "Machine consciousness and qualia.",
            "Machine consciousness without qualia.",
        ]);
        let keywords = extract_keywords_corpus(&corpus, 8);
        assert_eq!(keywords, vec![Vec::<String>::new(), Vec::new()]);
    }

    #[test]
    fn test_terms_ranked_by_weight_then_alphabetically() {
        let corpus = docs(&[
            "sentience sentience sentience qualia",
            "sentience qualia robots",
            "robots factories",
            "weather report",
        ]);
        let keywords = extract_keywords_corpus(&corpus, 8);

        // "sentience" has tf 3 in doc 0, so it outranks "qualia".
        assert_eq!(keywords[0][0], "sentience");
        assert!(keywords[0].contains(&"qualia".to_string()));
        assert!(keywords[0].contains(&"sentience qualia".to_string()));
        // Equal tf and df: alphabetical.
        assert_eq!(keywords[1][..2], ["qualia".to_string(), "robots".to_string()]);
        assert!(keywords[3].is_empty());
    }

    #[test]
    fn test_stopwords_removed_before_bigrams() {
        let counts = term_counts("The neuron of the cortex");
        assert!(counts.contains_key("neuron cortex"));
        assert!(!counts.contains_key("the"));
        assert!(!counts.contains_key("of the"));
    }

    #[test]
    fn test_domain_terms_survive_stopwords() {
        let corpus = docs(&[
            "AI sentience and moral status",
            "AI sentience claims in chatbots",
            "AI sentience is debated by philosophers",
            "Protein folding with deep networks",
        ]);
        let keywords = extract_keywords_corpus(&corpus, 8);

        for doc in &keywords[..3] {
            assert_eq!(doc, &["ai", "ai sentience", "sentience"]);
        }
        assert!(keywords[3].is_empty());
        assert!(!STOP_WORDS.contains("research"));
        assert!(!STOP_WORDS.contains("system"));
    }

    #[test]
    fn test_top_k_and_single_letter_tokens() {
        let corpus = docs(&[
            "x y glacier volcano neuron cortex",
            "x y glacier volcano neuron",
            "x y cortex tundra",
            "desert",
        ]);
        let keywords = extract_keywords_corpus(&corpus, 2);
        assert_eq!(keywords[0].len(), 2);
        assert!(keywords[0].iter().all(|k| k.len() > 1));
    }

    #[test]
    fn test_empty_corpus() {
        assert!(extract_keywords_corpus(&[], 8).is_empty());
    }
}
