//! Lexical stance cues.
//!
//! Hand-written patterns for explicit claims about machine sentience. They
//! are matched against lowercased text and only nudge the zero-shot scores;
//! on their own they drive the lexical fallback.

use regex::RegexSet;
use std::sync::LazyLock;

/// Claims that a system is, or deserves treatment as, sentient.
static YES_PATTERNS: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"\b(is|are|becomes?|has|shows|demonstrates?)\s+(sentient|conscious|self[- ]aware)",
        r"\b(artificial|machine)\s+(consciousness|awareness|sentience)",
        r"\b(possesses?|exhibits?|capable of)\s+(awareness|conscious thought|subjective experience|qualia)",
        r"\b(deserves?|should be granted)\s+(personhood|moral consideration|rights)",
    ])
    .expect("valid yes patterns")
});

/// Denials and deflationary framings.
static NO_PATTERNS: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"\b(not|never|cannot|can't|won't|isn't|aren't)\s+(sentient|conscious|self[- ]aware)",
        r"\b(does\s+not|fails?\s+to|unlikely\s+to)\s+(show|exhibit|possess)\s+(consciousness|awareness|sentience)",
        r"\blacks?\s+(sentience|consciousness|awareness)",
        r"\bno\s+(evidence|sign|proof|basis)\s+(of|for)\s+(sentience|consciousness|awareness)",
        r"\bmerely\s+(a|an)\s+(tool|program|system|simulation|statistical model)",
        r"\b(just|only)\s+(an?\s+)?(algorithm|pattern recognizer|language model)",
        r"\bincapable of\s+(feeling|experience|awareness|subjectivity)",
        r"\bunfounded\s+(claims|assumptions)\s+about\s+(sentience|consciousness)",
    ])
    .expect("valid no patterns")
});

/// Hedged or explicitly open positions.
static UNCERTAIN_PATTERNS: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"\b(might|may|could|possibly|perhaps)\s+(be|become)\s+(sentient|conscious|aware)",
        r"\buncertain(ty)?\s+(about|regarding)?\s*(sentience|consciousness|awareness)",
        r"\bdebate(s|d)?\s+(whether|if)\s+(ai|machines?)\s+(are|can be)\s+(sentient|conscious)",
        r"\b(open|ongoing)\s+question\s+(of|about)\s+(sentience|consciousness)",
        r"\bcontroversial\s+(topic|issue)\s+(about|regarding)\s+(ai\s+)?(sentience|consciousness)",
        r"\bunclear\s+if\s+(ai|machines?)\s+(are|can be)\s+(sentient|conscious)",
    ])
    .expect("valid uncertain patterns")
});

/// Which cue families fire on a text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatternHits {
    pub yes: bool,
    pub no: bool,
    pub uncertain: bool,
}

impl PatternHits {
    /// Match all cue families against `text` (case-insensitive).
    pub fn scan(text: &str) -> Self {
        let lowered = text.to_lowercase();
        Self {
            yes: YES_PATTERNS.is_match(&lowered),
            no: NO_PATTERNS.is_match(&lowered),
            uncertain: UNCERTAIN_PATTERNS.is_match(&lowered),
        }
    }

    pub fn any(&self) -> bool {
        self.yes || self.no || self.uncertain
    }
}

pub fn matches_yes(text: &str) -> bool {
    YES_PATTERNS.is_match(&text.to_lowercase())
}

pub fn matches_no(text: &str) -> bool {
    NO_PATTERNS.is_match(&text.to_lowercase())
}

pub fn matches_uncertain(text: &str) -> bool {
    UNCERTAIN_PATTERNS.is_match(&text.to_lowercase())
}
