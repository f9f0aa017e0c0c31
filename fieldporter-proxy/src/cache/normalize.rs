//! Query normalization and personalization detection.
//!
//! The normalized form of a query is the cache key: two messages that
//! normalize to the same string share one cache entry.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashSet;

static TRAILING_PUNCTUATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[?.!]+$").expect("Invalid trailing punctuation regex"));

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("Invalid whitespace regex"));

static PRONOUNS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:my|our|we|i|me)\b").expect("Invalid pronoun regex"));

static COMPANY_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\w+)\s+(?:company|corp|ltd|llc|inc)\b").expect("Invalid company regex")
});

static PERSONAL_PHRASES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\b(?:my|our)\s+(?:company|business|team|organi[sz]ation|startup|firm|clients?|customers?)\b",
        r"\bwe\s+(?:have|need|want|are|use)\b",
        r"\bi\s+(?:need|want|have|run|own)\b",
        r"\b(?:specific\s+to|unique|custom|bespoke|tailored)\b",
        r"\b\d+\s*(?:employees|staff|people|users)\b",
    ]
    .iter()
    .map(|p| Regex::new(&format!("(?i){}", p)).expect("Invalid personalization regex"))
    .collect()
});

// Case-sensitive on purpose: only the raw message still carries capitals.
static LEGAL_ENTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-Z][A-Za-z0-9&]*\s+(?:Ltd|Corp|Inc|LLC)\b").expect("Invalid legal entity regex")
});

/// Turns raw chat messages into cache keys
#[derive(Debug, Clone, Default)]
pub struct QueryNormalizer {
    protected_terms: HashSet<String>,
}

impl QueryNormalizer {
    /// Create a normalizer that leaves the given words untouched when
    /// collapsing company names
    pub fn new<I, S>(protected_terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            protected_terms: protected_terms
                .into_iter()
                .map(|t| t.as_ref().trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    /// Normalize a raw query into its cache key.
    ///
    /// Never fails; empty or whitespace-only input yields an empty key.
    /// The result is a fixed point: normalizing it again returns it unchanged.
    pub fn normalize(&self, raw: &str) -> String {
        // Every pass that changes the text removes characters or words,
        // so this always settles.
        let mut current = self.pass(raw);
        loop {
            let next = self.pass(&current);
            if next == current {
                return current;
            }
            current = next;
        }
    }

    fn pass(&self, input: &str) -> String {
        let lowered = input.to_lowercase();
        let stripped = TRAILING_PUNCTUATION.replace(lowered.trim(), "");
        let collapsed = WHITESPACE.replace_all(&stripped, " ");
        let without_pronouns = PRONOUNS.replace_all(&collapsed, "");
        let collapsed = WHITESPACE.replace_all(&without_pronouns, " ");
        let replaced = COMPANY_NAME.replace_all(&collapsed, |caps: &Captures| {
            if self.protected_terms.contains(&caps[1].to_lowercase()) {
                caps[0].to_string()
            } else {
                "company".to_string()
            }
        });
        replaced.trim().to_string()
    }

    /// Whether a query is too specific to one visitor to share its answer.
    ///
    /// Both forms are checked: normalization drops the possessives and
    /// capitals that most of the signals rely on.
    pub fn is_personalized(&self, raw: &str, normalized: &str) -> bool {
        if LEGAL_ENTITY.is_match(raw) {
            return true;
        }
        PERSONAL_PHRASES
            .iter()
            .any(|re| re.is_match(raw) || re.is_match(normalized))
    }
}
