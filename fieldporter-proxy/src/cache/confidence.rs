//! Confidence scoring for model answers.
//!
//! The score decides whether an answer is reusable enough to cache and
//! which TTL tier it lands in. Scorers are pluggable so the heuristic can
//! be replaced without touching the cache itself.

/// Rates how generic and reusable an answer is, in [0, 1]
pub trait ConfidenceScorer: Send + Sync {
    fn score(&self, query: &str, response: &str, personalized: bool) -> f32;
}

/// Default heuristic based on length, structure and hedging language
#[derive(Debug, Clone)]
pub struct HeuristicScorer {
    pub base: f32,
    pub long_bonus: f32,
    pub structure_bonus: f32,
    pub apology_penalty: f32,
    pub personalized_penalty: f32,
    pub short_penalty: f32,
    /// Character count above which an answer counts as thorough
    pub long_chars: usize,
    /// Character count below which an answer counts as thin
    pub short_chars: usize,
}

impl Default for HeuristicScorer {
    fn default() -> Self {
        Self {
            base: 0.8,
            long_bonus: 0.05,
            structure_bonus: 0.05,
            apology_penalty: 0.3,
            personalized_penalty: 0.2,
            short_penalty: 0.2,
            long_chars: 200,
            short_chars: 40,
        }
    }
}

const APOLOGY_PHRASES: &[&str] = &[
    "sorry",
    "i apologize",
    "i apologise",
    "unfortunately",
    "i'm not sure",
    "i am not sure",
    "i don't know",
    "i do not know",
    "unable to",
    "i can't help",
];

const STRUCTURE_MARKERS: &[&str] = &["\n- ", "\n* ", "\n• ", "\n1.", "**"];

impl ConfidenceScorer for HeuristicScorer {
    fn score(&self, _query: &str, response: &str, personalized: bool) -> f32 {
        let text = response.trim();
        let lower = text.to_lowercase();
        let chars = text.chars().count();

        let mut score = self.base;

        if chars > self.long_chars {
            score += self.long_bonus;
        }
        if chars < self.short_chars {
            score -= self.short_penalty;
        }
        if STRUCTURE_MARKERS.iter().any(|m| text.contains(m)) {
            score += self.structure_bonus;
        }
        if APOLOGY_PHRASES.iter().any(|p| lower.contains(p)) {
            score -= self.apology_penalty;
        }
        if personalized {
            score -= self.personalized_penalty;
        }

        score.clamp(0.0, 1.0)
    }
}
