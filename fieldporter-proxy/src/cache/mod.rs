//! Response caching for the chat assistant.
//!
//! Every chat turn is resolved against two tiers before the language
//! model is called:
//!
//! 1. **Quick responses**: a static pattern table of canned answers
//! 2. **LRU store**: previously generated answers keyed by normalized query
//!
//! # Architecture
//!
//! ```text
//! Incoming message
//!        │
//!        ▼
//! ┌──────────────┐
//! │  Normalizer  │ ─── lowercase, strip pronouns, collapse company names
//! └──────┬───────┘
//!        ▼
//! ┌──────────────┐
//! │    Quick     │ ─── first matching pattern wins
//! └──────┬───────┘
//!        │ Miss
//!        ▼
//! ┌──────────────┐
//! │  LRU store   │ ─── TTL by confidence (24h / 1h)
//! └──────┬───────┘
//!        │ Miss
//!        ▼
//!  Caller asks the model, then `record`s the answer
//! ```
//!
//! The cache never fails: every operation returns a value and a fault
//! degrades to a miss. State is per process; nothing is shared across
//! instances.

mod analytics;
mod config;
mod confidence;
mod normalize;
mod quick;
mod store;

pub use analytics::{AnalyticsSnapshot, CacheAnalytics, PerformanceTier, QueryFrequency};
pub use config::CacheConfig;
pub use confidence::{ConfidenceScorer, HeuristicScorer};
pub use normalize::QueryNormalizer;
pub use quick::{QuickCategory, QuickResponder, QuickResponse, QUICK_RESPONSE_CONFIDENCE};
pub use store::{CacheEntry, ExpiryPolicy, ResponseStore};

use regex::RegexBuilder;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Which tier answered a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheSource {
    Quick,
    Cache,
}

impl CacheSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheSource::Quick => "quick",
            CacheSource::Cache => "cache",
        }
    }
}

/// Result of resolving a query against the cache
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheLookup {
    /// Answer text; empty on a miss
    pub response: String,
    /// Tier that answered, `None` on a miss
    pub source: Option<CacheSource>,
    /// Time spent resolving
    pub latency_ms: f64,
    /// Confidence of the answer; 0 on a miss
    pub confidence: f32,
}

impl CacheLookup {
    pub fn is_hit(&self) -> bool {
        self.source.is_some()
    }
}

/// Quick responses, LRU store and analytics behind one entry point
pub struct ResponseCache {
    normalizer: QueryNormalizer,
    quick: QuickResponder,
    store: Mutex<ResponseStore>,
    analytics: CacheAnalytics,
    config: CacheConfig,
}

impl ResponseCache {
    /// Create a new response cache with the given configuration
    pub fn new(config: CacheConfig, contact_email: &str) -> Self {
        Self::with_responder(config, QuickResponder::new(contact_email))
    }

    /// Create a cache around a specific quick responder (e.g. a seeded one)
    pub fn with_responder(config: CacheConfig, quick: QuickResponder) -> Self {
        Self {
            normalizer: QueryNormalizer::new(&config.protected_terms),
            quick,
            store: Mutex::new(ResponseStore::new(config.max_entries, config.expiry_policy())),
            analytics: CacheAnalytics::new(),
            config,
        }
    }

    fn store(&self) -> MutexGuard<'_, ResponseStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cache key for a raw query
    pub fn normalize(&self, raw: &str) -> String {
        self.normalizer.normalize(raw)
    }

    /// Whether the query is too visitor-specific to share an answer
    pub fn is_personalized(&self, raw: &str) -> bool {
        self.normalizer.is_personalized(raw, &self.normalizer.normalize(raw))
    }

    /// Try to answer a query without calling the model
    pub fn resolve(&self, raw: &str, session_id: &str) -> CacheLookup {
        self.resolve_at(raw, session_id, Instant::now())
    }

    /// Same as [`resolve`](Self::resolve), with expiry evaluated at `now`
    pub fn resolve_at(&self, raw: &str, session_id: &str, now: Instant) -> CacheLookup {
        let started = Instant::now();
        let key = self.normalizer.normalize(raw);
        self.analytics.record_query(&key);

        if let Some(quick) = self.quick.respond(&key) {
            self.analytics.record_quick_hit();
            debug!(category = ?quick.category, "Quick response hit");
            return self.finish(started, quick.text, Some(CacheSource::Quick), QUICK_RESPONSE_CONFIDENCE);
        }

        let entry = self.store().get_at(&key, session_id, now);
        if let Some(entry) = entry {
            self.analytics.record_cache_hit();
            debug!(hit_count = entry.hit_count, "Cache hit");
            return self.finish(started, entry.response, Some(CacheSource::Cache), entry.confidence);
        }

        self.analytics.record_miss();
        debug!("Cache miss");
        self.finish(started, String::new(), None, 0.0)
    }

    fn finish(
        &self,
        started: Instant,
        response: String,
        source: Option<CacheSource>,
        confidence: f32,
    ) -> CacheLookup {
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
        self.analytics.record_latency(latency_ms);
        CacheLookup { response, source, latency_ms, confidence }
    }

    /// Offer a model answer for caching.
    ///
    /// Returns whether it was stored. Low-confidence answers, answers to
    /// personalized queries and empty keys are silently dropped.
    pub fn record(&self, raw: &str, response: &str, session_id: &str, confidence: f32) -> bool {
        self.record_at(raw, response, session_id, confidence, Instant::now())
    }

    /// Same as [`record`](Self::record), with the entry timestamped `now`
    pub fn record_at(
        &self,
        raw: &str,
        response: &str,
        session_id: &str,
        confidence: f32,
        now: Instant,
    ) -> bool {
        let key = self.normalizer.normalize(raw);
        if key.is_empty() || response.trim().is_empty() {
            return false;
        }
        // Written this way so NaN is rejected too
        if !(confidence >= self.config.min_confidence) {
            debug!(confidence, "Not caching low-confidence response");
            return false;
        }
        if self.normalizer.is_personalized(raw, &key) {
            debug!("Not caching response to personalized query");
            return false;
        }

        self.store().put_at(key, response.to_string(), session_id, confidence, now);
        true
    }

    /// Whether the quick-response table would answer this query
    pub fn would_have_quick_response(&self, raw: &str) -> bool {
        self.quick.category_for(&self.normalizer.normalize(raw)).is_some()
    }

    /// Get an analytics snapshot
    pub fn analytics(&self) -> AnalyticsSnapshot {
        self.analytics.snapshot(self.config.top_queries)
    }

    /// Remove every cached entry whose key matches one of the patterns
    /// (case-insensitive regexes). Invalid patterns are skipped.
    pub fn invalidate<S: AsRef<str>>(&self, patterns: &[S]) -> usize {
        let compiled: Vec<_> = patterns
            .iter()
            .filter_map(|p| {
                match RegexBuilder::new(p.as_ref()).case_insensitive(true).build() {
                    Ok(re) => Some(re),
                    Err(e) => {
                        warn!(pattern = p.as_ref(), error = %e, "Skipping invalid invalidation pattern");
                        None
                    }
                }
            })
            .collect();

        let removed = self.store().remove_matching(&compiled);
        info!(removed, "Invalidated cache entries");
        removed
    }

    /// Empty the store and reset every counter
    pub fn clear_all(&self) {
        self.store().clear();
        self.analytics.reset();
        info!("Cleared response cache and analytics");
    }

    /// Drop entries that are expired at `now`
    pub fn sweep(&self, now: Instant) -> usize {
        self.store().sweep(now)
    }

    /// Spawn the periodic expiry sweep on the current tokio runtime
    pub fn spawn_sweeper(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let cache = Arc::clone(self);
        let period = self.config.sweep_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick fires immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                // tokio's clock so a paused runtime drives expiry too
                let removed = cache.sweep(tokio::time::Instant::now().into_std());
                if removed > 0 {
                    info!(removed, remaining = cache.len(), "Swept expired cache entries");
                } else {
                    debug!("Cache sweep found nothing to remove");
                }
            }
        })
    }

    /// Current number of stored entries
    pub fn len(&self) -> usize {
        self.store().len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.store().is_empty()
    }

    /// Entries evicted to make room, since the last clear
    pub fn evictions(&self) -> u64 {
        self.store().evictions()
    }

    /// Entries dropped for being past their TTL, since the last clear
    pub fn expirations(&self) -> u64 {
        self.store().expirations()
    }

    /// Get the cache configuration
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const HOUR: Duration = Duration::from_secs(3600);

    fn cache() -> ResponseCache {
        ResponseCache::with_responder(
            CacheConfig::default(),
            QuickResponder::with_seed("hello@fieldporter.com", 1),
        )
    }

    #[test]
    fn test_hit_after_write() {
        let cache = cache();
        let query = "What industries do you serve?";
        assert_eq!(cache.resolve(query, "s1").source, None);

        assert!(cache.record(query, "Mostly professional services and logistics.", "s1", 0.8));

        let lookup = cache.resolve("what industries do you serve", "s2");
        assert_eq!(lookup.source, Some(CacheSource::Cache));
        assert_eq!(lookup.response, "Mostly professional services and logistics.");
        assert!((lookup.confidence - 0.8).abs() < 0.001);
    }

    #[test]
    fn test_personalized_queries_never_cached() {
        let cache = cache();
        let query = "My company needs help with AI";
        assert!(!cache.record(query, "Tailored answer", "s1", 0.95));

        let lookup = cache.resolve(query, "s2");
        assert_eq!(lookup.source, None);
        assert!(lookup.response.is_empty());
    }

    #[test]
    fn test_low_confidence_rejected() {
        let cache = cache();
        assert!(!cache.record("what industries do you serve", "Maybe?", "s1", 0.5));
        assert!(!cache.record("what industries do you serve", "Maybe?", "s1", f32::NAN));
        assert!(cache.is_empty());
        assert_eq!(cache.resolve("what industries do you serve", "s2").source, None);
    }

    #[test]
    fn test_quick_responses_take_priority() {
        let cache = cache();
        assert!(cache.record("hello", "stale cached greeting", "s1", 0.95));

        let lookup = cache.resolve("Hello!", "s2");
        assert_eq!(lookup.source, Some(CacheSource::Quick));
        assert_ne!(lookup.response, "stale cached greeting");
    }

    #[test]
    fn test_lru_eviction_at_capacity() {
        let cache = cache();
        let capacity = cache.config().max_entries;
        for i in 0..=capacity {
            assert!(cache.record(&format!("question number {}", i), "answer", "s", 0.8));
        }

        assert_eq!(cache.len(), capacity);
        assert_eq!(cache.resolve("question number 0", "s").source, None);
        assert_eq!(cache.resolve("question number 1", "s").source, Some(CacheSource::Cache));
        assert_eq!(
            cache.resolve(&format!("question number {}", capacity), "s").source,
            Some(CacheSource::Cache)
        );
    }

    #[test]
    fn test_expiry_tiers() {
        let cache = cache();
        let start = Instant::now();
        cache.record_at("what industries do you serve", "long", "s", 0.95, start);
        cache.record_at("where is the team based", "short", "s", 0.75, start);

        let lookup = cache.resolve_at("what industries do you serve", "s", start + 23 * HOUR);
        assert_eq!(lookup.source, Some(CacheSource::Cache));

        let past_hour = start + HOUR + Duration::from_millis(1);
        assert_eq!(cache.resolve_at("where is the team based", "s", past_hour).source, None);

        let past_day = start + 24 * HOUR + Duration::from_millis(1);
        assert_eq!(cache.resolve_at("what industries do you serve", "s", past_day).source, None);
    }

    #[test]
    fn test_hit_rate_analytics() {
        let cache = cache();
        cache.record("what industries do you serve", "answer", "s", 0.8);

        // 2 quick hits, 3 cache hits, 4 misses
        cache.resolve("hi", "s");
        cache.resolve("thanks", "s");
        for _ in 0..3 {
            cache.resolve("what industries do you serve", "s");
        }
        for i in 0..4 {
            cache.resolve(&format!("unseen question {}", i), "s");
        }

        let snap = cache.analytics();
        assert_eq!(snap.total_queries, 9);
        assert_eq!(snap.quick_response_hits, 2);
        assert_eq!(snap.cache_hits, 3);
        assert_eq!(snap.cache_misses, 4);
        assert!((snap.cache_hit_rate - 100.0 * 5.0 / 9.0).abs() < 0.001);
        assert_eq!(snap.top_queries[0].query, "what industries do you serve");
        assert_eq!(snap.top_queries[0].count, 3);
    }

    #[test]
    fn test_invalidate_by_pattern() {
        let cache = cache();
        cache.record("pricing information", "p", "s", 0.8);
        cache.record("automation help", "a", "s", 0.8);

        assert_eq!(cache.invalidate(&["pricing"]), 1);
        assert_eq!(cache.len(), 1);
        // invalid regexes are skipped, not fatal
        assert_eq!(cache.invalidate(&["(unclosed"]), 0);
        assert_eq!(cache.invalidate(&["AUTOMATION"]), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_clear_all() {
        let cache = cache();
        cache.record("what industries do you serve", "answer", "s", 0.8);
        cache.resolve("what industries do you serve", "s");

        cache.clear_all();

        assert!(cache.is_empty());
        let snap = cache.analytics();
        assert_eq!(snap.total_queries, 0);
        assert_eq!(snap.cache_hits, 0);
        assert!(snap.top_queries.is_empty());
    }

    #[test]
    fn test_greeting_then_brand_question() {
        let cache = cache();

        let lookup = cache.resolve("hi", "s1");
        assert_eq!(lookup.source, Some(CacheSource::Quick));
        assert!(!lookup.response.is_empty());
        assert!(cache.is_empty());

        let question = "What does Fieldporter do?";
        let first = cache.resolve(question, "s1");
        assert_eq!(first.source, None);

        let answer = "Fieldporter helps businesses adopt AI and automation.";
        assert!(cache.record(question, answer, "s1", 0.95));

        let second = cache.resolve(question, "s2");
        assert_eq!(second.source, Some(CacheSource::Cache));
        assert_eq!(second.response, answer);
    }

    #[test]
    fn test_would_have_quick_response() {
        let cache = cache();
        assert!(cache.would_have_quick_response("Hey!"));
        assert!(cache.would_have_quick_response("How much does it cost?"));
        assert!(!cache.would_have_quick_response("What does Fieldporter do?"));
        // checking does not count as a query
        assert_eq!(cache.analytics().total_queries, 0);
    }

    #[test]
    fn test_malformed_input_is_a_miss() {
        let cache = cache();
        assert_eq!(cache.resolve("", "s").source, None);
        assert_eq!(cache.resolve(&"x".repeat(100_000), "s").source, None);
        assert!(!cache.record("", "answer", "s", 0.99));
    }

    #[test]
    fn test_sweep() {
        let cache = cache();
        let start = Instant::now();
        cache.record_at("where is the team based", "short", "s", 0.75, start);
        cache.record_at("what industries do you serve", "long", "s", 0.95, start);

        assert_eq!(cache.sweep(start + 2 * HOUR), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_drops_expired_entries() {
        let config = CacheConfig {
            short_ttl: Duration::from_secs(120),
            sweep_interval: Duration::from_secs(60),
            ..CacheConfig::default()
        };
        let cache = Arc::new(ResponseCache::with_responder(
            config,
            QuickResponder::with_seed("hello@fieldporter.com", 1),
        ));
        let now = tokio::time::Instant::now().into_std();
        cache.record_at("where is the team based", "short", "s", 0.75, now);
        cache.record_at("what industries do you serve", "long", "s", 0.95, now);

        let sweeper = cache.spawn_sweeper();
        tokio::time::sleep(Duration::from_secs(200)).await;
        tokio::task::yield_now().await;

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.expirations(), 1);
        sweeper.abort();
    }
}
