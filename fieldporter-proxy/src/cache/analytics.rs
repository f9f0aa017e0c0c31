//! Running analytics for the response cache.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

/// Longest prefix of a query kept in the frequency table
pub const MAX_TRACKED_QUERY_CHARS: usize = 200;

/// Latency average and query frequencies, updated together
#[derive(Debug, Default)]
struct LatencyAndFrequency {
    samples: u64,
    average_ms: f64,
    frequencies: HashMap<String, u64>,
}

/// Counters for monitoring cache effectiveness
#[derive(Debug, Default)]
pub struct CacheAnalytics {
    /// Queries resolved
    pub total_queries: AtomicU64,
    /// Hits served from the LRU store
    pub cache_hits: AtomicU64,
    /// Queries that needed the language model
    pub cache_misses: AtomicU64,
    /// Hits served from the quick-response table
    pub quick_hits: AtomicU64,
    state: Mutex<LatencyAndFrequency>,
}

impl CacheAnalytics {
    /// Create new analytics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an incoming query under its normalized form
    pub fn record_query(&self, normalized: &str) {
        self.total_queries.fetch_add(1, Ordering::Relaxed);
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let tracked = match normalized.char_indices().nth(MAX_TRACKED_QUERY_CHARS) {
            Some((end, _)) => &normalized[..end],
            None => normalized,
        };
        *state.frequencies.entry(tracked.to_string()).or_insert(0) += 1;
    }

    /// Record a quick-response hit
    pub fn record_quick_hit(&self) {
        self.quick_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an LRU hit
    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a miss
    pub fn record_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Fold one lookup latency into the running average
    pub fn record_latency(&self, latency_ms: f64) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.samples += 1;
        let n = state.samples as f64;
        state.average_ms = (state.average_ms * (n - 1.0) + latency_ms) / n;
    }

    /// Get a snapshot with the `top_n` most frequent queries
    pub fn snapshot(&self, top_n: usize) -> AnalyticsSnapshot {
        let total_queries = self.total_queries.load(Ordering::Relaxed);
        let cache_hits = self.cache_hits.load(Ordering::Relaxed);
        let cache_misses = self.cache_misses.load(Ordering::Relaxed);
        let quick_response_hits = self.quick_hits.load(Ordering::Relaxed);

        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let mut top_queries: Vec<QueryFrequency> = state
            .frequencies
            .iter()
            .map(|(query, count)| QueryFrequency { query: query.clone(), count: *count })
            .collect();
        top_queries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.query.cmp(&b.query)));
        top_queries.truncate(top_n);

        let cache_hit_rate = if total_queries > 0 {
            (cache_hits + quick_response_hits) as f64 / total_queries as f64 * 100.0
        } else {
            0.0
        };
        let average_response_time = state.average_ms;

        AnalyticsSnapshot {
            total_queries,
            cache_hits,
            cache_misses,
            quick_response_hits,
            average_response_time,
            cache_hit_rate,
            top_queries,
            performance: PerformanceTier::classify(cache_hit_rate, average_response_time),
        }
    }

    /// Reset all counters and the frequency table
    pub fn reset(&self) {
        self.total_queries.store(0, Ordering::Relaxed);
        self.cache_hits.store(0, Ordering::Relaxed);
        self.cache_misses.store(0, Ordering::Relaxed);
        self.quick_hits.store(0, Ordering::Relaxed);
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        *state = LatencyAndFrequency::default();
    }
}

/// How often a normalized query has been asked
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryFrequency {
    pub query: String,
    pub count: u64,
}

/// Coarse health label derived from hit rate and latency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceTier {
    Excellent,
    Good,
    NeedsImprovement,
}

impl PerformanceTier {
    /// Classify from a hit rate percentage and an average latency in ms
    pub fn classify(hit_rate: f64, average_ms: f64) -> Self {
        if hit_rate >= 80.0 && average_ms <= 1000.0 {
            PerformanceTier::Excellent
        } else if hit_rate >= 60.0 && average_ms <= 2000.0 {
            PerformanceTier::Good
        } else {
            PerformanceTier::NeedsImprovement
        }
    }
}

/// Snapshot of cache analytics
#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsSnapshot {
    /// Queries resolved
    pub total_queries: u64,
    /// LRU hits
    pub cache_hits: u64,
    /// Misses (model calls needed)
    pub cache_misses: u64,
    /// Quick-response hits
    pub quick_response_hits: u64,
    /// Running average lookup latency in milliseconds
    pub average_response_time: f64,
    /// (LRU hits + quick hits) / total, as a percentage
    pub cache_hit_rate: f64,
    /// Most frequent normalized queries, descending
    pub top_queries: Vec<QueryFrequency>,
    /// Derived label
    pub performance: PerformanceTier,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let analytics = CacheAnalytics::new();
        analytics.record_query("a");
        analytics.record_query("b");
        analytics.record_cache_hit();
        analytics.record_miss();

        let snap = analytics.snapshot(20);
        assert_eq!(snap.total_queries, 2);
        assert_eq!(snap.cache_hits, 1);
        assert_eq!(snap.cache_misses, 1);
        assert_eq!(snap.quick_response_hits, 0);
    }

    #[test]
    fn test_long_queries_are_truncated() {
        let analytics = CacheAnalytics::new();
        let long = "é".repeat(100_000);
        analytics.record_query(&long);
        analytics.record_query(&format!("{}tail", long));

        let snap = analytics.snapshot(20);
        assert_eq!(snap.top_queries.len(), 1);
        assert_eq!(snap.top_queries[0].query.chars().count(), MAX_TRACKED_QUERY_CHARS);
        assert_eq!(snap.top_queries[0].count, 2);
    }

    #[test]
    fn test_hit_rate_includes_quick_hits() {
        let analytics = CacheAnalytics::new();
        // 3 cache hits, 2 quick hits, 5 misses
        for i in 0..10 {
            analytics.record_query(&format!("q{}", i));
        }
        for _ in 0..3 {
            analytics.record_cache_hit();
        }
        for _ in 0..2 {
            analytics.record_quick_hit();
        }
        for _ in 0..5 {
            analytics.record_miss();
        }

        let snap = analytics.snapshot(20);
        assert!((snap.cache_hit_rate - 50.0).abs() < 0.001);
    }

    #[test]
    fn test_running_average() {
        let analytics = CacheAnalytics::new();
        analytics.record_latency(10.0);
        analytics.record_latency(20.0);
        analytics.record_latency(60.0);

        let snap = analytics.snapshot(0);
        assert!((snap.average_response_time - 30.0).abs() < 0.001);
    }

    #[test]
    fn test_top_queries_sorted_and_truncated() {
        let analytics = CacheAnalytics::new();
        for (query, times) in [("pricing", 3), ("hello", 5), ("services", 1), ("automation", 3)] {
            for _ in 0..times {
                analytics.record_query(query);
            }
        }

        let snap = analytics.snapshot(3);
        let top: Vec<(&str, u64)> =
            snap.top_queries.iter().map(|q| (q.query.as_str(), q.count)).collect();
        assert_eq!(top, vec![("hello", 5), ("automation", 3), ("pricing", 3)]);
    }

    #[test]
    fn test_performance_tiers() {
        assert_eq!(PerformanceTier::classify(85.0, 500.0), PerformanceTier::Excellent);
        assert_eq!(PerformanceTier::classify(85.0, 1500.0), PerformanceTier::Good);
        assert_eq!(PerformanceTier::classify(65.0, 2000.0), PerformanceTier::Good);
        assert_eq!(PerformanceTier::classify(65.0, 2500.0), PerformanceTier::NeedsImprovement);
        assert_eq!(PerformanceTier::classify(10.0, 1.0), PerformanceTier::NeedsImprovement);
    }

    #[test]
    fn test_reset() {
        let analytics = CacheAnalytics::new();
        analytics.record_query("x");
        analytics.record_quick_hit();
        analytics.record_latency(5.0);

        analytics.reset();

        let snap = analytics.snapshot(20);
        assert_eq!(snap.total_queries, 0);
        assert_eq!(snap.quick_response_hits, 0);
        assert_eq!(snap.average_response_time, 0.0);
        assert!(snap.top_queries.is_empty());
    }
}
