//! LRU response store with confidence-tiered TTL expiration.

use lru::LruCache;
use regex::Regex;
use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

/// A cached model answer
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Text returned verbatim on a hit
    pub response: String,
    /// Creation time, used for expiry
    pub timestamp: Instant,
    /// Number of hits served from this entry
    pub hit_count: u64,
    /// Sessions that have been served this entry
    pub session_ids: HashSet<String>,
    /// Quality score in [0, 1]; selects the TTL tier
    pub confidence: f32,
}

impl CacheEntry {
    fn new(response: String, session_id: &str, confidence: f32, now: Instant) -> Self {
        let mut session_ids = HashSet::new();
        session_ids.insert(session_id.to_string());
        Self { response, timestamp: now, hit_count: 0, session_ids, confidence }
    }
}

/// TTL rules shared by reads and sweeps
#[derive(Debug, Clone, Copy)]
pub struct ExpiryPolicy {
    pub high_confidence: f32,
    pub long_ttl: Duration,
    pub short_ttl: Duration,
}

impl ExpiryPolicy {
    /// TTL for an entry of the given confidence
    pub fn ttl_for(&self, confidence: f32) -> Duration {
        if confidence >= self.high_confidence {
            self.long_ttl
        } else {
            self.short_ttl
        }
    }

    /// Whether the entry is past its TTL at `now`
    pub fn is_expired(&self, entry: &CacheEntry, now: Instant) -> bool {
        now.saturating_duration_since(entry.timestamp) > self.ttl_for(entry.confidence)
    }
}

/// Bounded map from normalized query to cached answer.
///
/// Reads refresh recency, so eviction removes the least recently
/// *accessed* entry. Eligibility (confidence, personalization) is decided
/// by the caller before `put`.
pub struct ResponseStore {
    cache: LruCache<String, CacheEntry>,
    policy: ExpiryPolicy,
    evictions: u64,
    expirations: u64,
}

impl ResponseStore {
    /// Create a new store with the given capacity and expiry rules
    pub fn new(capacity: usize, policy: ExpiryPolicy) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self { cache: LruCache::new(capacity), policy, evictions: 0, expirations: 0 }
    }

    /// Look up an entry, recording the hit for `session_id`.
    ///
    /// Expired entries are removed and reported as a miss.
    pub fn get_at(&mut self, key: &str, session_id: &str, now: Instant) -> Option<CacheEntry> {
        let expired = self.policy.is_expired(self.cache.peek(key)?, now);
        if expired {
            self.cache.pop(key);
            self.expirations += 1;
            return None;
        }

        // `get_mut` moves the entry to the most-recently-used end
        let entry = self.cache.get_mut(key)?;
        entry.hit_count += 1;
        entry.session_ids.insert(session_id.to_string());
        Some(entry.clone())
    }

    /// Insert an entry, evicting the least recently used one when full
    pub fn put_at(
        &mut self,
        key: String,
        response: String,
        session_id: &str,
        confidence: f32,
        now: Instant,
    ) {
        let entry = CacheEntry::new(response, session_id, confidence, now);
        if let Some((evicted_key, _)) = self.cache.push(key, entry) {
            // `push` also returns the old value when overwriting the same key
            if self.cache.peek(&evicted_key).is_none() {
                self.evictions += 1;
            }
        }
    }

    /// Remove every entry that is expired at `now`
    pub fn sweep(&mut self, now: Instant) -> usize {
        let expired_keys: Vec<String> = self
            .cache
            .iter()
            .filter(|(_, entry)| self.policy.is_expired(entry, now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            self.cache.pop(key);
        }
        self.expirations += expired_keys.len() as u64;
        expired_keys.len()
    }

    /// Remove every key matching any of the given patterns
    pub fn remove_matching(&mut self, patterns: &[Regex]) -> usize {
        if patterns.is_empty() {
            return 0;
        }
        let keys: Vec<String> = self
            .cache
            .iter()
            .filter(|(key, _)| patterns.iter().any(|re| re.is_match(key)))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &keys {
            self.cache.pop(key);
        }
        keys.len()
    }

    /// Whether a key is present (expired or not), without touching recency
    pub fn contains(&self, key: &str) -> bool {
        self.cache.contains(key)
    }

    /// Get the current number of entries
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Maximum number of entries
    pub fn capacity(&self) -> usize {
        self.cache.cap().get()
    }

    /// Entries dropped to make room
    pub fn evictions(&self) -> u64 {
        self.evictions
    }

    /// Entries dropped for being past their TTL
    pub fn expirations(&self) -> u64 {
        self.expirations
    }

    /// Clear all entries and counters
    pub fn clear(&mut self) {
        self.cache.clear();
        self.evictions = 0;
        self.expirations = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: Duration = Duration::from_secs(3600);

    fn policy() -> ExpiryPolicy {
        ExpiryPolicy { high_confidence: 0.9, long_ttl: 24 * HOUR, short_ttl: HOUR }
    }

    #[test]
    fn test_hit_updates_bookkeeping() {
        let now = Instant::now();
        let mut store = ResponseStore::new(10, policy());
        store.put_at("q".into(), "answer".into(), "s1", 0.8, now);

        let entry = store.get_at("q", "s2", now).unwrap();
        assert_eq!(entry.response, "answer");
        assert_eq!(entry.hit_count, 1);
        assert!(entry.session_ids.contains("s1"));
        assert!(entry.session_ids.contains("s2"));

        let entry = store.get_at("q", "s2", now).unwrap();
        assert_eq!(entry.hit_count, 2);
        assert_eq!(entry.session_ids.len(), 2);
    }

    #[test]
    fn test_miss() {
        let mut store = ResponseStore::new(10, policy());
        assert!(store.get_at("nothing", "s", Instant::now()).is_none());
    }

    #[test]
    fn test_lru_eviction_by_access() {
        let now = Instant::now();
        let mut store = ResponseStore::new(2, policy());

        store.put_at("one".into(), "1".into(), "s", 0.8, now);
        store.put_at("two".into(), "2".into(), "s", 0.8, now);
        // Touch "one" so "two" becomes least recently used
        assert!(store.get_at("one", "s", now).is_some());
        store.put_at("three".into(), "3".into(), "s", 0.8, now);

        assert!(store.get_at("two", "s", now).is_none());
        assert!(store.get_at("one", "s", now).is_some());
        assert!(store.get_at("three", "s", now).is_some());
        assert_eq!(store.evictions(), 1);
    }

    #[test]
    fn test_overwrite_is_not_eviction() {
        let now = Instant::now();
        let mut store = ResponseStore::new(2, policy());
        store.put_at("q".into(), "old".into(), "s", 0.8, now);
        store.put_at("q".into(), "new".into(), "s", 0.8, now);

        assert_eq!(store.len(), 1);
        assert_eq!(store.evictions(), 0);
        assert_eq!(store.get_at("q", "s", now).unwrap().response, "new");
    }

    #[test]
    fn test_expiry_tiers() {
        let start = Instant::now();
        let mut store = ResponseStore::new(10, policy());
        store.put_at("long".into(), "l".into(), "s", 0.95, start);
        store.put_at("short".into(), "s".into(), "s", 0.75, start);

        let later = start + 23 * HOUR;
        assert!(store.get_at("long", "s", later).is_some());
        assert!(store.get_at("short", "s", later).is_none());
        assert_eq!(store.expirations(), 1);

        let past_day = start + 24 * HOUR + Duration::from_millis(1);
        assert!(store.get_at("long", "s", past_day).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_is_expired_boundary() {
        let p = policy();
        let start = Instant::now();
        let entry = CacheEntry::new("r".into(), "s", 0.75, start);
        assert!(!p.is_expired(&entry, start + HOUR));
        assert!(p.is_expired(&entry, start + HOUR + Duration::from_millis(1)));
    }

    #[test]
    fn test_sweep_removes_only_expired() {
        let start = Instant::now();
        let mut store = ResponseStore::new(10, policy());
        store.put_at("a".into(), "a".into(), "s", 0.75, start);
        store.put_at("b".into(), "b".into(), "s", 0.95, start);
        store.put_at("c".into(), "c".into(), "s", 0.75, start + 2 * HOUR);

        let removed = store.sweep(start + 2 * HOUR + Duration::from_secs(1));
        assert_eq!(removed, 1);
        assert!(!store.contains("a"));
        assert!(store.contains("b"));
        assert!(store.contains("c"));
    }

    #[test]
    fn test_remove_matching() {
        let now = Instant::now();
        let mut store = ResponseStore::new(10, policy());
        store.put_at("pricing information".into(), "p".into(), "s", 0.8, now);
        store.put_at("automation help".into(), "a".into(), "s", 0.8, now);

        let patterns = vec![Regex::new("(?i)PRICING").unwrap()];
        assert_eq!(store.remove_matching(&patterns), 1);
        assert!(!store.contains("pricing information"));
        assert!(store.contains("automation help"));
        assert_eq!(store.remove_matching(&[]), 0);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let store = ResponseStore::new(0, policy());
        assert_eq!(store.capacity(), 1);
    }
}
