//! Configuration for the response cache.

use std::time::Duration;

use super::store::ExpiryPolicy;
use crate::error::ConfigError;

/// Configuration for the response cache
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of entries in the LRU store
    pub max_entries: usize,

    /// Minimum confidence a response needs to be cached (0.0 - 1.0)
    pub min_confidence: f32,

    /// Confidence at or above which an entry gets the long TTL
    pub high_confidence: f32,

    /// Time-to-live for high-confidence entries
    pub long_ttl: Duration,

    /// Time-to-live for every other entry
    pub short_ttl: Duration,

    /// How often the background sweep removes expired entries
    pub sweep_interval: Duration,

    /// Words that must never be collapsed into the `company` placeholder
    /// during normalization (the brand's own name, mostly)
    pub protected_terms: Vec<String>,

    /// Number of entries reported in the top-queries list
    pub top_queries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 500,
            min_confidence: 0.7,
            high_confidence: 0.9,
            long_ttl: Duration::from_secs(24 * 60 * 60), // 24 hours
            short_ttl: Duration::from_secs(60 * 60),     // 1 hour
            sweep_interval: Duration::from_secs(30 * 60),
            protected_terms: vec!["fieldporter".to_string()],
            top_queries: 20,
        }
    }
}

impl CacheConfig {
    /// Create config from environment variables
    ///
    /// Environment variables:
    /// - `FIELDPORTER_CACHE_SIZE`: LRU capacity (default: 500)
    /// - `FIELDPORTER_CACHE_MIN_CONFIDENCE`: write-back threshold (default: 0.7)
    /// - `FIELDPORTER_CACHE_HIGH_CONFIDENCE`: long-TTL threshold (default: 0.9)
    /// - `FIELDPORTER_CACHE_LONG_TTL_SECS`: long TTL (default: 86400)
    /// - `FIELDPORTER_CACHE_SHORT_TTL_SECS`: short TTL (default: 3600)
    /// - `FIELDPORTER_CACHE_SWEEP_SECS`: sweep interval (default: 1800)
    /// - `FIELDPORTER_PROTECTED_TERMS`: comma separated (default: fieldporter)
    /// - `FIELDPORTER_TOP_QUERIES`: top-N size (default: 20)
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("FIELDPORTER_CACHE_SIZE") {
            if let Ok(n) = val.parse() {
                config.max_entries = n;
            }
        }

        if let Ok(val) = std::env::var("FIELDPORTER_CACHE_MIN_CONFIDENCE") {
            if let Ok(n) = val.parse() {
                config.min_confidence = n;
            }
        }

        if let Ok(val) = std::env::var("FIELDPORTER_CACHE_HIGH_CONFIDENCE") {
            if let Ok(n) = val.parse() {
                config.high_confidence = n;
            }
        }

        if let Ok(val) = std::env::var("FIELDPORTER_CACHE_LONG_TTL_SECS") {
            if let Ok(n) = val.parse() {
                config.long_ttl = Duration::from_secs(n);
            }
        }

        if let Ok(val) = std::env::var("FIELDPORTER_CACHE_SHORT_TTL_SECS") {
            if let Ok(n) = val.parse() {
                config.short_ttl = Duration::from_secs(n);
            }
        }

        if let Ok(val) = std::env::var("FIELDPORTER_CACHE_SWEEP_SECS") {
            if let Ok(n) = val.parse() {
                config.sweep_interval = Duration::from_secs(n);
            }
        }

        if let Ok(val) = std::env::var("FIELDPORTER_PROTECTED_TERMS") {
            config.protected_terms = parse_terms(&val);
        }

        if let Ok(val) = std::env::var("FIELDPORTER_TOP_QUERIES") {
            if let Ok(n) = val.parse() {
                config.top_queries = n;
            }
        }

        config
    }

    /// Expiry rules for the LRU store
    pub fn expiry_policy(&self) -> ExpiryPolicy {
        ExpiryPolicy {
            high_confidence: self.high_confidence,
            long_ttl: self.long_ttl,
            short_ttl: self.short_ttl,
        }
    }

    /// Check that thresholds and sizes make sense
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_entries == 0 {
            return Err(ConfigError::ZeroValue("max_entries"));
        }
        for (name, value) in [
            ("min_confidence", self.min_confidence),
            ("high_confidence", self.high_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfRange { name, value });
            }
        }
        if self.sweep_interval.is_zero() {
            return Err(ConfigError::ZeroValue("sweep_interval"));
        }
        Ok(())
    }
}

fn parse_terms(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.max_entries, 500);
        assert!((config.min_confidence - 0.7).abs() < 0.001);
        assert_eq!(config.long_ttl, Duration::from_secs(86_400));
        assert_eq!(config.short_ttl, Duration::from_secs(3_600));
        assert_eq!(config.protected_terms, vec!["fieldporter".to_string()]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_ttl_tiers() {
        let policy = CacheConfig::default().expiry_policy();
        assert_eq!(policy.ttl_for(0.95), Duration::from_secs(86_400));
        assert_eq!(policy.ttl_for(0.9), Duration::from_secs(86_400));
        assert_eq!(policy.ttl_for(0.89), Duration::from_secs(3_600));
        assert_eq!(policy.ttl_for(0.75), Duration::from_secs(3_600));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = CacheConfig { max_entries: 0, ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::ZeroValue("max_entries"))));

        let config = CacheConfig { min_confidence: 1.5, ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::OutOfRange { .. })));
    }

    #[test]
    fn test_parse_terms() {
        assert_eq!(parse_terms(" Fieldporter, ,Acme "), vec!["fieldporter", "acme"]);
        assert!(parse_terms("").is_empty());
    }
}
