//! Application state for the Fieldporter chat proxy.

use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CacheConfig, ConfidenceScorer, HeuristicScorer, ResponseCache};
use crate::error::{ConfigError, ProxyError};
use crate::lead::LeadScorer;
use crate::llm::{CompletionBackend, OpenAiClient};

/// Application state shared across all handlers
pub struct AppState {
    /// Quick responses, LRU store and analytics
    pub cache: Arc<ResponseCache>,

    /// Model used on cache misses
    pub backend: Arc<dyn CompletionBackend>,

    /// Decides how cacheable a model answer is
    pub scorer: Box<dyn ConfidenceScorer>,

    /// Sales-qualification scoring
    pub leads: LeadScorer,

    /// Configuration
    pub config: ProxyConfig,
}

impl AppState {
    /// Create new application state backed by the configured model API
    pub fn new(config: ProxyConfig) -> Result<Self, ProxyError> {
        let client = OpenAiClient::new(
            config.llm_url.clone(),
            config.llm_api_key.clone(),
            config.model.clone(),
            config.llm_timeout,
        )?
        .with_generation(config.max_tokens, config.temperature);

        Ok(Self::with_backend(config, Arc::new(client)))
    }

    /// Create application state around any completion backend
    pub fn with_backend(config: ProxyConfig, backend: Arc<dyn CompletionBackend>) -> Self {
        let cache = ResponseCache::new(config.cache.clone(), &config.contact_email);
        Self::with_parts(config, cache, backend)
    }

    /// Create application state from a prepared cache and backend
    pub fn with_parts(config: ProxyConfig, cache: ResponseCache, backend: Arc<dyn CompletionBackend>) -> Self {
        Self {
            cache: Arc::new(cache),
            backend,
            scorer: Box::new(HeuristicScorer::default()),
            leads: LeadScorer::new(config.notify_threshold),
            config,
        }
    }

    /// Swap the confidence scorer
    pub fn with_scorer(mut self, scorer: impl ConfidenceScorer + 'static) -> Self {
        self.scorer = Box::new(scorer);
        self
    }
}

/// Proxy configuration
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Port to listen on
    pub port: u16,

    /// Base URL of the OpenAI-compatible model API
    pub llm_url: String,

    /// Bearer token for the model API
    pub llm_api_key: Option<String>,

    /// Model name sent with every completion request
    pub model: String,

    /// Abort model calls after this long
    pub llm_timeout: Duration,

    /// Completion length limit
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,

    /// Address offered to visitors in canned replies
    pub contact_email: String,

    /// Lead score at which a lead with contact details triggers a notification
    pub notify_threshold: u32,

    /// Earlier turns forwarded to the model
    pub history_limit: usize,

    /// Response cache settings
    pub cache: CacheConfig,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            llm_url: "https://api.openai.com/v1".to_string(),
            llm_api_key: None,
            model: "gpt-4o-mini".to_string(),
            llm_timeout: Duration::from_secs(25),
            max_tokens: 500,
            temperature: 0.7,
            contact_email: "hello@fieldporter.com".to_string(),
            notify_threshold: 70,
            history_limit: 10,
            cache: CacheConfig::default(),
        }
    }
}

impl ProxyConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            port: env_parse("FIELDPORTER_PORT").unwrap_or(defaults.port),
            llm_url: std::env::var("FIELDPORTER_LLM_URL").unwrap_or(defaults.llm_url),
            llm_api_key: std::env::var("FIELDPORTER_LLM_API_KEY")
                .or_else(|_| std::env::var("OPENAI_API_KEY"))
                .ok()
                .filter(|k| !k.trim().is_empty()),
            model: std::env::var("FIELDPORTER_MODEL").unwrap_or(defaults.model),
            llm_timeout: env_parse("FIELDPORTER_LLM_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.llm_timeout),
            max_tokens: env_parse("FIELDPORTER_MAX_TOKENS").unwrap_or(defaults.max_tokens),
            temperature: defaults.temperature,
            contact_email: std::env::var("FIELDPORTER_CONTACT_EMAIL").unwrap_or(defaults.contact_email),
            notify_threshold: env_parse("FIELDPORTER_NOTIFY_THRESHOLD").unwrap_or(defaults.notify_threshold),
            history_limit: env_parse("FIELDPORTER_HISTORY_LIMIT").unwrap_or(defaults.history_limit),
            cache: CacheConfig::from_env(),
        }
    }

    /// Check the whole configuration, cache settings included
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.llm_timeout.is_zero() {
            return Err(ConfigError::ZeroValue("llm_timeout"));
        }
        if self.max_tokens == 0 {
            return Err(ConfigError::ZeroValue("max_tokens"));
        }
        if self.notify_threshold > crate::lead::scoring::MAX_SCORE {
            return Err(ConfigError::TooLarge {
                name: "notify_threshold",
                value: self.notify_threshold as u64,
                max: crate::lead::scoring::MAX_SCORE as u64,
            });
        }
        if self.contact_email.trim().is_empty() {
            return Err(ConfigError::Empty("contact_email"));
        }
        self.cache.validate()
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ProxyConfig::default();
        assert_eq!(config.port, 8000);
        assert_eq!(config.llm_url, "https://api.openai.com/v1");
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.llm_timeout, Duration::from_secs(25));
        assert_eq!(config.notify_threshold, 70);
        assert_eq!(config.history_limit, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = ProxyConfig { llm_timeout: Duration::ZERO, ..Default::default() };
        assert_eq!(config.validate(), Err(ConfigError::ZeroValue("llm_timeout")));

        let config = ProxyConfig { notify_threshold: 150, ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::TooLarge { name: "notify_threshold", .. })));

        let config = ProxyConfig { contact_email: " ".into(), ..Default::default() };
        assert_eq!(config.validate(), Err(ConfigError::Empty("contact_email")));

        let mut config = ProxyConfig::default();
        config.cache.max_entries = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroValue("max_entries")));
    }

    #[test]
    fn test_state_builds_with_default_client() {
        let state = AppState::new(ProxyConfig::default()).unwrap();
        assert!(state.cache.is_empty());
        assert_eq!(state.leads.notify_threshold, 70);
    }
}
