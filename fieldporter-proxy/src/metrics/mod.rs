//! Metrics module for the Fieldporter chat proxy
//!
//! Provides Prometheus metrics for monitoring and observability.

pub mod prometheus;

// Re-export commonly used items
pub use prometheus::{
    encode_metrics, record_cache_hit, record_cache_miss, record_lead_qualified,
    record_upstream_failure, register_metrics, sync_cache_stats, RequestTimer,
};
