//! Prometheus metrics for the Fieldporter chat proxy
//!
//! Exposes metrics in Prometheus format for monitoring and observability.

use lazy_static::lazy_static;
use prometheus::{
    CounterVec, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

lazy_static! {
    /// Global Prometheus registry for Fieldporter metrics
    pub static ref REGISTRY: Registry = Registry::new();

    // ============== Request Metrics ==============

    /// Chat requests by reply source and outcome
    pub static ref REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("requests_total", "Total number of chat requests")
            .namespace("fieldporter"),
        &["source", "status"]
    ).expect("metric can be created");

    /// Chat request duration by reply source
    pub static ref REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "request_duration_seconds",
            "Chat request duration in seconds"
        )
        .namespace("fieldporter")
        .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["source"]
    ).expect("metric can be created");

    // ============== Cache Metrics ==============

    /// Cache hits by type (quick or cache)
    pub static ref CACHE_HITS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("cache_hits_total", "Total cache hits")
            .namespace("fieldporter"),
        &["type"]
    ).expect("metric can be created");

    /// Cache misses
    pub static ref CACHE_MISSES_TOTAL: IntCounter = IntCounter::with_opts(
        Opts::new("cache_misses_total", "Total cache misses")
            .namespace("fieldporter")
    ).expect("metric can be created");

    /// Cache size gauge (number of entries)
    pub static ref CACHE_SIZE: IntGauge = IntGauge::with_opts(
        Opts::new("cache_size", "Current response cache size (entries)")
            .namespace("fieldporter")
    ).expect("metric can be created");

    /// LRU evictions
    pub static ref CACHE_EVICTIONS_TOTAL: IntCounter = IntCounter::with_opts(
        Opts::new("cache_evictions_total", "Total response cache evictions")
            .namespace("fieldporter")
    ).expect("metric can be created");

    // ============== Lead & Upstream Metrics ==============

    /// Leads that crossed the notification bar
    pub static ref LEADS_QUALIFIED_TOTAL: IntCounter = IntCounter::with_opts(
        Opts::new("leads_qualified_total", "Total qualified leads")
            .namespace("fieldporter")
    ).expect("metric can be created");

    /// Failed model API calls
    pub static ref UPSTREAM_FAILURES_TOTAL: IntCounter = IntCounter::with_opts(
        Opts::new("upstream_failures_total", "Total failed model API calls")
            .namespace("fieldporter")
    ).expect("metric can be created");
}

/// Register all metrics with the global registry.
/// Should be called once at startup.
pub fn register_metrics() -> prometheus::Result<()> {
    REGISTRY.register(Box::new(REQUESTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(REQUEST_DURATION_SECONDS.clone()))?;

    REGISTRY.register(Box::new(CACHE_HITS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(CACHE_MISSES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(CACHE_SIZE.clone()))?;
    REGISTRY.register(Box::new(CACHE_EVICTIONS_TOTAL.clone()))?;

    REGISTRY.register(Box::new(LEADS_QUALIFIED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(UPSTREAM_FAILURES_TOTAL.clone()))?;

    Ok(())
}

/// Encode all metrics to Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_else(|e| format!("# Error encoding metrics: {}", e))
}

/// Helper struct for tracking chat request duration.
/// Counts as an error if dropped without being recorded.
pub struct RequestTimer {
    start: std::time::Instant,
    recorded: bool,
}

impl RequestTimer {
    /// Start a new request timer.
    pub fn start() -> Self {
        Self { start: std::time::Instant::now(), recorded: false }
    }

    /// Milliseconds since the timer started.
    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    /// Record the request under the source that produced the reply.
    pub fn record(mut self, source: &str, status: &str) {
        self.observe(source, status);
    }

    fn observe(&mut self, source: &str, status: &str) {
        let duration = self.start.elapsed().as_secs_f64();
        REQUEST_DURATION_SECONDS.with_label_values(&[source]).observe(duration);
        REQUESTS_TOTAL.with_label_values(&[source, status]).inc();
        self.recorded = true;
    }
}

impl Drop for RequestTimer {
    fn drop(&mut self) {
        if !self.recorded {
            self.observe("error", "error");
        }
    }
}

/// Record a cache hit.
pub fn record_cache_hit(cache_type: &str) {
    CACHE_HITS_TOTAL.with_label_values(&[cache_type]).inc();
}

/// Record a cache miss.
pub fn record_cache_miss() {
    CACHE_MISSES_TOTAL.inc();
}

/// Bring the cache gauges in line with the store.
/// `evictions` is the store's running total.
pub fn sync_cache_stats(size: usize, evictions: u64) {
    CACHE_SIZE.set(size as i64);
    let seen = CACHE_EVICTIONS_TOTAL.get();
    if evictions > seen {
        CACHE_EVICTIONS_TOTAL.inc_by(evictions - seen);
    }
}

/// Record a qualified lead.
pub fn record_lead_qualified() {
    LEADS_QUALIFIED_TOTAL.inc();
}

/// Record a failed model call.
pub fn record_upstream_failure() {
    UPSTREAM_FAILURES_TOTAL.inc();
}
