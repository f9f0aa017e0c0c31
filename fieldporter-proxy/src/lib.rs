//! Fieldporter Chat Proxy Library
//!
//! Chat backend for the Fieldporter site widget. Answers come from a
//! pattern table, an LRU response cache, or the hosted model, in that
//! order; every turn is also scored as a sales lead.
//!
//! This library provides the router and server entry point so the proxy
//! can be run as the bundled binary or embedded in tests.

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

pub mod cache;
pub mod error;
pub mod format;
pub mod lead;
pub mod llm;
pub mod metrics;
pub mod routes;
pub mod state;
pub mod types;

pub use state::{AppState, ProxyConfig};

/// Initialize Prometheus metrics registry.
/// Should be called once before starting the server.
pub fn init_metrics() {
    if let Err(e) = metrics::register_metrics() {
        warn!("Failed to register Prometheus metrics: {}", e);
    }
}

/// Build the HTTP router around shared state
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health endpoints
        .route("/health", get(routes::health))
        .route("/live", get(routes::live))
        .route("/metrics", get(routes::metrics))
        .route("/metrics/prometheus", get(routes::metrics_prometheus))
        // Chat widget
        .route("/api/chat", post(routes::chat))
        // Middleware
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the Fieldporter chat proxy.
///
/// This function starts the HTTP server and blocks until it's shut down.
///
/// # Example
/// ```no_run
/// use fieldporter_proxy::{run_server, ProxyConfig};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     run_server(ProxyConfig::from_env(), true).await
/// }
/// ```
pub async fn run_server(config: ProxyConfig, print_banner: bool) -> anyhow::Result<()> {
    config.validate()?;

    // Initialize Prometheus metrics
    init_metrics();

    info!(
        port = config.port,
        llm_url = %config.llm_url,
        model = %config.model,
        "Starting Fieldporter chat proxy v{}",
        env!("CARGO_PKG_VERSION")
    );

    if config.llm_api_key.is_none() {
        warn!("No model API key configured; cache misses will fall back to canned replies");
    }

    // Create application state
    let state = Arc::new(AppState::new(config.clone())?);
    let _sweeper = state.cache.spawn_sweeper();

    let app = build_router(state.clone());

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Fieldporter chat proxy listening on http://{}", addr);
    info!("Chat:    http://{}/api/chat", addr);
    info!("Health:  http://{}/health", addr);

    if print_banner {
        banner(&config);
    }

    axum::serve(listener, app).await?;

    Ok(())
}

/// Print the startup banner
fn banner(config: &ProxyConfig) {
    let cache = &config.cache;

    println!();
    println!("==================================================");
    println!("  Fieldporter Chat Proxy v{}", env!("CARGO_PKG_VERSION"));
    println!("==================================================");
    println!("  Listening on: http://0.0.0.0:{}", config.port);
    println!("  Model: {} via {}", config.model, config.llm_url);
    println!("  Model timeout: {}s", config.llm_timeout.as_secs());
    println!();
    println!("  Cache configuration:");
    println!("    Capacity: {} entries", cache.max_entries);
    println!(
        "    Confidence: cache >= {:.0}%, long TTL >= {:.0}%",
        cache.min_confidence * 100.0,
        cache.high_confidence * 100.0
    );
    println!(
        "    TTL: {}s / {}s, sweep every {}s",
        cache.long_ttl.as_secs(),
        cache.short_ttl.as_secs(),
        cache.sweep_interval.as_secs()
    );
    println!();
    println!("  Leads: notify at score >= {}", config.notify_threshold);
    println!();
    println!("  Endpoints:");
    println!("    Chat:    POST /api/chat");
    println!("    Health:  GET  /health, /live");
    println!("    Metrics: GET  /metrics, /metrics/prometheus");
    println!("==================================================");
    println!();
}
