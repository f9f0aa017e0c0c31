//! Health check and metrics endpoints.

use axum::{extract::State, http::header, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use std::sync::Arc;

use crate::metrics::{encode_metrics, sync_cache_stats};
use crate::state::AppState;

/// Health check endpoint
///
/// GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "model": state.config.model,
        "cache": {
            "entries": state.cache.len(),
            "capacity": state.cache.config().max_entries
        },
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Metrics endpoint with cache analytics
///
/// GET /metrics
pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let analytics = state.cache.analytics();
    let config = state.cache.config();

    Json(json!({
        "analytics": analytics,
        "cache": {
            "size": state.cache.len(),
            "evictions": state.cache.evictions(),
            "expirations": state.cache.expirations(),
            "config": {
                "max_entries": config.max_entries,
                "min_confidence": config.min_confidence,
                "high_confidence": config.high_confidence,
                "long_ttl_secs": config.long_ttl.as_secs(),
                "short_ttl_secs": config.short_ttl.as_secs(),
                "sweep_interval_secs": config.sweep_interval.as_secs()
            }
        }
    }))
}

/// Prometheus text exposition
///
/// GET /metrics/prometheus
pub async fn metrics_prometheus(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    sync_cache_stats(state.cache.len(), state.cache.evictions());
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        encode_metrics(),
    )
}

/// Live check (for Kubernetes)
///
/// GET /live
pub async fn live() -> impl IntoResponse {
    StatusCode::OK
}
