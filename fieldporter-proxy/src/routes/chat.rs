//! Chat endpoint used by the site widget.
//!
//! Every request goes through the response cache first; the model is only
//! called on a miss, and its answer is offered back to the cache. Lead
//! scoring runs on every successful turn whatever produced the text.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::cache::CacheSource;
use crate::error::ProxyError;
use crate::format::{fallback_response, format_response, generic_apology};
use crate::lead::LeadAnalysis;
use crate::llm::{build_messages, SYSTEM_PROMPT};
use crate::metrics::{self, RequestTimer};
use crate::state::AppState;
use crate::types::chat::{ChatReply, ChatRequest, ReplyAgent, ReplyMetadata};

/// Message that skips all processing and reports liveness
pub const HEALTH_CHECK_MESSAGE: &str = "health_check";

/// Chat endpoint
///
/// POST /api/chat
pub async fn chat(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let timer = RequestTimer::start();

    let request: ChatRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            error!(error = %e, "Failed to parse chat request");
            let reply = error_reply(&state, timer.elapsed_ms());
            timer.record(ReplyAgent::Error.as_str(), "error");
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(reply)).into_response();
        }
    };

    let message = match request.message.as_deref().map(str::trim) {
        Some(m) if !m.is_empty() => m.to_string(),
        _ => {
            timer.record("none", "rejected");
            return ProxyError::MissingMessage.into_response();
        }
    };

    if request.message.as_deref() == Some(HEALTH_CHECK_MESSAGE) {
        timer.record("health", "success");
        return Json(json!({
            "status": "healthy",
            "service": "fieldporter-chat",
            "version": env!("CARGO_PKG_VERSION"),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }))
        .into_response();
    }

    let session_id = request
        .session_id
        .clone()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| format!("session_{}", uuid::Uuid::new_v4()));

    info!(
        session_id = %session_id,
        history = request.conversation_history.len(),
        "Handling POST /api/chat"
    );

    let (text, agent, confidence) = answer(&state, &request, &message, &session_id).await;

    let analysis = state.leads.analyze(&message, &request.conversation_history, request.user_email.as_deref());
    if analysis.should_notify {
        info!(
            session_id = %session_id,
            lead_score = analysis.score,
            signals = ?analysis.signals,
            "Qualified lead"
        );
        metrics::record_lead_qualified();
    }

    metrics::sync_cache_stats(state.cache.len(), state.cache.evictions());

    let message_count = request.prior_message_count().saturating_add(1);

    let reply = build_reply(text, session_id, message_count, agent, confidence, analysis, timer.elapsed_ms());
    timer.record(agent.as_str(), "success");

    Json(reply).into_response()
}

/// Produce the reply text, consulting the model only on a cache miss
async fn answer(
    state: &AppState,
    request: &ChatRequest,
    message: &str,
    session_id: &str,
) -> (String, ReplyAgent, f32) {
    let lookup = state.cache.resolve(message, session_id);

    match lookup.source {
        Some(CacheSource::Quick) => {
            metrics::record_cache_hit(CacheSource::Quick.as_str());
            debug!(session_id, latency_ms = lookup.latency_ms, source = "quick", "Answered from cache");
            (lookup.response, ReplyAgent::QuickResponse, lookup.confidence)
        }
        Some(CacheSource::Cache) => {
            metrics::record_cache_hit(CacheSource::Cache.as_str());
            debug!(session_id, latency_ms = lookup.latency_ms, source = "cache", "Answered from cache");
            (lookup.response, ReplyAgent::Cache, lookup.confidence)
        }
        None => {
            metrics::record_cache_miss();
            match ask_model(state, request, message, session_id).await {
                Ok(text) => {
                    let personalized = state.cache.is_personalized(message);
                    let confidence = state.scorer.score(message, &text, personalized);
                    let stored = state.cache.record(message, &text, session_id, confidence);
                    debug!(session_id, confidence, stored, "Model answer offered to cache");
                    (text, ReplyAgent::Assistant, confidence)
                }
                Err(e) => {
                    if e.is_upstream() {
                        warn!(session_id, error = %e, "Model call failed, using fallback reply");
                        metrics::record_upstream_failure();
                    } else {
                        error!(session_id, error = %e, "Backend error, using fallback reply");
                    }
                    (fallback_response(message, &state.config.contact_email), ReplyAgent::Fallback, 0.0)
                }
            }
        }
    }
}

async fn ask_model(
    state: &AppState,
    request: &ChatRequest,
    message: &str,
    session_id: &str,
) -> Result<String, ProxyError> {
    let messages = build_messages(
        SYSTEM_PROMPT,
        &request.conversation_history,
        state.config.history_limit,
        message,
    );

    let timeout = state.config.llm_timeout;
    let raw = tokio::time::timeout(timeout, state.backend.complete(&messages, Some(session_id)))
        .await
        .map_err(|_| ProxyError::Timeout(timeout))??;

    let text = format_response(&raw);
    if text.is_empty() {
        return Err(ProxyError::UpstreamFormat("empty completion".into()));
    }
    Ok(text)
}

fn build_reply(
    response: String,
    session_id: String,
    message_count: u32,
    agent: ReplyAgent,
    confidence: f32,
    analysis: LeadAnalysis,
    response_time: u64,
) -> ChatReply {
    let email_collected = analysis.email_collected();
    let phone_collected = analysis.phone_collected();

    ChatReply {
        response,
        session_id,
        message_count,
        should_notify: analysis.should_notify,
        user_email: analysis.contact.email,
        user_phone: analysis.contact.phone,
        lead_score: analysis.score,
        metadata: ReplyMetadata {
            timestamp: chrono::Utc::now().to_rfc3339(),
            agent,
            response_time,
            lead_score: analysis.score,
            email_collected,
            phone_collected,
            contact_requested: analysis.contact_requested,
            qualification_signals: analysis.signals,
            confidence_score: confidence,
        },
    }
}

/// Reply for requests that could not be handled at all
fn error_reply(state: &AppState, response_time: u64) -> ChatReply {
    build_reply(
        generic_apology(&state.config.contact_email),
        format!("session_{}", uuid::Uuid::new_v4()),
        1,
        ReplyAgent::Error,
        0.0,
        LeadAnalysis::default(),
        response_time,
    )
}
