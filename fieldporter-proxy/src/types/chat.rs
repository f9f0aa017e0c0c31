//! Wire types for the site's chat endpoint.
//!
//! Field names are camelCase to match the chat widget.

use serde::{Deserialize, Serialize};

/// One earlier turn of the conversation, as sent by the widget
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryMessage {
    /// "user" or "assistant"; anything else is ignored
    pub role: String,
    pub content: String,
    #[serde(default)]
    pub timestamp: Option<serde_json::Value>,
}

impl HistoryMessage {
    pub fn is_user(&self) -> bool {
        self.role.eq_ignore_ascii_case("user")
    }

    pub fn is_assistant(&self) -> bool {
        self.role.eq_ignore_ascii_case("assistant")
    }
}

/// Request body for POST /api/chat
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub conversation_history: Vec<HistoryMessage>,
    #[serde(default)]
    pub user_email: Option<String>,
    /// Any JSON number is accepted; see [`prior_message_count`](Self::prior_message_count)
    #[serde(default)]
    pub message_count: Option<f64>,
}

impl ChatRequest {
    /// Messages exchanged before this one, clamped to the `u32` range.
    ///
    /// Falls back to the user turns in the history when the widget sent no count.
    pub fn prior_message_count(&self) -> u32 {
        match self.message_count {
            // Float to int `as` saturates, and NaN becomes 0
            Some(count) => count as u32,
            None => {
                let turns = self.conversation_history.iter().filter(|m| m.is_user()).count();
                u32::try_from(turns).unwrap_or(u32::MAX)
            }
        }
    }
}

/// Which path produced the reply text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReplyAgent {
    QuickResponse,
    Cache,
    Assistant,
    Fallback,
    Error,
}

impl ReplyAgent {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReplyAgent::QuickResponse => "quick-response",
            ReplyAgent::Cache => "cache",
            ReplyAgent::Assistant => "assistant",
            ReplyAgent::Fallback => "fallback",
            ReplyAgent::Error => "error",
        }
    }
}

/// Metadata attached to every chat reply
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyMetadata {
    /// RFC 3339 time the reply was produced
    pub timestamp: String,
    pub agent: ReplyAgent,
    /// End-to-end handling time in milliseconds
    pub response_time: u64,
    pub lead_score: u32,
    pub email_collected: bool,
    pub phone_collected: bool,
    pub contact_requested: bool,
    pub qualification_signals: Vec<String>,
    pub confidence_score: f32,
}

/// Response body for POST /api/chat
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub response: String,
    pub session_id: String,
    pub message_count: u32,
    pub should_notify: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_phone: Option<String>,
    pub lead_score: u32,
    pub metadata: ReplyMetadata,
}
