//! Client for the hosted language model.
//!
//! Only consulted on a cache miss. Every failure mode (connection, timeout,
//! HTTP status, malformed body, missing content) surfaces as a
//! [`ProxyError`] so the chat handler can fall back to canned text.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error, info, instrument};

use crate::error::ProxyError;
use crate::types::chat::HistoryMessage;
use crate::types::openai::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage, Role};

/// Instructions sent ahead of every conversation
pub const SYSTEM_PROMPT: &str = "You are the virtual assistant for Fieldporter, a consulting firm \
that helps small and mid-sized businesses adopt AI and automation. Answer questions about \
Fieldporter's services (AI strategy and readiness assessments, workflow automation, custom \
assistants and chatbots, data and systems integration, team training) in a friendly, concise \
way. Keep answers under 150 words, use short bullet lists when listing options, never invent \
prices or client names, and invite the visitor to share their email when they want a proposal \
or a call.";

/// Anything that can turn a conversation into an answer
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Produce the assistant's next message
    async fn complete(&self, messages: &[ChatMessage], user: Option<&str>) -> Result<String, ProxyError>;
}

/// Build the prompt: system instructions, the last `history_limit` usable
/// turns of history, then the new message
pub fn build_messages(
    system_prompt: &str,
    history: &[HistoryMessage],
    history_limit: usize,
    message: &str,
) -> Vec<ChatMessage> {
    let usable: Vec<&HistoryMessage> = history
        .iter()
        .filter(|m| (m.is_user() || m.is_assistant()) && !m.content.trim().is_empty())
        .collect();
    let skip = usable.len().saturating_sub(history_limit);

    let mut messages = Vec::with_capacity(usable.len() - skip + 2);
    messages.push(ChatMessage::new(Role::System, system_prompt));
    for turn in usable.into_iter().skip(skip) {
        let role = if turn.is_user() { Role::User } else { Role::Assistant };
        messages.push(ChatMessage::new(role, turn.content.trim()));
    }
    messages.push(ChatMessage::new(Role::User, message));
    messages
}

/// Chat Completions client for an OpenAI-compatible API
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    max_tokens: u32,
    temperature: f32,
    timeout: Duration,
}

impl OpenAiClient {
    /// Create a new client
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProxyError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let model = model.into();
        info!(url = %base_url, model = %model, "Creating model API client");

        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url,
            api_key,
            model,
            max_tokens: 500,
            temperature: 0.7,
            timeout,
        })
    }

    /// Override the generation limits
    pub fn with_generation(mut self, max_tokens: u32, temperature: f32) -> Self {
        self.max_tokens = max_tokens;
        self.temperature = temperature;
        self
    }

    /// Get the API base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the model name
    pub fn model(&self) -> &str {
        &self.model
    }

    fn classify(&self, e: reqwest::Error) -> ProxyError {
        if e.is_timeout() {
            ProxyError::Timeout(self.timeout)
        } else if e.is_connect() {
            ProxyError::UpstreamConnection(e.to_string())
        } else {
            ProxyError::Http(e)
        }
    }
}

#[async_trait]
impl CompletionBackend for OpenAiClient {
    #[instrument(skip(self, messages, user), fields(model = %self.model, messages = messages.len()))]
    async fn complete(&self, messages: &[ChatMessage], user: Option<&str>) -> Result<String, ProxyError> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(url = %url, "Sending chat completion request");

        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: messages.to_vec(),
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            user: user.map(str::to_string),
        };

        let mut builder = self.client.post(&url).json(&request);
        if let Some(ref key) = self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "Model API returned error");
            return Err(ProxyError::UpstreamStatus { status: status.as_u16(), body });
        }

        let body = response.text().await.map_err(|e| self.classify(e))?;
        let parsed: ChatCompletionResponse =
            serde_json::from_str(&body).map_err(|e| ProxyError::UpstreamFormat(e.to_string()))?;

        let content = parsed
            .first_content()
            .ok_or_else(|| ProxyError::UpstreamFormat("no message content in first choice".into()))?;

        if let Some(ref usage) = parsed.usage {
            debug!(tokens = usage.completion_tokens, "Chat completion finished");
        }
        Ok(content.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(role: &str, content: &str) -> HistoryMessage {
        HistoryMessage { role: role.to_string(), content: content.to_string(), timestamp: None }
    }

    #[test]
    fn test_client_creation() {
        let client = OpenAiClient::new(
            "https://api.example.com/v1/",
            None,
            "gpt-4o-mini",
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(client.base_url(), "https://api.example.com/v1");
        assert_eq!(client.model(), "gpt-4o-mini");
    }

    #[test]
    fn test_build_messages_order() {
        let history = vec![turn("user", "hi"), turn("assistant", "hello!")];
        let messages = build_messages("sys", &history, 10, "what do you cost");

        let roles: Vec<Role> = messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant, Role::User]);
        assert_eq!(messages[3].content.as_deref(), Some("what do you cost"));
    }

    #[test]
    fn test_build_messages_limits_and_filters_history() {
        let history = vec![
            turn("user", "one"),
            turn("assistant", "two"),
            turn("system", "ignored"),
            turn("user", "   "),
            turn("user", "three"),
        ];
        let messages = build_messages("sys", &history, 2, "four");

        let contents: Vec<&str> = messages.iter().filter_map(|m| m.content.as_deref()).collect();
        assert_eq!(contents, vec!["sys", "two", "three", "four"]);
    }
}
