//! API types for the Fieldporter chat proxy.
//!
//! `chat` holds the widget-facing request/response shapes, `openai` the
//! subset of the Chat Completions API used to reach the model.

pub mod chat;
pub mod openai;
