//! HTTP route handlers for the Fieldporter chat proxy.
//!
//! - `chat`: the widget's chat endpoint
//! - `health`: health check and metrics endpoints

pub mod chat;
pub mod health;

// Re-export handlers for convenience
pub use chat::chat;
pub use health::{health, live, metrics, metrics_prometheus};
