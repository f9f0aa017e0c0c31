//! Lead qualification for chat visitors.
//!
//! Runs after the reply text is settled, regardless of whether it came from
//! a quick response, the cache or the model.

pub mod contact;
pub mod scoring;

pub use contact::{extract_email, extract_phone, ContactDetails};
pub use scoring::{LeadAnalysis, LeadScorer, SignalGroup, SIGNAL_GROUPS};
