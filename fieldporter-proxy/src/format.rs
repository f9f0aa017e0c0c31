//! Post-processing of model output and canned fallback replies.

use once_cell::sync::Lazy;
use regex::Regex;

static ROLE_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?i)(?:assistant|ai|bot)\s*:\s*").expect("Invalid role label regex"));

static EXCESS_NEWLINES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{3,}").expect("Invalid newline regex"));

static URGENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(urgent|asap|immediately|right away|emergency|today)\b").expect("Invalid urgency regex")
});

static PRICING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(price|prices|pricing|cost|costs|budget|quote|rates?|how much)\b")
        .expect("Invalid pricing regex")
});

static TECHNICAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(how (?:do|does|can|would)|api|integrat\w*|technical|implement\w*|architecture|model)\b")
        .expect("Invalid technical regex")
});

/// Which canned reply a failed request gets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackKind {
    Urgent,
    Pricing,
    Technical,
    Generic,
}

impl FallbackKind {
    /// Pick a variant by sniffing the user's message. Urgency wins over
    /// pricing, pricing over technical.
    pub fn classify(message: &str) -> Self {
        if URGENT.is_match(message) {
            FallbackKind::Urgent
        } else if PRICING.is_match(message) {
            FallbackKind::Pricing
        } else if TECHNICAL.is_match(message) {
            FallbackKind::Technical
        } else {
            FallbackKind::Generic
        }
    }
}

/// Clean up a model answer before it is shown or cached
pub fn format_response(raw: &str) -> String {
    let trimmed = raw.trim();
    let unlabelled = ROLE_LABEL.replace(trimmed, "");
    let lines: Vec<&str> = unlabelled.lines().map(str::trim_end).collect();
    let joined = lines.join("\n");
    EXCESS_NEWLINES.replace_all(&joined, "\n\n").trim().to_string()
}

/// Reply used when the model cannot be reached
pub fn fallback_response(message: &str, contact_email: &str) -> String {
    match FallbackKind::classify(message) {
        FallbackKind::Urgent => format!(
            "I'm sorry, I'm having trouble answering right now. Since this sounds time-sensitive, \
             please email {contact_email} and a member of our team will get back to you as quickly as possible."
        ),
        FallbackKind::Pricing => format!(
            "Pricing depends on the scope of your project, so we tailor every proposal. \
             I can't pull up the details at the moment, but if you email {contact_email} \
             we'll put together an estimate for you."
        ),
        FallbackKind::Technical => format!(
            "That's a great technical question, and I want to give you an accurate answer. \
             I'm having trouble right now, so please send the details to {contact_email} \
             and one of our consultants will follow up."
        ),
        FallbackKind::Generic => generic_apology(contact_email),
    }
}

/// Last-resort reply for requests that could not be handled at all
pub fn generic_apology(contact_email: &str) -> String {
    format!(
        "I'm sorry, something went wrong on our side. Please try again in a moment, \
         or email us directly at {contact_email}."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_strips_role_label() {
        assert_eq!(format_response("  Assistant: Hello there  "), "Hello there");
        assert_eq!(format_response("assistant:Hi"), "Hi");
    }

    #[test]
    fn test_format_collapses_blank_lines() {
        let raw = "First paragraph.   \n\n\n\n- one\n- two  \n";
        assert_eq!(format_response(raw), "First paragraph.\n\n- one\n- two");
    }

    #[test]
    fn test_format_keeps_inner_label() {
        let raw = "We offer:\nAssistant: setup and training";
        assert_eq!(format_response(raw), raw);
    }

    #[test]
    fn test_fallback_classification() {
        assert_eq!(FallbackKind::classify("I need this ASAP"), FallbackKind::Urgent);
        assert_eq!(FallbackKind::classify("How much does it cost?"), FallbackKind::Pricing);
        assert_eq!(FallbackKind::classify("Can you integrate with our CRM API"), FallbackKind::Technical);
        assert_eq!(FallbackKind::classify("tell me a story"), FallbackKind::Generic);
        assert_eq!(FallbackKind::classify("urgent quote please"), FallbackKind::Urgent);
    }

    #[test]
    fn test_fallbacks_mention_contact() {
        for message in ["asap", "pricing", "api", "hello"] {
            assert!(fallback_response(message, "team@example.com").contains("team@example.com"));
        }
    }
}
