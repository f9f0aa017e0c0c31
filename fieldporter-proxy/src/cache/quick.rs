//! Canned answers for small talk and FAQ-style questions.
//!
//! Patterns are evaluated in table order against the normalized query and
//! the first match wins. Matching never touches the LRU store and never
//! reaches the language model.

use once_cell::sync::Lazy;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{RngCore, SeedableRng};
use regex::Regex;
use serde::Serialize;
use std::sync::{Mutex, PoisonError};

/// Confidence attached to every quick response.
pub const QUICK_RESPONSE_CONFIDENCE: f32 = 0.95;

/// Placeholder replaced with the configured contact address.
const CONTACT_TOKEN: &str = "{contact}";

/// What kind of question a pattern answers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuickCategory {
    Greeting,
    Thanks,
    Farewell,
    SmallTalk,
    Identity,
    Pricing,
    Booking,
    Contact,
    HumanHandoff,
    Timeline,
    Services,
    Topic,
}

/// How a matched pattern produces its answer
enum Reply {
    /// One of several canned variants, picked at random
    OneOf(&'static [&'static str]),
    /// Built from the first capture group of the match
    Template(fn(&str) -> String),
}

struct QuickPattern {
    category: QuickCategory,
    pattern: Regex,
    reply: Reply,
}

impl QuickPattern {
    fn new(category: QuickCategory, pattern: &str, reply: Reply) -> Self {
        Self {
            category,
            pattern: Regex::new(&format!("(?i){}", pattern)).expect("Invalid quick response pattern"),
            reply,
        }
    }

    fn render(&self, query: &str, rng: &mut dyn RngCore) -> Option<String> {
        match &self.reply {
            Reply::OneOf(variants) => variants.choose(rng).map(|s| s.to_string()),
            Reply::Template(build) => {
                let caps = self.pattern.captures(query)?;
                let matched = caps.get(1).or_else(|| caps.get(0))?;
                Some(build(matched.as_str()))
            }
        }
    }
}

static PATTERNS: Lazy<Vec<QuickPattern>> = Lazy::new(|| {
    use QuickCategory::*;
    vec![
        QuickPattern::new(
            Greeting,
            r"^(?:hi|hello|hey|hiya|howdy|greetings|good (?:morning|afternoon|evening))(?: there)?$",
            Reply::OneOf(&[
                "Hi there! I'm the Fieldporter assistant. Are you exploring AI or automation for your business?",
                "Hello! Happy to help. What would you like to know about Fieldporter's consulting services?",
                "Hey! Welcome to Fieldporter. Ask me anything about AI strategy, automation or our process.",
            ]),
        ),
        QuickPattern::new(
            Thanks,
            r"^(?:thanks|thank you|thx|ty|cheers)(?: so much| a lot| very much)?$",
            Reply::OneOf(&[
                "You're welcome! Anything else you'd like to know?",
                "Happy to help. Let me know if there's anything else.",
                "Any time! If you'd like to talk to the team directly, email {contact}.",
            ]),
        ),
        QuickPattern::new(
            Farewell,
            r"^(?:bye|goodbye|see you|see ya|cya|later|good night)$",
            Reply::OneOf(&[
                "Thanks for stopping by! You can always reach us at {contact}.",
                "Goodbye! Come back any time you have questions.",
            ]),
        ),
        QuickPattern::new(
            SmallTalk,
            r"^how are you(?: doing| today)?$",
            Reply::OneOf(&[
                "Doing well, thanks for asking! How can I help you today?",
                "All good here. What can I help you with?",
            ]),
        ),
        QuickPattern::new(
            Identity,
            r"^(?:who|what) are you$|\bare you (?:a bot|a robot|human|real|an ai)\b",
            Reply::OneOf(&[
                "I'm Fieldporter's virtual assistant. I can answer questions about our services, and a consultant can follow up on anything detailed.",
            ]),
        ),
        QuickPattern::new(
            Pricing,
            r"\b(?:price|prices|pricing|cost|costs|how much|rates?|fees?|quote)\b",
            Reply::OneOf(&[
                "Pricing depends on scope. Most engagements start with a fixed-price discovery phase, then move to a project or retainer model. Share a little about what you need and we can give you a ballpark, or email {contact} for a proposal.",
                "Every project is scoped individually: we start with a short discovery call, then send a fixed quote so there are no surprises. Want to set one up? Email {contact}.",
            ]),
        ),
        QuickPattern::new(
            Booking,
            r"\b(?:book|schedule|arrange|set up)\b.*\b(?:call|meeting|consultation|demo)\b",
            Reply::OneOf(&[
                "Great! Send your preferred times to {contact} and we'll confirm a free 30-minute consultation.",
                "We'd love to chat. Email {contact} with a couple of times that suit you and we'll lock in a call.",
            ]),
        ),
        QuickPattern::new(
            HumanHandoff,
            r"\b(?:talk|speak|chat) (?:to|with) (?:a |an )?(?:human|person|someone|consultant|real person)\b",
            Reply::OneOf(&[
                "Of course. Leave your email here or write to {contact} and a consultant will get back to you within one business day.",
            ]),
        ),
        QuickPattern::new(
            Contact,
            r"\b(?:contact|email address|phone number|call you|reach you|get in touch)\b",
            Reply::OneOf(&[
                "You can reach the team at {contact}. If you leave your email here, we'll get back to you within one business day.",
            ]),
        ),
        QuickPattern::new(
            Timeline,
            r"\bhow long\b.*\b(?:take|project|implementation|engagement)\b",
            Reply::OneOf(&[
                "Most projects run 4 to 12 weeks. A focused automation can ship in a few weeks, while larger AI rollouts are delivered in phases so you see value early.",
            ]),
        ),
        QuickPattern::new(
            Services,
            r"\bwhat services\b|\bservices (?:do you|you) offer\b|^what do you (?:offer|do)$",
            Reply::OneOf(&[
                "We help businesses put AI to work: strategy and readiness assessments, workflow automation, custom assistants and chatbots, data and integration projects, and team training. Which of those is most relevant for you?",
            ]),
        ),
        QuickPattern::new(
            Topic,
            r"\b(automat(?:ion|e|ing)|workflows?|process(?:es)?|chatbots?|integrat(?:e|ion|ions))\b",
            Reply::Template(topic_reply),
        ),
    ]
});

/// Topic lookup for the templated answer: (topic word prefix, subject, detail)
const TOPICS: &[(&str, &str, &str)] = &[
    (
        "automat",
        "automation",
        "we map your repetitive tasks, pick the ones with the best payback, and automate them with the tools you already use",
    ),
    (
        "workflow",
        "workflow automation",
        "we map your repetitive tasks, pick the ones with the best payback, and automate them with the tools you already use",
    ),
    (
        "process",
        "process improvement",
        "we document how work flows today, find the bottlenecks, and redesign the process before adding any technology",
    ),
    (
        "chatbot",
        "chatbots and assistants",
        "we build assistants trained on your own content that answer customers and hand off to your team when needed",
    ),
    (
        "integrat",
        "systems integration",
        "we connect your CRM, finance and operations tools so data moves between them without copy and paste",
    ),
];

fn topic_reply(matched: &str) -> String {
    let matched = matched.to_lowercase();
    let (subject, detail) = TOPICS
        .iter()
        .find(|(prefix, _, _)| matched.starts_with(prefix))
        .map(|(_, subject, detail)| (*subject, *detail))
        .unwrap_or(("AI consulting", "we start with a short discovery call to understand your goals"));

    format!(
        "Yes, {} is one of our core services: {}. Would you like to hear how that could work for you? You can also email {}.",
        subject, detail, CONTACT_TOKEN
    )
}

/// A quick response produced for a query
#[derive(Debug, Clone, PartialEq)]
pub struct QuickResponse {
    pub text: String,
    pub category: QuickCategory,
}

/// Ordered pattern table with an injectable random source
pub struct QuickResponder {
    contact_email: String,
    rng: Mutex<StdRng>,
}

impl QuickResponder {
    /// Create a responder seeded from the OS entropy source
    pub fn new(contact_email: impl Into<String>) -> Self {
        Self::with_rng(contact_email, StdRng::from_entropy())
    }

    /// Create a responder with a fixed seed (deterministic variant choice)
    pub fn with_seed(contact_email: impl Into<String>, seed: u64) -> Self {
        Self::with_rng(contact_email, StdRng::seed_from_u64(seed))
    }

    fn with_rng(contact_email: impl Into<String>, rng: StdRng) -> Self {
        Self { contact_email: contact_email.into(), rng: Mutex::new(rng) }
    }

    /// Category of the first pattern matching the normalized query
    pub fn category_for(&self, normalized: &str) -> Option<QuickCategory> {
        PATTERNS
            .iter()
            .find(|p| p.pattern.is_match(normalized))
            .map(|p| p.category)
    }

    /// Answer the normalized query from the pattern table, if any pattern matches
    pub fn respond(&self, normalized: &str) -> Option<QuickResponse> {
        if normalized.is_empty() {
            return None;
        }
        let pattern = PATTERNS.iter().find(|p| p.pattern.is_match(normalized))?;
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let text = pattern.render(normalized, &mut *rng)?;
        Some(QuickResponse {
            text: text.replace(CONTACT_TOKEN, &self.contact_email),
            category: pattern.category,
        })
    }
}
