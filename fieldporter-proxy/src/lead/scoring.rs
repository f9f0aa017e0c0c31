//! Sales-qualification scoring for chat messages.
//!
//! Each message is checked against weighted keyword groups. Groups that only
//! match earlier user turns still count, at a reduced weight, so a visitor
//! who mentioned their budget three messages ago keeps that credit.

use once_cell::sync::Lazy;
use regex::Regex;

use super::contact::ContactDetails;
use crate::types::chat::HistoryMessage;

/// Signal name for an e-mail address being known
pub const EMAIL_SIGNAL: &str = "email_provided";

/// Signal name for a phone number being known
pub const PHONE_SIGNAL: &str = "phone_provided";

/// Highest score a lead can reach
pub const MAX_SCORE: u32 = 100;

/// A named keyword group and the points it is worth
pub struct SignalGroup {
    pub name: &'static str,
    pub weight: u32,
    pattern: &'static Lazy<Regex>,
}

impl SignalGroup {
    pub fn matches(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }
}

static BUDGET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(budget|pricing|prices?|costs?|invest(?:ment)?|quotes?|proposal|how much|afford)\b")
        .expect("Invalid budget regex")
});

static TIMELINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(asap|urgent(?:ly)?|deadline|timeline|soon|immediately|this (?:week|month|quarter)|next (?:week|month|quarter))\b",
    )
    .expect("Invalid timeline regex")
});

static DECISION_MAKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(ceo|cto|coo|cfo|founder|co-founder|owner|director|vp|president|partner|head of \w+|i manage|i run)\b",
    )
    .expect("Invalid decision maker regex")
});

static BUSINESS_SIZE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d+\s*(?:employees|staff|people|locations|stores|offices)|team of \d+|enterprise|franchise)\b")
        .expect("Invalid business size regex")
});

static SERVICE_INTEREST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(automat(?:e|ion|ing)|ai|chatbots?|workflows?|integrat(?:e|ion|ions)|consult(?:ing|ation)?|strategy|training)\b",
    )
    .expect("Invalid service interest regex")
});

static CONTACT_REQUEST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(call me|schedule|book(?:ing)?|meeting|demo|talk to (?:a|someone|a human|your team)|speak (?:to|with)|contact me|reach out|get in touch|email me)\b",
    )
    .expect("Invalid contact request regex")
});

/// Keyword groups in reporting order
pub static SIGNAL_GROUPS: &[SignalGroup] = &[
    SignalGroup { name: "budget_discussed", weight: 20, pattern: &BUDGET },
    SignalGroup { name: "timeline_mentioned", weight: 15, pattern: &TIMELINE },
    SignalGroup { name: "decision_maker", weight: 15, pattern: &DECISION_MAKER },
    SignalGroup { name: "business_size", weight: 10, pattern: &BUSINESS_SIZE },
    SignalGroup { name: "service_interest", weight: 10, pattern: &SERVICE_INTEREST },
    SignalGroup { name: "contact_requested", weight: 15, pattern: &CONTACT_REQUEST },
];

/// Outcome of scoring one chat turn
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeadAnalysis {
    /// 0 to 100
    pub score: u32,
    pub signals: Vec<String>,
    pub contact: ContactDetails,
    /// The current message asks for a call, meeting or similar
    pub contact_requested: bool,
    pub should_notify: bool,
}

impl LeadAnalysis {
    pub fn email_collected(&self) -> bool {
        self.contact.email.is_some()
    }

    pub fn phone_collected(&self) -> bool {
        self.contact.phone.is_some()
    }
}

/// Lead scorer with tunable weights
#[derive(Debug, Clone)]
pub struct LeadScorer {
    /// Score at which a lead with contact details is worth a notification
    pub notify_threshold: u32,

    /// Multiplier for groups matched only in earlier turns
    pub history_weight: f32,

    /// Points for a known e-mail address
    pub email_weight: u32,

    /// Points for a known phone number
    pub phone_weight: u32,
}

impl Default for LeadScorer {
    fn default() -> Self {
        Self { notify_threshold: 70, history_weight: 0.5, email_weight: 25, phone_weight: 20 }
    }
}

impl LeadScorer {
    pub fn new(notify_threshold: u32) -> Self {
        Self { notify_threshold, ..Self::default() }
    }

    /// Score `message` in the context of the visitor's earlier turns.
    /// `known_email` is an address the widget already collected.
    pub fn analyze(&self, message: &str, history: &[HistoryMessage], known_email: Option<&str>) -> LeadAnalysis {
        let earlier: Vec<&str> = history.iter().filter(|m| m.is_user()).map(|m| m.content.as_str()).collect();

        let mut points = 0.0_f32;
        let mut signals = Vec::new();
        let mut contact_requested = false;

        for group in SIGNAL_GROUPS {
            if group.matches(message) {
                points += group.weight as f32;
                signals.push(group.name.to_string());
                if group.name == "contact_requested" {
                    contact_requested = true;
                }
            } else if earlier.iter().any(|turn| group.matches(turn)) {
                points += group.weight as f32 * self.history_weight;
                signals.push(group.name.to_string());
            }
        }

        let mut contact = ContactDetails::extract(message);
        for turn in earlier.iter().rev() {
            contact = contact.or(ContactDetails::extract(turn));
        }
        contact = contact.or(ContactDetails {
            email: known_email.map(str::trim).filter(|e| !e.is_empty()).map(str::to_lowercase),
            phone: None,
        });

        if contact.email.is_some() {
            points += self.email_weight as f32;
            signals.push(EMAIL_SIGNAL.to_string());
        }
        if contact.phone.is_some() {
            points += self.phone_weight as f32;
            signals.push(PHONE_SIGNAL.to_string());
        }

        let score = (points.round() as u32).min(MAX_SCORE);
        let should_notify = contact.is_known() && (score >= self.notify_threshold || contact_requested);

        LeadAnalysis { score, signals, contact, contact_requested, should_notify }
    }
}
