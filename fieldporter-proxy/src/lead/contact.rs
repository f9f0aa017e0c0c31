//! Contact details volunteered in chat messages.

use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}\b").expect("Invalid email regex")
});

static PHONE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\+?\d{1,3}[\s.-]?)?(?:\(\d{3}\)|\d{3})[\s.-]?\d{3}[\s.-]?\d{4}\b")
        .expect("Invalid phone regex")
});

/// E-mail address and phone number found for a visitor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactDetails {
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl ContactDetails {
    /// Pull whatever contact details appear in `text`
    pub fn extract(text: &str) -> Self {
        Self { email: extract_email(text), phone: extract_phone(text) }
    }

    /// Fill fields still missing from `other`
    pub fn or(self, other: ContactDetails) -> Self {
        Self { email: self.email.or(other.email), phone: self.phone.or(other.phone) }
    }

    pub fn is_known(&self) -> bool {
        self.email.is_some() || self.phone.is_some()
    }
}

/// First e-mail address in `text`, lowercased
pub fn extract_email(text: &str) -> Option<String> {
    EMAIL.find(text).map(|m| m.as_str().to_lowercase())
}

/// First phone number in `text`, as written
pub fn extract_phone(text: &str) -> Option<String> {
    PHONE.find(text).map(|m| m.as_str().trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_email() {
        assert_eq!(
            extract_email("reach me at Jane.Doe@Example.com please"),
            Some("jane.doe@example.com".to_string())
        );
        assert_eq!(extract_email("no address here"), None);
        assert_eq!(extract_email("broken@address"), None);
    }

    #[test]
    fn test_extract_phone() {
        assert_eq!(extract_phone("call 555-123-4567"), Some("555-123-4567".to_string()));
        assert_eq!(extract_phone("(555) 123 4567 works"), Some("(555) 123 4567".to_string()));
        assert_eq!(extract_phone("+1 555.123.4567"), Some("+1 555.123.4567".to_string()));
        assert_eq!(extract_phone("we have 40 employees"), None);
    }

    #[test]
    fn test_contact_merge() {
        let found = ContactDetails::extract("my number is 555-123-4567");
        let known = ContactDetails { email: Some("a@b.co".into()), phone: Some("000".into()) };
        let merged = found.or(known);
        assert_eq!(merged.email.as_deref(), Some("a@b.co"));
        assert_eq!(merged.phone.as_deref(), Some("555-123-4567"));
        assert!(merged.is_known());
        assert!(!ContactDetails::default().is_known());
    }
}
