use crate::email::EmailFacts;
use serde::{Deserialize, Serialize};

/// One weighted content rule. Kept as data so matching order and weights
/// are auditable and testable in isolation.
struct ContentRule {
    pattern: &'static str,
    weight: u32,
    label: &'static str,
}

/// Ordered rule table scanned against the lower-cased subject+body.
const CONTENT_RULES: &[ContentRule] = &[
    // Credential harvesting
    ContentRule { pattern: "verify your account", weight: 20, label: "Credential request: 'verify your account'" },
    ContentRule { pattern: "confirm your identity", weight: 20, label: "Credential request: 'confirm your identity'" },
    ContentRule { pattern: "update your password", weight: 20, label: "Credential request: 'update your password'" },
    ContentRule { pattern: "enter your password", weight: 25, label: "Credential request: 'enter your password'" },
    ContentRule { pattern: "update your payment", weight: 20, label: "Credential request: 'update your payment'" },
    ContentRule { pattern: "confirm your billing", weight: 20, label: "Credential request: 'confirm your billing'" },
    ContentRule { pattern: "login to your account", weight: 15, label: "Credential request: 'login to your account'" },
    // Account threats
    ContentRule { pattern: "account has been suspended", weight: 25, label: "Account threat: suspension claim" },
    ContentRule { pattern: "account will be closed", weight: 25, label: "Account threat: closure claim" },
    ContentRule { pattern: "account has been compromised", weight: 20, label: "Account threat: compromise claim" },
    ContentRule { pattern: "unusual activity", weight: 15, label: "Account threat: unusual activity claim" },
    ContentRule { pattern: "unauthorized access", weight: 15, label: "Account threat: unauthorized access claim" },
    ContentRule { pattern: "security alert", weight: 10, label: "Account threat: security alert" },
    // Urgency pressure
    ContentRule { pattern: "immediate action", weight: 15, label: "Urgency pressure: 'immediate action'" },
    ContentRule { pattern: "urgent", weight: 10, label: "Urgency pressure: 'urgent'" },
    ContentRule { pattern: "act now", weight: 10, label: "Urgency pressure: 'act now'" },
    ContentRule { pattern: "within 24 hours", weight: 10, label: "Urgency pressure: 24-hour deadline" },
    ContentRule { pattern: "final notice", weight: 15, label: "Urgency pressure: final notice" },
    ContentRule { pattern: "expires today", weight: 10, label: "Urgency pressure: same-day expiry" },
    // Financial and payment pressure
    ContentRule { pattern: "wire transfer", weight: 15, label: "Financial pressure: wire transfer" },
    ContentRule { pattern: "payment overdue", weight: 15, label: "Financial pressure: overdue payment" },
    ContentRule { pattern: "invoice attached", weight: 10, label: "Financial pressure: unsolicited invoice" },
    ContentRule { pattern: "western union", weight: 20, label: "Financial pressure: money transfer service" },
    // Crypto and gift cards
    ContentRule { pattern: "bitcoin", weight: 15, label: "Crypto pressure: bitcoin" },
    ContentRule { pattern: "cryptocurrency", weight: 15, label: "Crypto pressure: cryptocurrency" },
    ContentRule { pattern: "gift card", weight: 20, label: "Gift card request" },
    ContentRule { pattern: "itunes card", weight: 25, label: "Gift card request: iTunes" },
    ContentRule { pattern: "google play card", weight: 25, label: "Gift card request: Google Play" },
    // Prize bait
    ContentRule { pattern: "you have won", weight: 20, label: "Prize bait: winning claim" },
    ContentRule { pattern: "claim your prize", weight: 20, label: "Prize bait: prize claim" },
    ContentRule { pattern: "lottery", weight: 15, label: "Prize bait: lottery" },
    ContentRule { pattern: "inheritance", weight: 15, label: "Prize bait: inheritance" },
];

struct Brand {
    /// Lower-cased form matched against the text.
    mention: &'static str,
    /// Token expected inside a legitimate sender domain.
    domain_token: &'static str,
    /// Display form used in the flag string.
    display: &'static str,
}

const BRANDS: &[Brand] = &[
    Brand { mention: "paypal", domain_token: "paypal", display: "PayPal" },
    Brand { mention: "microsoft", domain_token: "microsoft", display: "Microsoft" },
    Brand { mention: "apple", domain_token: "apple", display: "Apple" },
    Brand { mention: "amazon", domain_token: "amazon", display: "Amazon" },
    Brand { mention: "google", domain_token: "google", display: "Google" },
    Brand { mention: "netflix", domain_token: "netflix", display: "Netflix" },
    Brand { mention: "facebook", domain_token: "facebook", display: "Facebook" },
    Brand { mention: "instagram", domain_token: "instagram", display: "Instagram" },
    Brand { mention: "whatsapp", domain_token: "whatsapp", display: "WhatsApp" },
    Brand { mention: "bank of america", domain_token: "bankofamerica", display: "Bank of America" },
    Brand { mention: "wells fargo", domain_token: "wellsfargo", display: "Wells Fargo" },
    Brand { mention: "docusign", domain_token: "docusign", display: "DocuSign" },
    Brand { mention: "dropbox", domain_token: "dropbox", display: "Dropbox" },
    Brand { mention: "fedex", domain_token: "fedex", display: "FedEx" },
    Brand { mention: "dhl", domain_token: "dhl", display: "DHL" },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SocialEngineeringTier {
    Low,
    Moderate,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentResult {
    pub phishing_score: u32,
    pub social_engineering: SocialEngineeringTier,
    pub impersonation: bool,
    pub short_body_with_links: bool,
    pub flags: Vec<String>,
}

pub struct ContentAnalyzer;

impl ContentAnalyzer {
    /// Scan subject+body against the weighted rule table and fold in
    /// metadata-derived signals. Pure computation, no I/O.
    pub fn analyze(facts: &EmailFacts) -> ContentResult {
        let text = format!("{} {}", facts.subject, facts.body).to_lowercase();
        let sender_domain = facts.sender_domain().unwrap_or_default();
        let metadata = &facts.metadata;

        let mut score: u32 = 0;
        let mut flags = Vec::new();

        for rule in CONTENT_RULES {
            if text.contains(rule.pattern) {
                score += rule.weight;
                flags.push(rule.label.to_string());
            }
        }

        let mut impersonation = false;
        for brand in BRANDS {
            if text.contains(brand.mention) && !sender_domain.contains(brand.domain_token) {
                impersonation = true;
                score += 30;
                flags.push(format!("Impersonation: Mentions {}", brand.display));
            }
        }

        if metadata.attachment_count > 3 {
            score += 5;
            flags.push("Large number of attachments".to_string());
        }
        if metadata.url_count > 5 {
            score += 10;
            flags.push("Large number of links".to_string());
        }

        let mut short_body_with_links = false;
        if metadata.body_length < 80 && metadata.url_count >= 1 {
            short_body_with_links = true;
            score += 15;
            flags.push("Very short message containing links".to_string());
        }

        if !metadata.is_reply && !metadata.is_forward && metadata.recipient_count > 10 {
            score += 5;
            flags.push("Sent to many recipients".to_string());
        }
        if metadata.image_count > 5 {
            score += 5;
            flags.push("Image-heavy message".to_string());
        }

        // A short body stuffed with links is inherently suspicious even
        // without keyword hits.
        if short_body_with_links && score < 40 {
            score = 40;
        }

        let phishing_score = score.min(100);
        let social_engineering = if phishing_score >= 40 {
            SocialEngineeringTier::High
        } else if phishing_score >= 20 {
            SocialEngineeringTier::Moderate
        } else {
            SocialEngineeringTier::Low
        };

        ContentResult {
            phishing_score,
            social_engineering,
            impersonation,
            short_body_with_links,
            flags,
        }
    }
}
