use serde::{Deserialize, Serialize};

/// TLDs with a poor abuse track record.
pub const RISKY_TLDS: &[&str] = &[
    "tk", "ml", "ga", "cf", "gq", "top", "xyz", "club", "work", "info", "click", "country",
];

/// Naming patterns common in lookalike phishing domains.
const NAMING_RISK_PATTERNS: &[&str] = &[
    "-secure", "-login", "-verify", "-account", "update-", "support-",
];

/// Major mail providers are never flagged suspicious on name heuristics alone.
const MAJOR_PROVIDERS: &[&str] = &[
    "gmail.com",
    "googlemail.com",
    "outlook.com",
    "hotmail.com",
    "live.com",
    "msn.com",
    "yahoo.com",
    "aol.com",
    "icloud.com",
    "me.com",
    "protonmail.com",
    "proton.me",
    "zoho.com",
    "gmx.com",
    "gmx.net",
    "mail.com",
    "yandex.com",
];

/// Seed blacklist; a deployment would extend this from threat intel.
const BLACKLISTED_DOMAINS: &[&str] = &[
    "account-verify-center.com",
    "secure-login-alert.net",
    "mail-support-update.info",
];

const MARKETING_WORDS: &[&str] = &[
    "deal", "offer", "promo", "sale", "discount", "bonus", "winner", "reward", "prize",
];

/// Country attribution by TLD. Generic TLDs map to "Global".
const TLD_COUNTRIES: &[(&str, &str)] = &[
    ("com", "Global"),
    ("net", "Global"),
    ("org", "Global"),
    ("info", "Global"),
    ("us", "United States"),
    ("uk", "United Kingdom"),
    ("de", "Germany"),
    ("fr", "France"),
    ("nl", "Netherlands"),
    ("es", "Spain"),
    ("it", "Italy"),
    ("pl", "Poland"),
    ("ru", "Russia"),
    ("cn", "China"),
    ("in", "India"),
    ("jp", "Japan"),
    ("kr", "South Korea"),
    ("br", "Brazil"),
    ("mx", "Mexico"),
    ("au", "Australia"),
    ("ca", "Canada"),
    ("ng", "Nigeria"),
    ("za", "South Africa"),
    ("tk", "Tokelau"),
    ("ml", "Mali"),
    ("ga", "Gabon"),
    ("cf", "Central African Republic"),
    ("gq", "Equatorial Guinea"),
];

/// Outcome of the pure pattern checks on a domain string.
#[derive(Debug, Clone, Default)]
pub struct DomainCheck {
    pub suspicious: bool,
    pub reasons: Vec<String>,
}

/// Per-domain reputation summary attached to sender analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainInfo {
    pub age_estimate: String,
    pub registrar: String,
    pub country: String,
    pub blacklisted: bool,
    pub suspicious: bool,
}

impl Default for DomainInfo {
    fn default() -> Self {
        Self {
            age_estimate: "unknown".to_string(),
            registrar: "unknown".to_string(),
            country: "Unknown".to_string(),
            blacklisted: false,
            suspicious: false,
        }
    }
}

pub fn tld_of(domain: &str) -> Option<&str> {
    domain.rsplit('.').next().filter(|t| !t.is_empty())
}

/// Check if a domain is one of the major providers, including subdomains
/// (mail.yahoo.com counts as yahoo.com).
pub fn is_major_provider(domain: &str) -> bool {
    let domain = domain.to_lowercase();
    MAJOR_PROVIDERS
        .iter()
        .any(|p| domain == *p || domain.ends_with(&format!(".{p}")))
}

/// Stateless pattern checks on a domain string. Reasons are reported in
/// fixed check order so callers and tests see a stable sequence.
pub fn check_domain(domain: &str) -> DomainCheck {
    let domain = domain.to_lowercase();
    let mut reasons = Vec::new();

    if let Some(tld) = tld_of(&domain) {
        if RISKY_TLDS.contains(&tld) {
            reasons.push(format!("High-risk TLD: .{tld}"));
        }
    }

    if domain.len() < 5 {
        reasons.push("Unusually short domain name".to_string());
    }

    if domain.split('.').count() > 4 {
        reasons.push("Excessive subdomain depth".to_string());
    }

    for pattern in NAMING_RISK_PATTERNS {
        if domain.contains(pattern) {
            reasons.push(format!("Suspicious naming pattern: {pattern}"));
        }
    }

    DomainCheck {
        suspicious: !reasons.is_empty(),
        reasons,
    }
}

/// Build the full reputation summary for a domain: pattern checks plus
/// age/branding estimation and TLD country attribution.
pub fn domain_info(domain: &str) -> DomainInfo {
    let domain = domain.to_lowercase();
    let blacklisted = BLACKLISTED_DOMAINS.contains(&domain.as_str());

    let name_part = domain.split('.').next().unwrap_or(&domain);
    let age_estimate = if name_part.chars().any(|c| c.is_ascii_digit())
        || ["temp", "test", "fake"].iter().any(|w| domain.contains(w))
    {
        "likely new"
    } else if MARKETING_WORDS.iter().any(|w| domain.contains(w)) {
        "aggressive branding"
    } else {
        "unknown"
    };

    let country = tld_of(&domain)
        .and_then(|tld| {
            TLD_COUNTRIES
                .iter()
                .find(|(t, _)| *t == tld)
                .map(|(_, c)| *c)
        })
        .unwrap_or("Unknown");

    let suspicious = if is_major_provider(&domain) {
        false
    } else {
        blacklisted || check_domain(&domain).suspicious
    };

    DomainInfo {
        age_estimate: age_estimate.to_string(),
        registrar: "unknown".to_string(),
        country: country.to_string(),
        blacklisted,
        suspicious,
    }
}
