use crate::dns::DohClient;
use crate::email;
use crate::reputation::{self, DomainInfo};
use serde::{Deserialize, Serialize};

/// Closed authentication status; `Error` means no usable domain existed,
/// `NotChecked` is reserved for mechanisms the engine cannot evaluate
/// (DKIM needs raw headers, which are not part of the input).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthStatus {
    Pass,
    Neutral,
    Fail,
    Error,
    NotChecked,
}

impl AuthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthStatus::Pass => "pass",
            AuthStatus::Neutral => "neutral",
            AuthStatus::Fail => "fail",
            AuthStatus::Error => "error",
            AuthStatus::NotChecked => "not_checked",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReputationTier {
    Good,
    Moderate,
    Poor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MxRecord {
    pub exchange: String,
    pub priority: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SenderResult {
    pub address: String,
    pub domain: String,
    pub spf: AuthStatus,
    pub dkim: AuthStatus,
    pub dmarc: AuthStatus,
    pub mx_records: Vec<MxRecord>,
    pub domain_info: DomainInfo,
    pub reputation: ReputationTier,
    pub risk_flags: Vec<String>,
}

impl SenderResult {
    /// Authentication points as consumed by the aggregator:
    /// 40 per failed mechanism plus 20 for a suspicious domain.
    pub fn auth_score(&self) -> u32 {
        let mut score = 0;
        if self.spf != AuthStatus::Pass {
            score += 40;
        }
        if self.dmarc != AuthStatus::Pass {
            score += 40;
        }
        if self.domain_info.suspicious {
            score += 20;
        }
        score
    }

    /// Placeholder result when sender analysis never ran (timeout path).
    pub fn unavailable(address: &str) -> Self {
        Self {
            address: address.to_string(),
            domain: "unknown".to_string(),
            spf: AuthStatus::NotChecked,
            dkim: AuthStatus::NotChecked,
            dmarc: AuthStatus::NotChecked,
            mx_records: Vec::new(),
            domain_info: DomainInfo::default(),
            reputation: ReputationTier::Moderate,
            risk_flags: vec!["Sender analysis incomplete".to_string()],
        }
    }
}

fn tier_for(auth_score: u32) -> ReputationTier {
    match auth_score {
        0..=20 => ReputationTier::Good,
        21..=60 => ReputationTier::Moderate,
        _ => ReputationTier::Poor,
    }
}

/// Resolves SPF/DMARC/MX over DNS-over-HTTPS and combines the outcome
/// with domain reputation heuristics.
#[derive(Debug, Clone)]
pub struct SenderAnalyzer {
    dns: DohClient,
}

impl SenderAnalyzer {
    pub fn new(dns: DohClient) -> Self {
        Self { dns }
    }

    pub async fn analyze(&self, address: &str) -> SenderResult {
        let Some(domain) = email::extract_domain(address) else {
            log::debug!("Sender address has no usable domain: {address}");
            let mut result = SenderResult {
                address: address.to_string(),
                domain: "unknown".to_string(),
                spf: AuthStatus::Error,
                dkim: AuthStatus::NotChecked,
                dmarc: AuthStatus::Error,
                mx_records: Vec::new(),
                domain_info: DomainInfo::default(),
                reputation: ReputationTier::Poor,
                risk_flags: vec!["Sender address has no valid domain".to_string()],
            };
            result.reputation = tier_for(result.auth_score());
            return result;
        };

        // The three lookups are independent; issue them concurrently.
        let (spf, dmarc, mx_records) = tokio::join!(
            self.check_spf(&domain),
            self.check_dmarc(&domain),
            self.mx_records(&domain),
        );

        let domain_info = reputation::domain_info(&domain);

        let mut risk_flags = Vec::new();
        match spf {
            AuthStatus::Fail => risk_flags.push("SPF verification failed".to_string()),
            AuthStatus::Neutral => {
                risk_flags.push("SPF policy does not enforce rejection".to_string())
            }
            _ => {}
        }
        match dmarc {
            AuthStatus::Fail => risk_flags.push("No DMARC policy published".to_string()),
            AuthStatus::Neutral => {
                risk_flags.push("DMARC policy does not enforce rejection".to_string())
            }
            _ => {}
        }
        if mx_records.is_empty() {
            risk_flags.push("No MX records found for sender domain".to_string());
        }
        if domain_info.blacklisted {
            risk_flags.push("Sender domain is blacklisted".to_string());
        }
        if domain_info.suspicious {
            risk_flags.extend(reputation::check_domain(&domain).reasons);
        }

        let mut result = SenderResult {
            address: address.to_string(),
            domain,
            spf,
            dkim: AuthStatus::NotChecked,
            dmarc,
            mx_records,
            domain_info,
            reputation: ReputationTier::Good,
            risk_flags,
        };
        result.reputation = tier_for(result.auth_score());
        result
    }

    /// SPF: find a TXT record with `v=spf1`; enforcing `~all`/`-all`
    /// qualifies as pass. Transport failure is fail-closed.
    pub async fn check_spf(&self, domain: &str) -> AuthStatus {
        match self.dns.txt_records(domain).await {
            Ok(records) => classify_spf(&records),
            Err(e) => {
                log::warn!("SPF lookup failed for {domain}: {e}");
                AuthStatus::Fail
            }
        }
    }

    /// DMARC: `v=DMARC1` TXT record at `_dmarc.<domain>`; a reject or
    /// quarantine policy qualifies as pass. Transport failure is fail-closed.
    pub async fn check_dmarc(&self, domain: &str) -> AuthStatus {
        let record_host = format!("_dmarc.{domain}");
        match self.dns.txt_records(&record_host).await {
            Ok(records) => classify_dmarc(&records),
            Err(e) => {
                log::warn!("DMARC lookup failed for {domain}: {e}");
                AuthStatus::Fail
            }
        }
    }

    /// MX records sorted ascending by priority; empty on failure.
    pub async fn mx_records(&self, domain: &str) -> Vec<MxRecord> {
        match self.dns.mx_records(domain).await {
            Ok(records) => {
                let mut records: Vec<MxRecord> = records
                    .into_iter()
                    .map(|(exchange, priority)| MxRecord { exchange, priority })
                    .collect();
                records.sort_by_key(|r| r.priority);
                records
            }
            Err(e) => {
                log::warn!("MX lookup failed for {domain}: {e}");
                Vec::new()
            }
        }
    }
}

/// Classify SPF from raw TXT records.
pub fn classify_spf(records: &[String]) -> AuthStatus {
    let Some(record) = records.iter().find(|r| r.contains("v=spf1")) else {
        return AuthStatus::Fail;
    };
    if record.contains("~all") || record.contains("-all") {
        AuthStatus::Pass
    } else {
        AuthStatus::Neutral
    }
}

/// Classify DMARC from raw `_dmarc` TXT records.
pub fn classify_dmarc(records: &[String]) -> AuthStatus {
    let Some(record) = records.iter().find(|r| r.contains("v=DMARC1")) else {
        return AuthStatus::Fail;
    };
    let policy = record
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("p="))
        .unwrap_or("none")
        .trim();
    match policy {
        "reject" | "quarantine" => AuthStatus::Pass,
        _ => AuthStatus::Neutral,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spf_enforcing_policy_passes() {
        let records = vec!["v=spf1 include:_spf.example.com -all".to_string()];
        assert_eq!(classify_spf(&records), AuthStatus::Pass);
        let records = vec!["v=spf1 ip4:192.0.2.0/24 ~all".to_string()];
        assert_eq!(classify_spf(&records), AuthStatus::Pass);
    }

    #[test]
    fn test_spf_permissive_policy_is_neutral() {
        let records = vec!["v=spf1 include:_spf.example.com ?all".to_string()];
        assert_eq!(classify_spf(&records), AuthStatus::Neutral);
    }

    #[test]
    fn test_spf_absent_fails() {
        assert_eq!(classify_spf(&[]), AuthStatus::Fail);
        let records = vec!["google-site-verification=abc".to_string()];
        assert_eq!(classify_spf(&records), AuthStatus::Fail);
    }

    #[test]
    fn test_dmarc_reject_and_quarantine_pass() {
        let records = vec!["v=DMARC1; p=reject; rua=mailto:d@example.com".to_string()];
        assert_eq!(classify_dmarc(&records), AuthStatus::Pass);
        let records = vec!["v=DMARC1; p=quarantine".to_string()];
        assert_eq!(classify_dmarc(&records), AuthStatus::Pass);
    }

    #[test]
    fn test_dmarc_none_policy_is_neutral() {
        let records = vec!["v=DMARC1; p=none".to_string()];
        assert_eq!(classify_dmarc(&records), AuthStatus::Neutral);
        // Missing p= tag defaults to none.
        let records = vec!["v=DMARC1; rua=mailto:d@example.com".to_string()];
        assert_eq!(classify_dmarc(&records), AuthStatus::Neutral);
    }

    #[test]
    fn test_dmarc_sp_tag_is_not_policy() {
        // sp= applies to subdomains and must not satisfy the p= extraction.
        let records = vec!["v=DMARC1; sp=reject".to_string()];
        assert_eq!(classify_dmarc(&records), AuthStatus::Neutral);
    }

    #[test]
    fn test_dmarc_absent_fails() {
        assert_eq!(classify_dmarc(&[]), AuthStatus::Fail);
    }

    #[test]
    fn test_auth_score() {
        let mut result = SenderResult::unavailable("a@b.com");
        result.spf = AuthStatus::Pass;
        result.dmarc = AuthStatus::Pass;
        assert_eq!(result.auth_score(), 0);
        result.dmarc = AuthStatus::Neutral;
        assert_eq!(result.auth_score(), 40);
        result.spf = AuthStatus::Fail;
        assert_eq!(result.auth_score(), 80);
        result.domain_info.suspicious = true;
        assert_eq!(result.auth_score(), 100);
    }

    #[test]
    fn test_tier_banding() {
        assert_eq!(tier_for(0), ReputationTier::Good);
        assert_eq!(tier_for(20), ReputationTier::Good);
        assert_eq!(tier_for(40), ReputationTier::Moderate);
        assert_eq!(tier_for(60), ReputationTier::Moderate);
        assert_eq!(tier_for(80), ReputationTier::Poor);
    }
}
