use crate::attachment::AttachmentAnalysis;
use crate::content::{ContentResult, SocialEngineeringTier};
use crate::email::Metadata;
use crate::sender::{AuthStatus, SenderResult};
use crate::url_analyzer::UrlAnalysis;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ThreatLevel {
    Safe,
    Suspicious,
    Dangerous,
}

impl ThreatLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThreatLevel::Safe => "SAFE",
            ThreatLevel::Suspicious => "SUSPICIOUS",
            ThreatLevel::Dangerous => "DANGEROUS",
        }
    }

    /// Band containing a clamped 0-100 score.
    pub fn for_score(score: u32) -> Self {
        match score {
            0..=30 => ThreatLevel::Safe,
            31..=60 => ThreatLevel::Suspicious,
            _ => ThreatLevel::Dangerous,
        }
    }
}

const RECOMMENDATION_SAFE: &str =
    "No significant threats detected. Standard caution applies.";
const RECOMMENDATION_SUSPICIOUS: &str =
    "Exercise caution: verify the sender through another channel before clicking links or opening attachments.";
const RECOMMENDATION_DANGEROUS: &str =
    "Do not click links, open attachments, or reply. Delete or report this message.";
const RECOMMENDATION_INCOMPLETE: &str =
    "Analysis incomplete - exercise caution with this message.";

fn recommendation_for(level: ThreatLevel) -> &'static str {
    match level {
        ThreatLevel::Safe => RECOMMENDATION_SAFE,
        ThreatLevel::Suspicious => RECOMMENDATION_SUSPICIOUS,
        ThreatLevel::Dangerous => RECOMMENDATION_DANGEROUS,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreatVerdict {
    pub score: u32,
    pub level: ThreatLevel,
    pub recommendation: String,
    pub reasons: Vec<String>,
}

impl ThreatVerdict {
    /// Fallback verdict for a degraded or failed analysis: never an error
    /// state, always a usable mid-band warning.
    pub fn degraded(reason: impl Into<String>) -> Self {
        Self {
            score: 50,
            level: ThreatLevel::Suspicious,
            recommendation: RECOMMENDATION_INCOMPLETE.to_string(),
            reasons: vec![reason.into()],
        }
    }
}

/// Combine the four analyzer outputs plus metadata into the final verdict.
/// Pure and deterministic; no I/O.
pub fn aggregate(
    sender: &SenderResult,
    content: &ContentResult,
    urls: &UrlAnalysis,
    attachments: &AttachmentAnalysis,
    metadata: &Metadata,
) -> ThreatVerdict {
    let sender_score = sender.auth_score();
    let content_score = content.phishing_score.min(100);
    let url_score: u32 = if urls.dangerous_count > 0 { 80 } else { 0 };
    let attachment_score: u32 = if attachments.dangerous_count > 0 { 90 } else { 0 };

    let mut combined_score: u32 = 0;
    if content.impersonation && sender_score > 30 {
        combined_score = 50;
    }
    if urls.dangerous_count > 0 {
        combined_score += 40;
        if content.short_body_with_links {
            combined_score += 20;
        }
        if metadata.is_spam_folder {
            combined_score += 20;
        }
    }

    let weighted = sender_score as f64 * 0.2
        + content_score as f64 * 0.5
        + url_score as f64 * 0.4
        + attachment_score as f64 * 0.4
        + combined_score as f64 * 0.2;
    let mut total = weighted.round() as i64;

    // Override floors, applied in fixed order; each only raises.
    match content.social_engineering {
        SocialEngineeringTier::High => total = total.max(45),
        SocialEngineeringTier::Moderate => total = total.max(30),
        SocialEngineeringTier::Low => {}
    }
    if content.impersonation {
        total = total.max(60);
    }
    if metadata.is_spam_folder {
        total = total.max(40);
    }
    if urls.dangerous_count > 0 && (content.short_body_with_links || metadata.is_spam_folder) {
        total = total.max(75);
    }

    let score = total.clamp(0, 100) as u32;
    let level = ThreatLevel::for_score(score);

    let reasons = collect_reasons(sender, content, urls, attachments, metadata);

    log::debug!(
        "aggregate: sender={sender_score} content={content_score} url={url_score} \
         attachment={attachment_score} combined={combined_score} -> {score} ({})",
        level.as_str()
    );

    ThreatVerdict {
        score,
        level,
        recommendation: recommendation_for(level).to_string(),
        reasons,
    }
}

/// Reasons in fixed priority order, truncated to the first five.
fn collect_reasons(
    sender: &SenderResult,
    content: &ContentResult,
    urls: &UrlAnalysis,
    attachments: &AttachmentAnalysis,
    metadata: &Metadata,
) -> Vec<String> {
    let mut reasons = Vec::new();

    if sender.spf != AuthStatus::Pass || sender.dmarc != AuthStatus::Pass {
        reasons.push(format!(
            "Sender authentication weak (SPF: {}, DMARC: {})",
            sender.spf.as_str(),
            sender.dmarc.as_str()
        ));
    }
    if content.phishing_score >= 20 {
        reasons.push(format!(
            "Phishing patterns in message content (score {})",
            content.phishing_score
        ));
    }
    if urls.dangerous_count > 0 {
        reasons.push(format!(
            "{} dangerous URL(s) detected",
            urls.dangerous_count
        ));
    }
    if attachments.dangerous_count > 0 {
        reasons.push(format!(
            "{} dangerous attachment(s) detected",
            attachments.dangerous_count
        ));
    }
    if content.impersonation {
        reasons.push("Possible brand impersonation".to_string());
    }
    if content.short_body_with_links {
        reasons.push("Very short message consisting mostly of links".to_string());
    }
    if metadata.is_spam_folder {
        reasons.push("Message was delivered to the spam folder".to_string());
    }

    reasons.truncate(5);
    reasons
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sender::ReputationTier;
    use crate::url_analyzer::UrlResult;

    fn sender(spf: AuthStatus, dmarc: AuthStatus, suspicious: bool) -> SenderResult {
        let mut result = SenderResult::unavailable("test@example.com");
        result.domain = "example.com".to_string();
        result.spf = spf;
        result.dmarc = dmarc;
        result.domain_info.suspicious = suspicious;
        result.reputation = ReputationTier::Good;
        result.risk_flags.clear();
        result
    }

    fn content(score: u32, impersonation: bool, short_body: bool) -> ContentResult {
        let social_engineering = if score >= 40 {
            SocialEngineeringTier::High
        } else if score >= 20 {
            SocialEngineeringTier::Moderate
        } else {
            SocialEngineeringTier::Low
        };
        ContentResult {
            phishing_score: score,
            social_engineering,
            impersonation,
            short_body_with_links: short_body,
            flags: Vec::new(),
        }
    }

    fn urls(dangerous_count: usize) -> UrlAnalysis {
        let results: Vec<UrlResult> = (0..dangerous_count)
            .map(|i| UrlResult {
                original_url: format!("http://bad{i}.example"),
                resolved_url: format!("http://bad{i}.example"),
                risk_score: 80,
                dangerous: true,
                flags: Vec::new(),
                redirect_chain: None,
            })
            .collect();
        let dangerous_urls = results.iter().map(|r| r.resolved_url.clone()).collect();
        UrlAnalysis {
            results,
            dangerous_count,
            dangerous_urls,
        }
    }

    fn attachments(dangerous_count: usize) -> AttachmentAnalysis {
        AttachmentAnalysis {
            results: Vec::new(),
            dangerous_count,
        }
    }

    #[test]
    fn test_benign_email_is_safe_with_no_reasons() {
        let verdict = aggregate(
            &sender(AuthStatus::Pass, AuthStatus::Pass, false),
            &content(0, false, false),
            &urls(0),
            &attachments(0),
            &Metadata::default(),
        );
        assert_eq!(verdict.score, 0);
        assert_eq!(verdict.level, ThreatLevel::Safe);
        assert!(verdict.reasons.is_empty());
        assert_eq!(verdict.recommendation, RECOMMENDATION_SAFE);
    }

    #[test]
    fn test_failed_auth_alone_stays_safe() {
        // senderScore=80, weighted sum round(80*0.2)=16, no floors trigger.
        let verdict = aggregate(
            &sender(AuthStatus::Fail, AuthStatus::Fail, false),
            &content(0, false, false),
            &urls(0),
            &attachments(0),
            &Metadata::default(),
        );
        assert_eq!(verdict.score, 16);
        assert_eq!(verdict.level, ThreatLevel::Safe);
        assert_eq!(verdict.reasons.len(), 1);
        assert!(verdict.reasons[0].starts_with("Sender authentication weak"));
    }

    #[test]
    fn test_short_body_with_dangerous_url_floors_to_75() {
        // Content floor has already raised the phishing score to 40 (High).
        let verdict = aggregate(
            &sender(AuthStatus::Pass, AuthStatus::Pass, false),
            &content(40, false, true),
            &urls(1),
            &attachments(0),
            &Metadata::default(),
        );
        // weighted: 40*0.5 + 80*0.4 + (40+20)*0.2 = 20+32+12 = 64, floored to 75.
        assert_eq!(verdict.score, 75);
        assert_eq!(verdict.level, ThreatLevel::Dangerous);
    }

    #[test]
    fn test_dangerous_attachment_contribution() {
        // attachmentScore=90 contributes 90*0.4=36 to the weighted sum.
        let verdict = aggregate(
            &sender(AuthStatus::Pass, AuthStatus::Pass, false),
            &content(0, false, false),
            &urls(0),
            &attachments(1),
            &Metadata::default(),
        );
        assert_eq!(verdict.score, 36);
        assert_eq!(verdict.level, ThreatLevel::Suspicious);
    }

    #[test]
    fn test_impersonation_floor() {
        let verdict = aggregate(
            &sender(AuthStatus::Pass, AuthStatus::Pass, false),
            &content(30, true, false),
            &urls(0),
            &attachments(0),
            &Metadata::default(),
        );
        // weighted 30*0.5=15, moderate floor 30, impersonation floor 60.
        assert_eq!(verdict.score, 60);
        assert_eq!(verdict.level, ThreatLevel::Suspicious);
    }

    #[test]
    fn test_impersonation_with_weak_sender_combined_score() {
        let verdict = aggregate(
            &sender(AuthStatus::Fail, AuthStatus::Fail, false),
            &content(30, true, false),
            &urls(0),
            &attachments(0),
            &Metadata::default(),
        );
        // senderScore 80 > 30 so combined=50:
        // round(80*0.2 + 30*0.5 + 50*0.2) = round(16+15+10) = 41 -> floor 60.
        assert_eq!(verdict.score, 60);
    }

    #[test]
    fn test_spam_folder_floor() {
        let metadata = Metadata {
            is_spam_folder: true,
            ..Metadata::default()
        };
        let verdict = aggregate(
            &sender(AuthStatus::Pass, AuthStatus::Pass, false),
            &content(0, false, false),
            &urls(0),
            &attachments(0),
            &metadata,
        );
        assert_eq!(verdict.score, 40);
        assert_eq!(verdict.level, ThreatLevel::Suspicious);
    }

    #[test]
    fn test_spam_folder_with_dangerous_url_supersedes_spam_floor() {
        let metadata = Metadata {
            is_spam_folder: true,
            ..Metadata::default()
        };
        let verdict = aggregate(
            &sender(AuthStatus::Pass, AuthStatus::Pass, false),
            &content(0, false, false),
            &urls(1),
            &attachments(0),
            &metadata,
        );
        assert!(verdict.score >= 75);
        assert_eq!(verdict.level, ThreatLevel::Dangerous);
    }

    #[test]
    fn test_level_matches_band_for_all_scores() {
        assert_eq!(ThreatLevel::for_score(0), ThreatLevel::Safe);
        assert_eq!(ThreatLevel::for_score(30), ThreatLevel::Safe);
        assert_eq!(ThreatLevel::for_score(31), ThreatLevel::Suspicious);
        assert_eq!(ThreatLevel::for_score(60), ThreatLevel::Suspicious);
        assert_eq!(ThreatLevel::for_score(61), ThreatLevel::Dangerous);
        assert_eq!(ThreatLevel::for_score(100), ThreatLevel::Dangerous);
    }

    #[test]
    fn test_reason_priority_order_and_cap() {
        let metadata = Metadata {
            is_spam_folder: true,
            ..Metadata::default()
        };
        let verdict = aggregate(
            &sender(AuthStatus::Fail, AuthStatus::Fail, true),
            &content(80, true, true),
            &urls(2),
            &attachments(1),
            &metadata,
        );
        assert_eq!(verdict.reasons.len(), 5);
        assert!(verdict.reasons[0].starts_with("Sender authentication weak"));
        assert!(verdict.reasons[1].starts_with("Phishing patterns"));
        assert_eq!(verdict.reasons[2], "2 dangerous URL(s) detected");
        assert_eq!(verdict.reasons[3], "1 dangerous attachment(s) detected");
        assert_eq!(verdict.reasons[4], "Possible brand impersonation");
    }

    #[test]
    fn test_floor_monotonicity_on_spam_flag() {
        let base = aggregate(
            &sender(AuthStatus::Fail, AuthStatus::Neutral, false),
            &content(25, false, false),
            &urls(1),
            &attachments(0),
            &Metadata::default(),
        );
        let flipped = aggregate(
            &sender(AuthStatus::Fail, AuthStatus::Neutral, false),
            &content(25, false, false),
            &urls(1),
            &attachments(0),
            &Metadata {
                is_spam_folder: true,
                ..Metadata::default()
            },
        );
        assert!(flipped.score >= base.score);
    }

    #[test]
    fn test_floor_monotonicity_on_added_dangerous_url() {
        let base = aggregate(
            &sender(AuthStatus::Fail, AuthStatus::Fail, true),
            &content(35, false, false),
            &urls(0),
            &attachments(0),
            &Metadata::default(),
        );
        let with_url = aggregate(
            &sender(AuthStatus::Fail, AuthStatus::Fail, true),
            &content(35, false, false),
            &urls(1),
            &attachments(0),
            &Metadata::default(),
        );
        assert!(with_url.score >= base.score);
    }

    #[test]
    fn test_degraded_verdict_shape() {
        let verdict = ThreatVerdict::degraded("Analysis timed out before completion");
        assert_eq!(verdict.score, 50);
        assert_eq!(verdict.level, ThreatLevel::Suspicious);
        assert_eq!(verdict.reasons.len(), 1);
        assert!(verdict.recommendation.contains("exercise caution"));
    }

    #[test]
    fn test_score_never_exceeds_100() {
        let metadata = Metadata {
            is_spam_folder: true,
            ..Metadata::default()
        };
        let verdict = aggregate(
            &sender(AuthStatus::Fail, AuthStatus::Fail, true),
            &content(100, true, true),
            &urls(5),
            &attachments(3),
            &metadata,
        );
        assert_eq!(verdict.score, 100);
        assert_eq!(verdict.level, ThreatLevel::Dangerous);
    }
}
