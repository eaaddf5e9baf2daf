use crate::reputation;
use crate::url_resolver::UrlResolver;
use anyhow::Result;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

/// Only the first N URLs of a message are analyzed; later ones are
/// ignored, not flagged.
pub const MAX_ANALYZED_URLS: usize = 10;

/// Keywords that rarely appear in legitimate link targets.
const PHISHING_KEYWORDS: &[&str] = &[
    "login",
    "verify",
    "account",
    "secure",
    "banking",
    "paypal",
    "reset-password",
    "password-reset",
    "update-account",
    "secure-login",
    "giftcard",
    "crypto",
    "bitcoin",
    "wallet",
    "invoice",
    "payment-confirmation",
];

lazy_static! {
    static ref IP_HOST_RE: Regex = Regex::new(r"^\d{1,3}(\.\d{1,3}){3}$").unwrap();
    static ref ALPHA_TOKEN_RE: Regex = Regex::new(r"[A-Za-z]{30,}").unwrap();
    /// Static dangerous patterns: shortener hosts, IP-literal URLs and
    /// high-abuse TLDs, matched against the resolved URL string.
    static ref DANGEROUS_URL_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)(bit\.ly|tinyurl|goo\.gl|ow\.ly|t\.co(/|$)|short\.link)").unwrap(),
        Regex::new(r"https?://\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}").unwrap(),
        Regex::new(r"(?i)\.(tk|ml|ga|cf|gq|top|xyz|club|work|info|click|country)(/|$|\?|:)").unwrap(),
    ];
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlResult {
    pub original_url: String,
    pub resolved_url: String,
    /// Clamped to 100 for reporting; the dangerous flag is derived from
    /// the raw accumulated sum.
    pub risk_score: u32,
    pub dangerous: bool,
    pub flags: Vec<String>,
    pub redirect_chain: Option<String>,
}

impl UrlResult {
    /// Degraded result for a URL that could not be analyzed at all.
    fn unanalyzable(url: &str) -> Self {
        Self {
            original_url: url.to_string(),
            resolved_url: url.to_string(),
            risk_score: 0,
            dangerous: false,
            flags: vec!["Unable to analyze".to_string()],
            redirect_chain: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UrlAnalysis {
    pub results: Vec<UrlResult>,
    pub dangerous_count: usize,
    /// Resolved forms of the dangerous URLs, for marking links downstream.
    pub dangerous_urls: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct UrlAnalyzer {
    resolver: UrlResolver,
    expand_short_links: bool,
}

impl UrlAnalyzer {
    pub fn new(resolver: UrlResolver, expand_short_links: bool) -> Self {
        Self {
            resolver,
            expand_short_links,
        }
    }

    /// Analyze up to the first ten URLs concurrently, preserving input
    /// order in the results.
    pub async fn analyze_batch(&self, urls: &[String]) -> UrlAnalysis {
        if urls.len() > MAX_ANALYZED_URLS {
            log::debug!(
                "Message has {} URLs; analyzing the first {MAX_ANALYZED_URLS}",
                urls.len()
            );
        }

        let mut handles = Vec::new();
        for url in urls.iter().take(MAX_ANALYZED_URLS) {
            let analyzer = self.clone();
            let url = url.clone();
            handles.push(tokio::spawn(async move { analyzer.analyze_url(&url).await }));
        }

        let mut results = Vec::new();
        for (handle, url) in handles.into_iter().zip(urls.iter()) {
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) => {
                    log::warn!("URL analysis task failed for {url}: {e}");
                    results.push(UrlResult::unanalyzable(url));
                }
            }
        }

        let dangerous_urls: Vec<String> = results
            .iter()
            .filter(|r| r.dangerous)
            .map(|r| r.resolved_url.clone())
            .collect();
        UrlAnalysis {
            dangerous_count: dangerous_urls.len(),
            dangerous_urls,
            results,
        }
    }

    /// Full pipeline for one URL: optional short-link expansion, then the
    /// independent risk checks. A failure yields a zero-score result and
    /// never aborts the batch.
    pub async fn analyze_url(&self, url: &str) -> UrlResult {
        let (resolved, redirect_chain) =
            if self.expand_short_links && UrlResolver::is_short_link(url) {
                let expansion = self.resolver.expand(url).await;
                let chain = if expansion.hops.is_empty() {
                    None
                } else {
                    Some(format!("{} -> {}", url, expansion.hops.join(" -> ")))
                };
                (expansion.final_url, chain)
            } else {
                (url.to_string(), None)
            };

        match score_url(&resolved) {
            Ok((score, flags)) => UrlResult {
                original_url: url.to_string(),
                resolved_url: resolved,
                risk_score: score.min(100),
                dangerous: score >= 50,
                flags,
                redirect_chain,
            },
            Err(e) => {
                log::warn!("Unable to analyze URL {url}: {e}");
                UrlResult::unanalyzable(url)
            }
        }
    }
}

/// Run the independent checks over one resolved URL and accumulate the
/// raw risk sum. Pure except for the initial parse.
pub fn score_url(resolved: &str) -> Result<(u32, Vec<String>)> {
    let parsed = Url::parse(resolved)?;
    let mut score: u32 = 0;
    let mut flags = Vec::new();

    // Homoglyph check runs on the raw authority: the parser punycodes
    // non-ASCII hostnames before they are visible via host_str().
    if raw_host(resolved).chars().any(|c| !c.is_ascii()) {
        score += 40;
        flags.push("Non-ASCII characters in hostname (possible homoglyph attack)".to_string());
    }

    let structural = structural_flags(&parsed, resolved);
    if !structural.is_empty() {
        score += 30;
        flags.extend(structural);
    }

    if DANGEROUS_URL_PATTERNS.iter().any(|re| re.is_match(resolved)) {
        score += 50;
        flags.push("Matches known dangerous URL pattern".to_string());
    }

    if let Some(host) = parsed.host_str() {
        let check = reputation::check_domain(host);
        if check.suspicious {
            score += 20;
            flags.extend(check.reasons);
        }
    }

    Ok((score, flags))
}

/// Structural risk checks; every matched reason is reported.
pub fn structural_flags(parsed: &Url, raw: &str) -> Vec<String> {
    let mut flags = Vec::new();
    let host = parsed.host_str().unwrap_or("").to_lowercase();

    if IP_HOST_RE.is_match(&host) {
        flags.push("URL uses a raw IP address instead of a hostname".to_string());
    }
    if let Some(tld) = reputation::tld_of(&host) {
        if reputation::RISKY_TLDS.contains(&tld) {
            flags.push(format!("High-risk TLD in URL: .{tld}"));
        }
    }
    if host.split('.').any(|label| label.starts_with("xn--")) {
        flags.push("Punycode-encoded hostname".to_string());
    }
    if host.split('.').count() > 4 {
        flags.push("Excessive subdomain depth in URL".to_string());
    }

    let mut searchable = host.clone();
    searchable.push_str(&parsed.path().to_lowercase());
    if let Some(query) = parsed.query() {
        searchable.push('?');
        searchable.push_str(&query.to_lowercase());
    }
    for keyword in PHISHING_KEYWORDS {
        if searchable.contains(keyword) {
            flags.push(format!("Phishing keyword in URL: '{keyword}'"));
        }
    }

    let after_scheme = raw.split("://").nth(1).unwrap_or(raw);
    if after_scheme.contains('@') {
        flags.push("Embedded '@' in URL".to_string());
    }
    if parsed.scheme() != "https" {
        flags.push("Connection is not HTTPS".to_string());
    }

    let mut path_query = parsed.path().to_string();
    if let Some(query) = parsed.query() {
        path_query.push_str(query);
    }
    if path_query.len() > 80 && ALPHA_TOKEN_RE.is_match(&path_query) {
        flags.push("Long randomized path or query string".to_string());
    }

    flags
}

/// Authority host substring of a raw URL, with userinfo and port removed.
/// Used before parsing so non-ASCII characters are still visible.
fn raw_host(raw: &str) -> &str {
    let after_scheme = raw.split("://").nth(1).unwrap_or(raw);
    let end = after_scheme
        .find(['/', '?', '#'])
        .unwrap_or(after_scheme.len());
    let authority = &after_scheme[..end];
    let host = authority.rsplit('@').next().unwrap_or(authority);
    host.split(':').next().unwrap_or(host)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_url_scores_zero() {
        let (score, flags) = score_url("https://example.com/about").unwrap();
        assert_eq!(score, 0);
        assert!(flags.is_empty());
    }

    #[test]
    fn test_ip_literal_url_is_dangerous() {
        let (score, flags) = score_url("http://192.168.1.5/login").unwrap();
        // Structural (+30: IP literal, keyword, plain HTTP) plus the
        // static IP-literal pattern (+50).
        assert_eq!(score, 80);
        assert!(flags
            .iter()
            .any(|f| f.contains("raw IP address")));
        assert!(flags.iter().any(|f| f.contains("not HTTPS")));
        assert!(flags
            .iter()
            .any(|f| f == "Phishing keyword in URL: 'login'"));
    }

    #[test]
    fn test_homoglyph_hostname_detected() {
        // Cyrillic "а" in place of Latin "a".
        let (score, flags) = score_url("https://p\u{0430}ypal.com/signin").unwrap();
        assert!(flags
            .iter()
            .any(|f| f.contains("Non-ASCII characters in hostname")));
        // Homoglyph (+40) plus structural punycode flag (+30): the parser
        // converts the host to xn-- form.
        assert_eq!(score, 70);
        assert!(score >= 50);
    }

    #[test]
    fn test_shortener_matches_static_pattern() {
        let (score, flags) = score_url("https://bit.ly/3xYz").unwrap();
        assert_eq!(score, 50);
        assert!(flags
            .iter()
            .any(|f| f == "Matches known dangerous URL pattern"));
    }

    #[test]
    fn test_keyword_and_reputation_stack() {
        let (score, flags) = score_url("https://example-login.com/verify-account").unwrap();
        // Structural (+30, keyword hits) plus domain reputation (+20 for
        // the "-login" naming pattern).
        assert_eq!(score, 50);
        assert!(flags.iter().any(|f| f.contains("'verify'")));
        assert!(flags
            .iter()
            .any(|f| f == "Suspicious naming pattern: -login"));
    }

    #[test]
    fn test_risky_tld_url() {
        let (score, flags) = score_url("https://win-big.xyz/promo").unwrap();
        // Structural (+30 TLD), static TLD pattern (+50), reputation (+20).
        assert_eq!(score, 100);
        assert!(flags.iter().any(|f| f == "High-risk TLD in URL: .xyz"));
    }

    #[test]
    fn test_embedded_at_sign_flagged() {
        let (score, flags) = score_url("https://paypal.com@evil.example/x").unwrap();
        assert!(flags.iter().any(|f| f == "Embedded '@' in URL"));
        assert_eq!(score, 30);
    }

    #[test]
    fn test_long_random_path_flagged() {
        let token = "a".repeat(35);
        let url = format!("https://example.com/{token}/{}", "b".repeat(50));
        let (score, flags) = score_url(&url).unwrap();
        assert!(flags
            .iter()
            .any(|f| f == "Long randomized path or query string"));
        assert_eq!(score, 30);
    }

    #[test]
    fn test_short_path_with_long_token_not_flagged() {
        let url = format!("https://example.com/{}", "a".repeat(35));
        let (_, flags) = score_url(&url).unwrap();
        assert!(!flags
            .iter()
            .any(|f| f == "Long randomized path or query string"));
    }

    #[tokio::test]
    async fn test_unparseable_url_degrades_gracefully() {
        let resolver = UrlResolver::new(5, "mailrisk-test").unwrap();
        let analyzer = UrlAnalyzer::new(resolver, false);
        let result = analyzer.analyze_url("not a url at all").await;
        assert_eq!(result.risk_score, 0);
        assert!(!result.dangerous);
        assert_eq!(result.flags, vec!["Unable to analyze"]);
    }

    #[tokio::test]
    async fn test_batch_caps_at_ten_and_keeps_order() {
        let resolver = UrlResolver::new(5, "mailrisk-test").unwrap();
        let analyzer = UrlAnalyzer::new(resolver, false);
        let urls: Vec<String> = (0..12)
            .map(|i| format!("https://example{i}.com/page"))
            .collect();
        let analysis = analyzer.analyze_batch(&urls).await;
        assert_eq!(analysis.results.len(), MAX_ANALYZED_URLS);
        for (i, result) in analysis.results.iter().enumerate() {
            assert_eq!(result.original_url, format!("https://example{i}.com/page"));
        }
        assert_eq!(analysis.dangerous_count, 0);
    }

    #[tokio::test]
    async fn test_batch_counts_dangerous_urls() {
        let resolver = UrlResolver::new(5, "mailrisk-test").unwrap();
        let analyzer = UrlAnalyzer::new(resolver, false);
        let urls = vec![
            "https://example.com/newsletter".to_string(),
            "http://203.0.113.9/secure-login".to_string(),
        ];
        let analysis = analyzer.analyze_batch(&urls).await;
        assert_eq!(analysis.dangerous_count, 1);
        assert_eq!(analysis.dangerous_urls, vec!["http://203.0.113.9/secure-login"]);
    }
}
