use crate::attachment::{AttachmentAnalysis, AttachmentClassifier};
use crate::cache::{AnalysisCache, CacheKind};
use crate::config::EngineConfig;
use crate::content::{ContentAnalyzer, ContentResult, SocialEngineeringTier};
use crate::dns::DohClient;
use crate::email::EmailFacts;
use crate::sender::{SenderAnalyzer, SenderResult};
use crate::url_analyzer::{UrlAnalysis, UrlAnalyzer};
use crate::url_resolver::UrlResolver;
use crate::verdict::{self, ThreatVerdict};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Complete analysis of one email: the verdict plus every analyzer
/// sub-result, ready for serialization to a display layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailAnalysis {
    pub verdict: ThreatVerdict,
    pub sender: SenderResult,
    pub content: ContentResult,
    pub urls: UrlAnalysis,
    pub attachments: AttachmentAnalysis,
}

/// Top-level engine. Owns the network clients and the analysis cache;
/// every `analyze` call receives immutable facts and returns a freshly
/// built result, so concurrent calls need no locking.
#[derive(Debug, Clone)]
pub struct ThreatEngine {
    config: EngineConfig,
    sender_analyzer: SenderAnalyzer,
    url_analyzer: UrlAnalyzer,
    cache: AnalysisCache,
}

impl ThreatEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        let dns = DohClient::new(
            &config.doh_endpoint,
            config.http_timeout_seconds,
            &config.user_agent,
        )?;
        let resolver = UrlResolver::new(config.http_timeout_seconds, &config.user_agent)?;
        Ok(Self {
            sender_analyzer: SenderAnalyzer::new(dns),
            url_analyzer: UrlAnalyzer::new(resolver, config.expand_short_links),
            cache: AnalysisCache::new(),
            config,
        })
    }

    /// Analyze one email. Never fails: timeouts and internal errors
    /// degrade to a mid-band SUSPICIOUS verdict with default sub-results.
    pub async fn analyze(&self, facts: &EmailFacts) -> EmailAnalysis {
        let engine = self.clone();
        let task_facts = facts.clone();
        let task = tokio::spawn(async move { engine.run_analysis(&task_facts).await });

        let timeout = Duration::from_secs(self.config.analysis_timeout_seconds);
        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(analysis)) => analysis,
            Ok(Err(e)) => {
                log::error!("Analysis task failed: {e}");
                Self::incomplete(facts, format!("Analysis failed unexpectedly: {e}"))
            }
            Err(_) => {
                log::warn!(
                    "Analysis exceeded {}s timeout; returning degraded verdict",
                    self.config.analysis_timeout_seconds
                );
                Self::incomplete(facts, "Analysis timed out before completion".to_string())
            }
        }
    }

    async fn run_analysis(&self, facts: &EmailFacts) -> EmailAnalysis {
        self.cache.prune().await;

        // The four analyzers have no data dependency on one another.
        // Sender and URL analysis do network I/O; content and attachment
        // classification are pure and complete immediately.
        let (sender, urls, content, attachments) = tokio::join!(
            self.sender_result(facts),
            self.url_analyzer.analyze_batch(&facts.urls),
            async { ContentAnalyzer::analyze(facts) },
            async { AttachmentClassifier::classify_all(&facts.attachments) },
        );

        let verdict = verdict::aggregate(&sender, &content, &urls, &attachments, &facts.metadata);

        EmailAnalysis {
            verdict,
            sender,
            content,
            urls,
            attachments,
        }
    }

    /// Sender analysis with a per-domain cache in front of the DNS work.
    async fn sender_result(&self, facts: &EmailFacts) -> SenderResult {
        let Some(domain) = facts.sender_domain() else {
            return self.sender_analyzer.analyze(&facts.sender).await;
        };

        if let Some(mut cached) = self
            .cache
            .get::<SenderResult>(CacheKind::Domain, &domain)
            .await
        {
            cached.address = facts.sender.clone();
            return cached;
        }

        let result = self.sender_analyzer.analyze(&facts.sender).await;
        self.cache.put(CacheKind::Domain, &domain, &result).await;
        result
    }

    /// Degraded analysis when the real one timed out or died: partial
    /// results are discarded, not merged.
    fn incomplete(facts: &EmailFacts, reason: String) -> EmailAnalysis {
        EmailAnalysis {
            verdict: ThreatVerdict::degraded(reason),
            sender: SenderResult::unavailable(&facts.sender),
            content: ContentResult {
                phishing_score: 0,
                social_engineering: SocialEngineeringTier::Low,
                impersonation: false,
                short_body_with_links: false,
                flags: Vec::new(),
            },
            urls: UrlAnalysis::default(),
            attachments: AttachmentAnalysis::default(),
        }
    }
}
