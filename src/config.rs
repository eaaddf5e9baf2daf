use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Engine configuration, loaded from YAML. Every field has a default so a
/// partial file works.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// DNS-over-HTTPS endpoint answering dns-json queries.
    #[serde(default = "default_doh_endpoint")]
    pub doh_endpoint: String,
    /// Per-request timeout for DNS and redirect-expansion HTTP calls.
    #[serde(default = "default_http_timeout")]
    pub http_timeout_seconds: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Upper bound on one whole-email analysis before the engine degrades
    /// to an "analysis incomplete" verdict.
    #[serde(default = "default_analysis_timeout")]
    pub analysis_timeout_seconds: u64,
    /// Whether shortened URLs are expanded before analysis.
    #[serde(default = "default_true")]
    pub expand_short_links: bool,
}

fn default_doh_endpoint() -> String {
    "https://cloudflare-dns.com/dns-query".to_string()
}

fn default_http_timeout() -> u64 {
    10
}

fn default_user_agent() -> String {
    format!("mailrisk/{}", env!("CARGO_PKG_VERSION"))
}

fn default_analysis_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            doh_endpoint: default_doh_endpoint(),
            http_timeout_seconds: default_http_timeout(),
            user_agent: default_user_agent(),
            analysis_timeout_seconds: default_analysis_timeout(),
            expand_short_links: default_true(),
        }
    }
}

impl EngineConfig {
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: EngineConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        Ok(config)
    }

    pub fn generate_default(path: &str) -> Result<()> {
        let config = EngineConfig::default();
        let yaml = serde_yaml::to_string(&config)?;
        std::fs::write(path, yaml)
            .with_context(|| format!("Failed to write config file: {path}"))?;
        Ok(())
    }
}
