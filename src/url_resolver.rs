use std::time::Duration;
use url::Url;

/// Short-link services whose URLs are expanded before analysis.
pub const SHORT_LINK_PATTERNS: &[&str] =
    &["bit.ly", "tinyurl", "goo.gl", "ow.ly", "t.co", "short.link"];

const MAX_REDIRECT_HOPS: usize = 5;

/// Outcome of a best-effort expansion: the final URL plus every hop taken.
#[derive(Debug, Clone)]
pub struct Expansion {
    pub final_url: String,
    pub hops: Vec<String>,
}

/// Expands shortened URLs by following redirects with HEAD requests.
/// Expansion is strictly best-effort: any failure keeps the original URL.
#[derive(Debug, Clone)]
pub struct UrlResolver {
    client: reqwest::Client,
}

impl UrlResolver {
    pub fn new(timeout_seconds: u64, user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self { client })
    }

    /// Check whether a URL points at a known shortening service.
    pub fn is_short_link(url: &str) -> bool {
        let haystack = Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
            .unwrap_or_else(|| url.to_lowercase());
        SHORT_LINK_PATTERNS.iter().any(|p| haystack.contains(p))
    }

    /// Follow redirects from `url` up to the hop cap. Every failure mode
    /// (bad URL, transport error, missing Location) stops the walk and the
    /// last good URL is returned.
    pub async fn expand(&self, url: &str) -> Expansion {
        let mut current = url.to_string();
        let mut hops = Vec::new();

        for _ in 0..MAX_REDIRECT_HOPS {
            let response = match self.client.head(&current).send().await {
                Ok(response) => response,
                Err(e) => {
                    log::debug!("Short-link expansion stopped at {current}: {e}");
                    break;
                }
            };

            if !response.status().is_redirection() {
                break;
            }
            let Some(location) = response
                .headers()
                .get("location")
                .and_then(|v| v.to_str().ok())
            else {
                break;
            };

            // Relative Location values are resolved against the current URL.
            let next = if location.starts_with("http") {
                location.to_string()
            } else {
                match Url::parse(&current).and_then(|base| base.join(location)) {
                    Ok(joined) => joined.to_string(),
                    Err(e) => {
                        log::debug!("Bad redirect target from {current}: {e}");
                        break;
                    }
                }
            };

            hops.push(next.clone());
            current = next;
        }

        Expansion {
            final_url: current,
            hops,
        }
    }
}
