use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;

/// One record from the dns-json `Answer` array.
#[derive(Debug, Clone, Deserialize)]
pub struct DnsAnswer {
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub priority: Option<u16>,
}

#[derive(Debug, Deserialize)]
struct DnsResponse {
    #[serde(rename = "Answer", default)]
    answer: Vec<DnsAnswer>,
}

/// DNS-over-HTTPS client speaking the dns-json wire format.
///
/// A non-2xx response or a missing `Answer` array means "no records";
/// transport failures surface as errors so callers can fail closed.
#[derive(Debug, Clone)]
pub struct DohClient {
    client: reqwest::Client,
    endpoint: String,
}

impl DohClient {
    pub fn new(endpoint: &str, timeout_seconds: u64, user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    /// Raw lookup returning the `Answer` records for one name/type pair.
    pub async fn lookup(&self, name: &str, record_type: &str) -> Result<Vec<DnsAnswer>> {
        log::debug!("DoH lookup {record_type} {name} via {}", self.endpoint);
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("name", name), ("type", record_type)])
            .header("Accept", "application/dns-json")
            .send()
            .await?;

        if !response.status().is_success() {
            log::debug!(
                "DoH returned status {} for {record_type} {name}; treating as no records",
                response.status()
            );
            return Ok(Vec::new());
        }

        let parsed: DnsResponse = response.json().await?;
        Ok(parsed.answer)
    }

    /// TXT records with quoting and backslash escapes stripped.
    pub async fn txt_records(&self, domain: &str) -> Result<Vec<String>> {
        let answers = self.lookup(domain, "TXT").await?;
        Ok(answers
            .iter()
            .map(|a| unescape_txt(a.data.trim_matches('"')))
            .collect())
    }

    /// MX records as (exchange, priority) pairs, unsorted.
    pub async fn mx_records(&self, domain: &str) -> Result<Vec<(String, u16)>> {
        let answers = self.lookup(domain, "MX").await?;
        Ok(answers.iter().filter_map(parse_mx_answer).collect())
    }
}

/// Parse one MX answer. dns-json encodes the preference inside `data`
/// ("10 mail.example.com."); some resolvers also expose a `priority` field.
fn parse_mx_answer(answer: &DnsAnswer) -> Option<(String, u16)> {
    let data = answer.data.trim();
    if data.is_empty() {
        return None;
    }
    let mut parts = data.split_whitespace();
    let first = parts.next()?;
    if let Ok(preference) = first.parse::<u16>() {
        let exchange = parts.next()?.trim_end_matches('.').to_string();
        if exchange.is_empty() {
            return None;
        }
        return Some((exchange, answer.priority.unwrap_or(preference)));
    }
    // Bare exchange in data; priority must come from the dedicated field.
    Some((
        data.trim_end_matches('.').to_string(),
        answer.priority.unwrap_or(0),
    ))
}

/// DNS TXT records use backslash escaping: \X -> X for any char X.
fn unescape_txt(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                result.push(next);
            }
        } else {
            result.push(c);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unescape_txt() {
        assert_eq!(unescape_txt(r"v=spf1 \-all"), "v=spf1 -all");
        assert_eq!(unescape_txt(r"a\\b"), r"a\b");
        assert_eq!(unescape_txt("plain"), "plain");
    }

    #[test]
    fn test_parse_mx_with_inline_preference() {
        let answer = DnsAnswer {
            data: "10 aspmx.l.google.com.".to_string(),
            priority: None,
        };
        assert_eq!(
            parse_mx_answer(&answer),
            Some(("aspmx.l.google.com".to_string(), 10))
        );
    }

    #[test]
    fn test_parse_mx_with_priority_field() {
        let answer = DnsAnswer {
            data: "mail.example.com.".to_string(),
            priority: Some(20),
        };
        assert_eq!(
            parse_mx_answer(&answer),
            Some(("mail.example.com".to_string(), 20))
        );
    }

    #[test]
    fn test_parse_mx_rejects_empty() {
        let answer = DnsAnswer {
            data: "".to_string(),
            priority: None,
        };
        assert_eq!(parse_mx_answer(&answer), None);
    }

    #[test]
    fn test_answer_array_optional() {
        let parsed: DnsResponse = serde_json::from_str(r#"{"Status": 3}"#).unwrap();
        assert!(parsed.answer.is_empty());
    }
}
