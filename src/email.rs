use serde::{Deserialize, Serialize};

/// Structured facts about one email, produced by the external parser.
/// Immutable input to the scoring engine; the engine never mutates it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmailFacts {
    pub sender: String,
    #[serde(default)]
    pub sender_name: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub urls: Vec<String>,
    #[serde(default)]
    pub attachments: Vec<AttachmentFacts>,
    #[serde(default)]
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentFacts {
    pub filename: String,
    /// Declared size as a display string, e.g. "1.2 MB". Not used for scoring.
    #[serde(default)]
    pub size: String,
    /// Lower-cased file extension without the leading dot.
    #[serde(default)]
    pub extension: String,
}

/// Booleans and counts derived from the rendered message by the parser.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub attachment_count: usize,
    #[serde(default)]
    pub url_count: usize,
    #[serde(default)]
    pub body_length: usize,
    #[serde(default)]
    pub subject_length: usize,
    #[serde(default)]
    pub has_sender_name: bool,
    #[serde(default)]
    pub sender_name_matches_domain: bool,
    #[serde(default)]
    pub has_html: bool,
    #[serde(default)]
    pub image_count: usize,
    #[serde(default)]
    pub recipient_count: usize,
    #[serde(default)]
    pub is_reply: bool,
    #[serde(default)]
    pub is_forward: bool,
    #[serde(default)]
    pub is_spam_folder: bool,
}

impl EmailFacts {
    /// Extract the domain part of the sender address.
    pub fn sender_domain(&self) -> Option<String> {
        extract_domain(&self.sender)
    }
}

/// Extract domain from an email address, tolerating display artifacts
/// like angle brackets left over from header parsing.
pub fn extract_domain(address: &str) -> Option<String> {
    let at_pos = address.rfind('@')?;
    if at_pos == 0 {
        return None;
    }
    let domain = address[at_pos + 1..]
        .trim_matches(|c| c == '>' || c == '<' || c == ' ')
        .to_lowercase();
    if domain.is_empty() || !domain.contains('.') {
        return None;
    }
    if domain
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        Some(domain)
    } else {
        None
    }
}
