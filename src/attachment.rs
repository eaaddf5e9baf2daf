use crate::email::AttachmentFacts;
use serde::{Deserialize, Serialize};

/// Extensions that are executable or scriptable on a victim machine.
const DANGEROUS_EXTENSIONS: &[&str] = &[
    "exe", "bat", "cmd", "scr", "vbs", "js", "jar", "msi", "ps1", "psm1", "com", "cpl", "reg",
    "hta", "lnk", "pif", "msc", "apk", "sh",
];

/// Common formats that can carry payloads and deserve caution.
const SUSPICIOUS_EXTENSIONS: &[&str] = &[
    "zip", "rar", "7z", "tar", "gz", "bz2", "iso", "img", "doc", "docx", "xls", "xlsx", "ppt",
    "pptx", "pdf", "rtf", "odt",
];

/// Macro-enabled Office formats.
const MACRO_EXTENSIONS: &[&str] = &["docm", "xlsm", "pptm"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentResult {
    pub filename: String,
    pub extension: String,
    pub dangerous: bool,
    /// Raw additive score; may exceed 100 when signals stack. Internal —
    /// only the dangerous flag feeds the email-level score.
    pub risk_score: u32,
    pub flags: Vec<String>,
}

impl AttachmentResult {
    /// Clamped score for anything caller-facing.
    pub fn display_score(&self) -> u32 {
        self.risk_score.min(100)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttachmentAnalysis {
    pub results: Vec<AttachmentResult>,
    pub dangerous_count: usize,
}

pub struct AttachmentClassifier;

impl AttachmentClassifier {
    /// Score one attachment from its filename and extension alone.
    pub fn classify(attachment: &AttachmentFacts) -> AttachmentResult {
        let extension = if attachment.extension.is_empty() {
            extension_of(&attachment.filename)
        } else {
            attachment.extension.to_lowercase()
        };

        let mut dangerous = false;
        let mut score: u32 = 0;
        let mut flags = Vec::new();

        if DANGEROUS_EXTENSIONS.contains(&extension.as_str()) {
            dangerous = true;
            score = 90;
            flags.push(format!("Dangerous file type: .{extension}"));
        } else if SUSPICIOUS_EXTENSIONS.contains(&extension.as_str()) {
            score = 30;
            flags.push(format!("File type .{extension} requires caution"));
        }

        if MACRO_EXTENSIONS.contains(&extension.as_str()) {
            dangerous = true;
            score = score.max(80);
            flags.push("Macro-enabled Office document".to_string());
        }

        if has_double_extension(&attachment.filename) {
            dangerous = true;
            score += 40;
            flags.push(format!("Double extension: {}", attachment.filename));
        }

        AttachmentResult {
            filename: attachment.filename.clone(),
            extension,
            dangerous,
            risk_score: score,
            flags,
        }
    }

    pub fn classify_all(attachments: &[AttachmentFacts]) -> AttachmentAnalysis {
        let results: Vec<AttachmentResult> =
            attachments.iter().map(Self::classify).collect();
        let dangerous_count = results.iter().filter(|r| r.dangerous).count();
        AttachmentAnalysis {
            results,
            dangerous_count,
        }
    }
}

fn extension_of(filename: &str) -> String {
    filename
        .rsplit('.')
        .next()
        .filter(|ext| *ext != filename)
        .unwrap_or("")
        .to_lowercase()
}

/// More than one `.`-delimited extension segment, e.g. `invoice.pdf.exe`.
fn has_double_extension(filename: &str) -> bool {
    filename.split('.').filter(|s| !s.is_empty()).count() > 2
}
