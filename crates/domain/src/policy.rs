//! Format constraints for drafted reports

use crate::model::DraftReport;

/// Limits a drafted report is expected to respect
#[derive(Debug, Clone)]
pub struct DraftPolicy {
    /// Maximum characters for the whole report
    pub max_chars: usize,
    /// Maximum hashtags in the report
    pub max_hashtags: usize,
}

impl Default for DraftPolicy {
    fn default() -> Self {
        Self {
            max_chars: 4000,
            max_hashtags: 3,
        }
    }
}

impl DraftPolicy {
    pub fn new(max_chars: usize, max_hashtags: usize) -> Self {
        Self {
            max_chars,
            max_hashtags,
        }
    }

    /// List every limit the report exceeds
    pub fn check(&self, report: &DraftReport) -> Vec<DraftViolation> {
        let mut violations = Vec::new();

        let len = report.char_count();
        if len > self.max_chars {
            violations.push(DraftViolation::TooLong {
                len,
                max: self.max_chars,
            });
        }

        let count = report.hashtag_count();
        if count > self.max_hashtags {
            violations.push(DraftViolation::TooManyHashtags {
                count,
                max: self.max_hashtags,
            });
        }

        violations
    }
}

/// A limit a drafted report exceeds
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DraftViolation {
    #[error("Report too long: {len} > {max} chars")]
    TooLong { len: usize, max: usize },
    #[error("Too many hashtags: {count} > {max}")]
    TooManyHashtags { count: usize, max: usize },
}

/// Closing quotes and brackets that still belong to the sentence before them
const SENTENCE_CLOSERS: &[char] = &['"', '\'', '”', '’', ')', ']'];

/// Cut `text` to at most `max_chars` characters, ending on a complete sentence.
///
/// A sentence ends at `.`, `!` or `?`, optionally followed by closing quotes or
/// brackets, then whitespace or the end of the text. It must contain at least
/// one alphanumeric character. When no sentence fits, the text is cut at the
/// last word boundary and an ellipsis is appended, still within `max_chars`.
pub fn truncate_to_sentence(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    if max_chars == 0 {
        return String::new();
    }

    let head = &text[..byte_offset(text, max_chars)];
    let mut sentence_end = None;
    let mut seen_word = false;
    for (i, c) in head.char_indices() {
        if c.is_alphanumeric() {
            seen_word = true;
            continue;
        }
        if !seen_word || !matches!(c, '.' | '!' | '?') {
            continue;
        }

        let mut end = i + c.len_utf8();
        while let Some(closer) = head[end..]
            .chars()
            .next()
            .filter(|next| SENTENCE_CLOSERS.contains(next))
        {
            end += closer.len_utf8();
        }
        if text[end..].chars().next().is_none_or(char::is_whitespace) {
            sentence_end = Some(end);
        }
    }

    if let Some(end) = sentence_end {
        return text[..end].trim_end().to_string();
    }

    // Reserve one char for the ellipsis
    let head = &text[..byte_offset(text, max_chars - 1)];
    let head = match head.rfind(char::is_whitespace) {
        Some(i) if i > 0 => &head[..i],
        _ => head,
    };
    format!("{}…", head.trim_end())
}

/// Byte offset of the `n`th char, or the text length
fn byte_offset(text: &str, n: usize) -> usize {
    text.char_indices()
        .nth(n)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}
