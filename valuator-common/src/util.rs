//! String helpers for log output.

use std::sync::OnceLock;

use regex::Regex;

/// Truncate a string to at most `max_chars` characters, appending "..." if truncated.
///
/// Uses character boundaries, so multi-byte UTF-8 input is safe.
pub fn truncate_with_ellipsis(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", s[..idx].trim_end()),
        None => s.to_string(),
    }
}

fn redactions() -> &'static [(Regex, &'static str)] {
    static REDACTIONS: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    REDACTIONS.get_or_init(|| {
        [
            // Azure echoes the `api-key` header name in some 401 bodies
            (r"(?i)(api[_-]?key|apikey)(\s*[=:]\s*)\S{8,}", "$1$2***REDACTED***"),
            (
                r"(?i)\b(bearer|token|secret)(\s*[=:]\s*|\s+)[A-Za-z0-9._\-]{10,}",
                "$1$2***REDACTED***",
            ),
            (r"sk-[A-Za-z0-9]{20,}", "***REDACTED***"),
        ]
        .into_iter()
        .filter_map(|(pattern, replacement)| {
            Regex::new(pattern).ok().map(|re| (re, replacement))
        })
        .collect()
    })
}

/// Redact credentials from text that is about to be logged or surfaced in an
/// error, e.g. an upstream LLM error body.
pub fn sanitize_for_log(s: &str) -> String {
    redactions()
        .iter()
        .fold(s.to_string(), |text, (re, replacement)| {
            re.replace_all(&text, *replacement).into_owned()
        })
}
