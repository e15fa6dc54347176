//! Normalisation of the free-text fields owners and respondents submit.

/// Column width shared by schedule names and comments.
pub const MAX_TEXT_CHARS: usize = 255;
/// Name stored when the owner leaves the field blank.
pub const UNTITLED_SCHEDULE: &str = "(untitled)";

/// Split the candidate textarea into names: one per line, trimmed, blank
/// lines dropped, input order kept. Handles `\r\n` line endings.
pub fn parse_candidate_names(raw: &str) -> Vec<String> {
    raw.split('\n')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn normalize_schedule_name(raw: &str) -> String {
    let name = truncate_chars(raw, MAX_TEXT_CHARS);
    if name.trim().is_empty() {
        UNTITLED_SCHEDULE.to_string()
    } else {
        name
    }
}

pub fn normalize_comment(raw: &str) -> String {
    truncate_chars(raw, MAX_TEXT_CHARS)
}

/// Character-based (not byte-based) truncation so multi-byte names never
/// split inside a code point.
fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
