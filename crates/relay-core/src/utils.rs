use chrono::Utc;

// ============== Timestamp Helpers ==============

/// Current wall-clock time as milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

// ============== Text Helpers ==============

/// Shorten `s` to at most `max_chars` characters for log previews.
pub fn truncate_text(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let mut out = s.chars().take(max_chars).collect::<String>();
    out.push_str("...");
    out
}

/// Split `s` into pieces of at most `max_chars` characters, breaking after
/// the last newline in a piece when there is one.
pub fn split_message(s: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut out = Vec::new();
    let mut rest = s;

    while rest.chars().count() > max_chars {
        let cut = rest
            .char_indices()
            .nth(max_chars)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let head = &rest[..cut];
        let at = match head.rfind('\n') {
            Some(nl) if nl > 0 => nl + 1,
            _ => cut,
        };
        out.push(rest[..at].to_string());
        rest = &rest[at..];
    }
    if !rest.is_empty() || out.is_empty() {
        out.push(rest.to_string());
    }
    out
}
