/// Strip a Markdown code fence wrapping from a model completion.
///
/// Models occasionally wrap the requested JSON in ```` ```json … ``` ````
/// despite being told not to. The info string after the opening fence is
/// discarded along with the fences themselves.
pub fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Everything up to the first newline is the info string ("json", …).
    let body = match rest.split_once('\n') {
        Some((_, body)) => body,
        None => rest,
    };
    let body = body.trim_end();
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Truncate a string to at most `max_chars` characters.
///
/// Counts characters rather than bytes, so multibyte text never gets split
/// mid-character. Used to keep per-record prompt lines within budget.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
