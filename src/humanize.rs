//! Display helpers for CLI output.
//!
//! Counts are shown in approximate form ("25k documents") and long text is
//! flattened and truncated to a configurable excerpt length.

/// Format a count in approximate human-readable form.
///
/// Values below 1000 are shown verbatim; values above 10^12 collapse to
/// `"> 1T"`; everything in between is rounded to a `k`/`M`/`B` suffix.
pub fn human_count(n: u64) -> String {
    if n < 1000 {
        return n.to_string();
    }
    if n > 1_000_000_000_000 {
        return "> 1T".to_string();
    }

    const SUFFIXES: [&str; 4] = ["", "k", "M", "B"];
    let mut value = n as f64;
    let mut idx = 0;
    while value >= 1000.0 && idx < SUFFIXES.len() - 1 {
        value /= 1000.0;
        idx += 1;
    }
    format!("{}{}", value.round() as u64, SUFFIXES[idx])
}

/// Flatten a text to a single line and truncate it to `max_chars` characters.
///
/// Truncation is by character, never inside a UTF-8 sequence.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    let flat = text.replace(['\n', '\r', '\t'], " ");
    let flat = flat.trim();

    let mut out = String::new();
    for (count, ch) in flat.chars().enumerate() {
        if count >= max_chars {
            out.push_str("...");
            return out;
        }
        out.push(ch);
    }
    out
}
