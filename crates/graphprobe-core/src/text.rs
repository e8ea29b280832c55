/// Truncates `text` to at most `max_chars` characters, appending `...` when cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    let mut chars = text.char_indices();
    match chars.nth(max_chars) {
        Some((byte_index, _)) => format!("{}...", &text[..byte_index]),
        None => text.to_string(),
    }
}

/// Renders a secret for display without revealing it.
pub fn mask_secret(value: &str) -> &'static str {
    if value.trim().is_empty() {
        "[EMPTY]"
    } else {
        "[MASKED]"
    }
}

/// Collapses runs of whitespace (including newlines) into single spaces.
pub fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
