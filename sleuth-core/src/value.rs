pub type Value = serde_json::Value;

/// Renders a value as plain text: strings lose their quotes, everything else
/// becomes compact JSON.
pub fn to_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Cuts `text` to at most `max_chars` characters, appending `marker` when
/// anything was removed. Never splits a UTF-8 sequence.
pub fn truncate_chars(text: &str, max_chars: usize, marker: &str) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => format!("{}{marker}", &text[..byte_index]),
        None => text.to_string(),
    }
}
