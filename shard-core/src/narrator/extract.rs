//! Structured output recovery.
//!
//! Model text rarely arrives as clean JSON; it tends to come wrapped in
//! prose, code fences, or trailing commentary. This is a thin recovery
//! pass, not a repair parser: either the whole trimmed text parses as a
//! JSON object, or the first balanced `{...}` span does. No trailing-comma
//! fixes, no quote normalization.

use serde_json::Value;

/// Recover a single JSON object from raw model text.
///
/// Returns `None` for empty input, input with no `{`, an unterminated
/// object, or a balanced candidate that fails to parse.
pub fn extract_json_object(raw: &str) -> Option<Value> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }

    // The happy path: the model returned exactly one object.
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        if value.is_object() {
            return Some(value);
        }
    }

    // Otherwise take the first balanced brace span and parse exactly that.
    let start = text.find('{')?;
    let mut depth = 0usize;
    for (offset, ch) in text[start..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let candidate = &text[start..start + offset + ch.len_utf8()];
                    return serde_json::from_str(candidate).ok();
                }
            }
            _ => {}
        }
    }

    // Depth never returned to zero: unterminated object.
    None
}
