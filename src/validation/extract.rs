//! Pull a JSON document out of agent text.
//!
//! Agents often wrap JSON in Markdown fences or add a sentence before it.

use serde_json::Value;

/// Parse agent text as JSON, tolerating code fences and surrounding prose.
///
/// A payload that is itself a JSON-encoded string is decoded once more.
pub fn parse_json_text(text: &str) -> Result<Value, String> {
    match parse_document(text)? {
        Value::String(inner) => parse_document(&inner),
        value => Ok(value),
    }
}

fn parse_document(text: &str) -> Result<Value, String> {
    let unfenced = strip_code_fence(text.trim());

    match serde_json::from_str::<Value>(unfenced) {
        Ok(value) => Ok(value),
        Err(first_err) => first_json_value(unfenced).ok_or_else(|| format!("payload is not valid JSON: {}", first_err)),
    }
}

/// Remove a surrounding ```json ... ``` fence, on one line or several.
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest
        .trim_start_matches(|c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        .trim();
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// The first complete JSON object or array in `text`, ignoring anything after it.
fn first_json_value(text: &str) -> Option<Value> {
    text.match_indices(['{', '[']).find_map(|(start, _)| {
        serde_json::Deserializer::from_str(&text[start..])
            .into_iter::<Value>()
            .next()?
            .ok()
    })
}
