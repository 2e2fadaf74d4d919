//! Strict parsing of generator output into a [`Tip`].

use serde_json::Value;
use stride_core::Tip;

/// Parse raw generator text into a well-formed tip.
///
/// The text must be a single JSON object, optionally wrapped in a
/// markdown code fence. Unknown fields are ignored.
pub fn parse_tip(raw: &str) -> Result<Tip, String> {
    let body = strip_fence(raw.trim());
    let value: Value = serde_json::from_str(body).map_err(|e| format!("not JSON: {e}"))?;
    if !value.is_object() {
        return Err("expected a JSON object".into());
    }

    let tip: Tip = serde_json::from_value(value).map_err(|e| format!("not a tip: {e}"))?;
    if !tip.is_well_formed() {
        return Err("title, message and category must be non-blank".into());
    }
    Ok(tip)
}

fn strip_fence(text: &str) -> &str {
    let Some(inner) = text.strip_prefix("```") else {
        return text;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}
