use regex::Regex;
use std::sync::LazyLock;

use crate::error::Result;
use crate::schema::ExtractionResult;

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```(?:json)?").expect("valid fence pattern"));

/// Cut the JSON object out of a model reply.
///
/// Code fences are removed, then the text between the first `{` and the last
/// `}` (inclusive) is returned. When no such pair exists the input comes back
/// unchanged and the JSON parser reports the failure.
pub fn extract_json_object(text: &str) -> String {
    let stripped = CODE_FENCE.replace_all(text, "");

    match (stripped.find('{'), stripped.rfind('}')) {
        (Some(start), Some(end)) if start < end => stripped[start..=end].to_string(),
        _ => text.to_string(),
    }
}

/// Sanitize a raw model reply and parse it.
pub fn parse_response(text: &str) -> Result<ExtractionResult> {
    let json = extract_json_object(text);
    Ok(serde_json::from_str(&json)?)
}
