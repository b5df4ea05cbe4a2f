//! Strict JSON extraction from model output.
//!
//! Accepted shapes: the whole trimmed text is a JSON value, or the text holds
//! exactly one fenced code block (```` ```json ```` or bare ```` ``` ````)
//! whose body is JSON. Anything else is rejected; there is no scanning for
//! the first and last bracket.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("response contains no JSON value or single fenced block")]
    NoJson,

    #[error("fenced block is not valid JSON: {0}")]
    Invalid(#[source] serde_json::Error),
}

/// Extract the single JSON value carried by `text`.
///
/// # Errors
///
/// Returns [`ExtractError::NoJson`] when the text is neither bare JSON nor a
/// single fenced block, and [`ExtractError::Invalid`] when the one fenced
/// block does not parse.
pub fn extract_json(text: &str) -> Result<serde_json::Value, ExtractError> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Ok(value);
    }

    let blocks = fenced_blocks(trimmed);
    match blocks.as_slice() {
        [Some(body)] => serde_json::from_str(body.trim()).map_err(ExtractError::Invalid),
        _ => Err(ExtractError::NoJson),
    }
}

/// Every well-formed fenced block in order. Blocks tagged with a language
/// other than `json` are `None` but still count towards the total.
fn fenced_blocks(text: &str) -> Vec<Option<&str>> {
    let mut blocks = Vec::new();
    let mut rest = text;
    while let Some(open) = rest.find("```") {
        let after_fence = &rest[open + 3..];
        let Some(line_end) = after_fence.find('\n') else {
            break;
        };
        let tag = after_fence[..line_end].trim();
        let body_start = &after_fence[line_end + 1..];
        let Some(close) = body_start.find("```") else {
            break;
        };
        let body = &body_start[..close];
        let is_json = tag.is_empty() || tag.eq_ignore_ascii_case("json");
        blocks.push(is_json.then_some(body));
        rest = &body_start[close + 3..];
    }
    blocks
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn accepts_whole_text_json() {
        let value = extract_json("  {\"a\": 1}\n").unwrap();
        assert_eq!(value, json!({"a": 1}));

        let value = extract_json("[1, 2]").unwrap();
        assert_eq!(value, json!([1, 2]));
    }

    #[test]
    fn accepts_single_json_fence() {
        let text = "Here is the result:\n```json\n{\"relevanceScore\": 0.9}\n```\nDone.";
        assert_eq!(extract_json(text).unwrap(), json!({"relevanceScore": 0.9}));
    }

    #[test]
    fn accepts_single_bare_fence() {
        let text = "```\n[{\"x\": true}]\n```";
        assert_eq!(extract_json(text).unwrap(), json!([{"x": true}]));
    }

    #[test]
    fn rejects_prose_with_brackets() {
        let text = "The answer is {\"a\": 1} as you can see [sic].";
        assert!(matches!(extract_json(text), Err(ExtractError::NoJson)));
    }

    #[test]
    fn rejects_multiple_fences() {
        let text = "```json\n{\"a\": 1}\n```\nand\n```json\n{\"b\": 2}\n```";
        assert!(matches!(extract_json(text), Err(ExtractError::NoJson)));
    }

    #[test]
    fn rejects_fence_with_other_language() {
        let text = "```python\nprint(1)\n```";
        assert!(matches!(extract_json(text), Err(ExtractError::NoJson)));
    }

    #[test]
    fn rejects_invalid_json_in_fence() {
        let text = "```json\n{not json}\n```";
        assert!(matches!(extract_json(text), Err(ExtractError::Invalid(_))));
    }

    #[test]
    fn rejects_unterminated_fence() {
        let text = "```json\n{\"a\": 1}";
        assert!(matches!(extract_json(text), Err(ExtractError::NoJson)));
    }

    #[test]
    fn rejects_empty_text() {
        assert!(matches!(extract_json("   "), Err(ExtractError::NoJson)));
    }
}
