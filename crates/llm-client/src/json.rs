//! Pull a JSON document out of free-form model output.
//!
//! Models wrap JSON in markdown fences, prefix it with prose, or trail it
//! with commentary. These helpers peel all of that off before parsing.

use finsight_core::ReportError;
use serde_json::Value;

/// Remove a surrounding ```json ... ``` (or bare ```) fence, if present.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(start) = trimmed.find("```") else {
        return trimmed;
    };

    let after_open = &trimmed[start + 3..];
    // skip the info string (e.g. "json") up to the end of the opening line
    let body = match after_open.find('\n') {
        Some(nl) => &after_open[nl + 1..],
        None => after_open,
    };

    match body.rfind("```") {
        Some(end) => body[..end].trim(),
        None => body.trim(),
    }
}

/// First balanced `{ ... }` block in `text`, ignoring braces inside strings.
pub fn extract_json_block(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse the JSON object or array a model returned.
///
/// Fails with `MalformedInput` when no JSON document can be recovered.
pub fn parse_json_response(text: &str) -> Result<Value, ReportError> {
    let body = strip_code_fences(text);

    if body.starts_with('{') || body.starts_with('[') {
        if let Ok(value) = serde_json::from_str::<Value>(body) {
            return Ok(value);
        }
    }

    let block = extract_json_block(body)
        .ok_or_else(|| ReportError::MalformedInput("response contains no JSON object".to_string()))?;

    serde_json::from_str(block)
        .map_err(|e| ReportError::MalformedInput(format!("invalid JSON in response: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strip_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```\n[1, 2]\n```"), "[1, 2]");
        assert_eq!(strip_code_fences("  {\"a\": 1}  "), "{\"a\": 1}");
    }

    #[test]
    fn test_fenced_with_preamble() {
        let text = "Here is the data:\n```json\n{\"Revenue\": {\"2023\": 10}}\n```\nLet me know!";
        assert_eq!(
            parse_json_response(text).unwrap(),
            json!({"Revenue": {"2023": 10}})
        );
    }

    #[test]
    fn test_block_ignores_braces_in_strings() {
        let text = r#"Sure! {"note": "use } carefully", "v": {"x": 1}} trailing"#;
        assert_eq!(
            extract_json_block(text),
            Some(r#"{"note": "use } carefully", "v": {"x": 1}}"#)
        );
    }

    #[test]
    fn test_top_level_array() {
        let value = parse_json_response("[{\"year\": 2023, \"Revenue\": 5}]").unwrap();
        assert!(value.is_array());
    }

    #[test]
    fn test_no_json_is_malformed() {
        assert!(matches!(
            parse_json_response("I could not find any figures."),
            Err(ReportError::MalformedInput(_))
        ));
        assert!(matches!(
            parse_json_response("{\"Revenue\": "),
            Err(ReportError::MalformedInput(_))
        ));
    }
}
