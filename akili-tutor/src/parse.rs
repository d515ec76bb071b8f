/// Model output parsing
///
/// The one place generated text becomes structured data: strip a Markdown
/// code fence if the model wrapped its answer in one, parse JSON, and pull
/// out the list the caller asked for. There is no further repair; anything
/// that does not parse after fence stripping is a failed generation.

use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("Model returned an empty response")]
    Empty,

    #[error("Model response is not valid JSON: {0}")]
    InvalidJson(String),

    /// Valid JSON, wrong shape
    #[error("Unexpected response shape: {0}")]
    UnexpectedShape(String),
}

/// Removes a surrounding ```` ``` ```` / ```` ```json ```` fence, if any.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Drop the info string ("json", "JSON", ...) up to the first newline
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };

    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

/// Fence-strips and parses a JSON payload
pub fn parse_payload(text: &str) -> Result<Value, ParseError> {
    let cleaned = strip_code_fences(text);
    if cleaned.is_empty() {
        return Err(ParseError::Empty);
    }
    serde_json::from_str(cleaned).map_err(|e| ParseError::InvalidJson(e.to_string()))
}

/// Extracts a list that may come bare (`[...]`) or wrapped (`{"<key>": [...]}`).
pub fn extract_list(text: &str, key: &str) -> Result<Vec<Value>, ParseError> {
    match parse_payload(text)? {
        Value::Array(items) => Ok(items),
        Value::Object(mut fields) => match fields.remove(key) {
            Some(Value::Array(items)) => Ok(items),
            Some(_) => Err(ParseError::UnexpectedShape(format!("\"{key}\" is not a list"))),
            None => Err(ParseError::UnexpectedShape(format!("missing \"{key}\" list"))),
        },
        _ => Err(ParseError::UnexpectedShape("expected a list or an object".to_string())),
    }
}

/// First non-empty string among `keys`
pub(crate) fn string_field(item: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| item.get(*key))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n[1, 2]\n```"), "[1, 2]");
        assert_eq!(strip_code_fences("```\n{\"a\": 1}\n```\n"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("  [1]  "), "[1]");
        // Unterminated fence still loses its opening line
        assert_eq!(strip_code_fences("```json\n[3]"), "[3]");
    }

    #[test]
    fn test_parse_payload_errors() {
        assert_eq!(parse_payload("   "), Err(ParseError::Empty));
        assert_eq!(parse_payload("```json\n```"), Err(ParseError::Empty));
        assert!(matches!(parse_payload("Here are your modules: ["), Err(ParseError::InvalidJson(_))));
    }

    #[test]
    fn test_extract_bare_and_wrapped_lists() {
        assert_eq!(extract_list("[1, 2]", "modules").unwrap(), vec![json!(1), json!(2)]);
        assert_eq!(
            extract_list("```json\n{\"modules\": [{\"title\": \"A\"}]}\n```", "modules").unwrap(),
            vec![json!({"title": "A"})]
        );
    }

    #[test]
    fn test_extract_wrong_shapes() {
        assert!(matches!(
            extract_list("{\"items\": []}", "modules"),
            Err(ParseError::UnexpectedShape(_))
        ));
        assert!(matches!(
            extract_list("{\"modules\": \"none\"}", "modules"),
            Err(ParseError::UnexpectedShape(_))
        ));
        assert!(matches!(extract_list("42", "modules"), Err(ParseError::UnexpectedShape(_))));
    }

    #[test]
    fn test_string_field_fallback_keys() {
        let item = json!({"question": "  ", "question_text": "What is 2+2?"});
        assert_eq!(
            string_field(&item, &["question", "question_text"]),
            Some("What is 2+2?".to_string())
        );
        assert_eq!(string_field(&item, &["missing"]), None);
    }
}
