//! Agent payload parsing
//!
//! Upstream agents are LLM-backed and occasionally wrap their JSON in prose
//! or markdown fences. Parsing is a pure function from response text to a
//! tagged outcome; the extraction heuristics are an internal strategy that
//! can be swapped without touching callers.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

/// Result of parsing one agent response body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    /// Body (or an embedded block) parsed as structured JSON
    Parsed(Value),
    /// Body is plain text with no JSON structure
    RawText(String),
    /// Body claims to be JSON but cannot be parsed
    Malformed(String),
}

fn fenced_block_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```(?:json)?\s*(.+?)\s*```").expect("static regex"))
}

/// Parse an agent response body into a [`ParseOutcome`]
pub fn parse_payload(text: &str) -> ParseOutcome {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return ParseOutcome::Malformed("empty response body".to_string());
    }

    // Strict JSON first: the common case for well-behaved agents.
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        if value.is_object() || value.is_array() {
            return ParseOutcome::Parsed(value);
        }
    }

    // Fenced ```json block.
    if let Some(caps) = fenced_block_re().captures(trimmed) {
        let inner = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        if let Ok(value) = serde_json::from_str::<Value>(inner) {
            return ParseOutcome::Parsed(value);
        }
    }

    // First balanced top-level object embedded in prose.
    if let Some(candidate) = first_balanced_object(trimmed) {
        if let Ok(value) = serde_json::from_str::<Value>(candidate) {
            return ParseOutcome::Parsed(value);
        }
    }

    // Something that starts like JSON but survived none of the strategies
    // is malformed rather than prose.
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return ParseOutcome::Malformed("unparseable JSON-like body".to_string());
    }

    ParseOutcome::RawText(trimmed.to_string())
}

/// Slice out the first balanced `{...}` region, respecting string literals
fn first_balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &b) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strict_json_object() {
        let outcome = parse_payload(r#"{"focus": "retention", "priority": 2}"#);
        assert_eq!(outcome, ParseOutcome::Parsed(json!({"focus": "retention", "priority": 2})));
    }

    #[test]
    fn test_strict_json_array() {
        let outcome = parse_payload(r#"[1, 2, 3]"#);
        assert_eq!(outcome, ParseOutcome::Parsed(json!([1, 2, 3])));
    }

    #[test]
    fn test_fenced_block() {
        let body = "Here is the plan:\n```json\n{\"weeks\": 4}\n```\nGood luck!";
        assert_eq!(parse_payload(body), ParseOutcome::Parsed(json!({"weeks": 4})));
    }

    #[test]
    fn test_embedded_object_in_prose() {
        let body = "The agent suggests {\"pace\": \"steady\", \"note\": \"has {braces} in string\"} overall.";
        let outcome = parse_payload(body);
        assert_eq!(
            outcome,
            ParseOutcome::Parsed(json!({"pace": "steady", "note": "has {braces} in string"}))
        );
    }

    #[test]
    fn test_plain_prose_is_raw_text() {
        let outcome = parse_payload("Keep practicing graph problems this week.");
        assert_eq!(
            outcome,
            ParseOutcome::RawText("Keep practicing graph problems this week.".to_string())
        );
    }

    #[test]
    fn test_broken_json_is_malformed() {
        assert!(matches!(parse_payload(r#"{"unterminated": "#), ParseOutcome::Malformed(_)));
    }

    #[test]
    fn test_empty_body_is_malformed() {
        assert!(matches!(parse_payload("   "), ParseOutcome::Malformed(_)));
    }
}
