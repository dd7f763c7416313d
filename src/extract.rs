//! Pulling a JSON object out of free-form model text.
//!
//! `Greedy` slices from the first `{` to the last `}` and parses that span.
//! It assumes a single object and no stray braces in the surrounding prose;
//! `'{"a":1} noise {"b":2}'` yields an unparseable span on purpose.
//! `Strict` accepts only a reply that is, after dropping markdown fences,
//! exactly one JSON object.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ExtractError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExtractionMode {
    #[default]
    Greedy,
    Strict,
}

/// First `{` through last `}`, inclusive.
pub fn json_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end > start {
        Some(&text[start..=end])
    } else {
        None
    }
}

fn strip_fences(text: &str) -> &str {
    text.trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

pub fn extract_value(text: &str, mode: ExtractionMode) -> Result<Value, ExtractError> {
    let candidate = match mode {
        ExtractionMode::Greedy => json_span(text).ok_or(ExtractError::NoObject)?,
        ExtractionMode::Strict => {
            let cleaned = strip_fences(text);
            if !cleaned.starts_with('{') {
                return Err(ExtractError::NoObject);
            }
            cleaned
        }
    };

    let value: Value = serde_json::from_str(candidate)?;
    if !value.is_object() {
        return Err(ExtractError::NotAnObject);
    }
    Ok(value)
}

/// Extract and deserialize into a typed record.
pub fn extract<T: DeserializeOwned>(text: &str, mode: ExtractionMode) -> Result<T, ExtractError> {
    let value = extract_value(text, mode)?;
    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Plan;
    use serde_json::json;

    #[test]
    fn test_prose_around_object() {
        let value = extract_value(r#"prefix {"a":1} suffix"#, ExtractionMode::Greedy).unwrap();
        assert_eq!(value, json!({"a": 1}));
    }

    #[test]
    fn test_greedy_spans_two_objects_and_fails() {
        let text = r#"{"a":1} noise {"b":2}"#;
        assert_eq!(json_span(text), Some(text));
        let err = extract_value(text, ExtractionMode::Greedy).unwrap_err();
        assert!(matches!(err, ExtractError::Invalid(_)));
    }

    #[test]
    fn test_trailing_brace_in_prose_corrupts_span() {
        let text = r#"{"a":1} and don't forget {this}"#;
        assert!(extract_value(text, ExtractionMode::Greedy).is_err());
    }

    #[test]
    fn test_no_braces() {
        assert!(json_span("just words").is_none());
        assert!(matches!(
            extract_value("just words", ExtractionMode::Greedy),
            Err(ExtractError::NoObject)
        ));
    }

    #[test]
    fn test_closing_before_opening() {
        assert!(json_span("} then {").is_none());
    }

    #[test]
    fn test_nested_object() {
        let value = extract_value(
            r#"Here: {"outer": {"inner": [1, 2]}} done"#,
            ExtractionMode::Greedy,
        )
        .unwrap();
        assert_eq!(value["outer"]["inner"][1], 2);
    }

    #[test]
    fn test_strict_rejects_prose() {
        let err = extract_value(r#"Sure! {"a":1}"#, ExtractionMode::Strict).unwrap_err();
        assert!(matches!(err, ExtractError::NoObject));
    }

    #[test]
    fn test_strict_accepts_fenced_object() {
        let text = "```json\n{\"a\": 1}\n```";
        assert_eq!(
            extract_value(text, ExtractionMode::Strict).unwrap(),
            json!({"a": 1})
        );
    }

    #[test]
    fn test_typed_plan_with_missing_fields() {
        let plan: Plan = extract(
            r#"{"understanding": "wants headlines", "steps": ["read h2"]}"#,
            ExtractionMode::Greedy,
        )
        .unwrap();
        assert_eq!(plan.understanding.as_deref(), Some("wants headlines"));
        assert!(plan.approach.is_none());
        assert!(plan.risks.is_empty());
    }

    #[test]
    fn test_typed_mismatch_is_an_error() {
        let result = extract::<Plan>(r#"{"steps": "not a list"}"#, ExtractionMode::Greedy);
        assert!(matches!(result, Err(ExtractError::Invalid(_))));
    }
}
