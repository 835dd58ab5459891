//! JSON parsing helpers for LLM responses
//!
//! Models often wrap the JSON payload in prose or code fences, so the
//! first balanced `{...}` span is extracted before deserializing.

use crate::error::{Error, Result};

use super::types::ExpenseCategorizationResponse;

const RAW_PREVIEW_CHARS: usize = 200;

/// Shorten a raw model reply for error messages
pub(crate) fn truncate_raw(raw: &str) -> String {
    if raw.chars().count() > RAW_PREVIEW_CHARS {
        let head: String = raw.chars().take(RAW_PREVIEW_CHARS).collect();
        format!("{}...", head)
    } else {
        raw.to_string()
    }
}

/// Return the first balanced `{...}` span, ignoring braces inside strings
pub fn extract_json_object(response: &str) -> Option<&str> {
    let start = response.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in response[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&response[start..=start + offset]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Parse an expense classification from a model reply
pub fn parse_categorization(response: &str) -> Result<ExpenseCategorizationResponse> {
    let response = response.trim();

    let json_str = extract_json_object(response).ok_or_else(|| {
        Error::Upstream(format!(
            "No valid JSON found in LLM response | Raw: {}",
            truncate_raw(response)
        ))
    })?;

    let parsed: ExpenseCategorizationResponse = serde_json::from_str(json_str).map_err(|e| {
        Error::Upstream(format!(
            "Failed to parse JSON response: {} | Raw: {}",
            e,
            truncate_raw(json_str)
        ))
    })?;
    parsed.validate()?;

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Currency;
    use rust_decimal::Decimal;

    #[test]
    fn test_extract_json_plain() {
        let raw = r#"{"a": 1}"#;
        assert_eq!(extract_json_object(raw), Some(raw));
    }

    #[test]
    fn test_extract_json_with_prose_and_fences() {
        let raw = "Here you go:\n```json\n{\"a\": {\"b\": 2}}\n```\nAnything else?";
        assert_eq!(extract_json_object(raw), Some("{\"a\": {\"b\": 2}}"));
    }

    #[test]
    fn test_extract_json_first_object_only() {
        let raw = r#"{"first": 1} and {"second": 2}"#;
        assert_eq!(extract_json_object(raw), Some(r#"{"first": 1}"#));
    }

    #[test]
    fn test_extract_json_ignores_braces_in_strings() {
        let raw = r#"{"comments": "price {approx} \"quoted}\"", "x": 1}"#;
        assert_eq!(extract_json_object(raw), Some(raw));
    }

    #[test]
    fn test_extract_json_unbalanced() {
        assert_eq!(extract_json_object(r#"{"a": 1"#), None);
        assert_eq!(extract_json_object("no json here"), None);
    }

    #[test]
    fn test_parse_categorization_snake_case() {
        let raw = r#"Sure! {"category": "Food & Dining", "total_amount": 5.50, "currency": "USD",
            "confidence": 0.95, "cost": 0.0001, "comments": "Coffee purchase"}"#;
        let parsed = parse_categorization(raw).unwrap();
        assert_eq!(parsed.category, "Food & Dining");
        assert_eq!(parsed.total_amount, Decimal::new(55, 1));
        assert_eq!(parsed.currency, Currency::Usd);
        assert_eq!(parsed.comments.as_deref(), Some("Coffee purchase"));
    }

    #[test]
    fn test_parse_categorization_title_case_aliases() {
        let raw = r#"{"Category": "Transportation", "Total Amount": "25.00", "Currency": "eur",
            "Confidence": 0.8, "Cost": 0.0, "Comments": null}"#;
        let parsed = parse_categorization(raw).unwrap();
        assert_eq!(parsed.category, "Transportation");
        assert_eq!(parsed.total_amount, Decimal::new(25, 0));
        assert_eq!(parsed.currency, Currency::Eur);
        assert!(parsed.comments.is_none());
    }

    #[test]
    fn test_parse_categorization_no_json() {
        let err = parse_categorization("I cannot help with that").unwrap_err();
        assert!(err.to_string().contains("No valid JSON found"));
    }

    #[test]
    fn test_parse_categorization_missing_field() {
        let err = parse_categorization(r#"{"category": "Other"}"#).unwrap_err();
        assert!(matches!(err, Error::Upstream(_)));
        assert!(err.to_string().contains("Failed to parse JSON response"));
    }

    #[test]
    fn test_parse_categorization_rejects_unknown_currency() {
        let raw = r#"{"category": "Other", "total_amount": 1, "currency": "BTC", "confidence": 0.5}"#;
        assert!(parse_categorization(raw).is_err());
    }

    #[test]
    fn test_parse_categorization_rejects_confidence_out_of_range() {
        let raw = r#"{"category": "Other", "total_amount": 1, "currency": "USD", "confidence": 7}"#;
        let err = parse_categorization(raw).unwrap_err();
        assert!(err.to_string().contains("confidence"));
    }

    #[test]
    fn test_truncate_raw() {
        let long = "x".repeat(500);
        let truncated = truncate_raw(&long);
        assert!(truncated.ends_with("..."));
        assert_eq!(truncated.chars().count(), RAW_PREVIEW_CHARS + 3);
    }
}
