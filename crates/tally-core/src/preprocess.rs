//! Input preprocessing for expense descriptions
//!
//! Runs before classification in every front end. Errors block
//! classification; warnings are passed along to the user.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use tracing::warn;

pub const MIN_LENGTH: usize = 3;
pub const MAX_LENGTH: usize = 500;

const CURRENCY_SYMBOLS: [(char, &str); 3] = [('€', "EUR"), ('£', "GBP"), ('¥', "JPY")];

fn suspicious_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)<script|javascript:|on\w+\s*=").expect("valid regex"))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreprocessResult {
    pub cleaned_text: String,
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Validate and clean a raw expense description
pub fn preprocess(text: &str) -> PreprocessResult {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let collapsed = collapse_whitespace(text);
    if collapsed.is_empty() {
        return PreprocessResult {
            cleaned_text: String::new(),
            is_valid: false,
            errors: vec!["Input cannot be empty".to_string()],
            warnings,
        };
    }

    let length = collapsed.chars().count();
    if length < MIN_LENGTH {
        errors.push(format!("Input too short (min {} characters)", MIN_LENGTH));
    }
    if length > MAX_LENGTH {
        errors.push(format!("Input too long (max {} characters)", MAX_LENGTH));
    }

    if suspicious_re().is_match(&collapsed) {
        let preview: String = collapsed.chars().take(50).collect();
        warn!(input = %preview, "Blocked suspicious input");
        errors.push("Suspicious input detected".to_string());
    }

    let mut cleaned = collapsed;
    for (symbol, code) in CURRENCY_SYMBOLS {
        if cleaned.contains(symbol) {
            cleaned = cleaned.replace(symbol, &format!(" {} ", code));
        }
    }
    let cleaned = collapse_whitespace(&cleaned);

    if !cleaned.chars().any(|c| c.is_ascii_digit()) {
        warnings.push("No amount detected - expense amount may be missing".to_string());
    }

    PreprocessResult {
        is_valid: errors.is_empty(),
        cleaned_text: cleaned,
        errors,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_input_is_cleaned() {
        let result = preprocess("  Coffee   at\tStarbucks  $5.50 ");
        assert!(result.is_valid);
        assert_eq!(result.cleaned_text, "Coffee at Starbucks $5.50");
        assert!(result.errors.is_empty());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_currency_symbols_normalized() {
        assert_eq!(preprocess("Lunch €12").cleaned_text, "Lunch EUR 12");
        assert_eq!(preprocess("Book £8.99 today").cleaned_text, "Book GBP 8.99 today");
        assert_eq!(preprocess("¥500 ramen").cleaned_text, "JPY 500 ramen");
    }

    #[test]
    fn test_empty_input() {
        for input in ["", "   ", "\n\t"] {
            let result = preprocess(input);
            assert!(!result.is_valid);
            assert_eq!(result.cleaned_text, "");
            assert_eq!(result.errors, vec!["Input cannot be empty"]);
        }
    }

    #[test]
    fn test_length_bounds() {
        let short = preprocess("ab");
        assert!(!short.is_valid);
        assert!(short.errors[0].contains("too short"));

        assert!(preprocess("ab1").is_valid);

        let long = preprocess(&"9".repeat(MAX_LENGTH + 1));
        assert!(!long.is_valid);
        assert_eq!(long.errors, vec!["Input too long (max 500 characters)"]);

        assert!(preprocess(&"9".repeat(MAX_LENGTH)).is_valid);
    }

    #[test]
    fn test_length_counts_characters() {
        // 500 multibyte characters is still within bounds
        let input = format!("1{}", "é".repeat(MAX_LENGTH - 1));
        assert!(preprocess(&input).is_valid);
    }

    #[test]
    fn test_suspicious_patterns() {
        for input in [
            "<script>alert(1)</script>",
            "<SCRIPT src=x> 5",
            "javascript:alert(1)",
            "<img src=x onerror=alert(1)>",
            "lunch 12 onClick = steal()",
        ] {
            let result = preprocess(input);
            assert!(!result.is_valid, "{} should be rejected", input);
            assert!(result.errors.contains(&"Suspicious input detected".to_string()));
        }
    }

    #[test]
    fn test_missing_amount_is_a_warning() {
        let result = preprocess("coffee with friends");
        assert!(result.is_valid);
        assert_eq!(
            result.warnings,
            vec!["No amount detected - expense amount may be missing"]
        );
    }
}
