use crate::ValidationError;

/// Normalize an exchange code (`" nyse "` -> `"NYSE"`).
pub fn exchange_code(input: &str) -> Result<String, ValidationError> {
    normalize_code("exchange", input)
}

/// Normalize a symbol code (`"brk.b"` -> `"BRK.B"`).
pub fn symbol_code(input: &str) -> Result<String, ValidationError> {
    normalize_code("symbol", input)
}

// Codes become cache key segments, so separators and whitespace are rejected.
fn normalize_code(kind: &'static str, input: &str) -> Result<String, ValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyCode { kind });
    }

    let normalized = trimmed.to_uppercase();
    for (index, ch) in normalized.chars().enumerate() {
        if ch == '/' || ch == '\\' || ch.is_whitespace() || ch.is_control() {
            return Err(ValidationError::CodeInvalidChar { kind, ch, index });
        }
    }

    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_and_whitespace() {
        assert_eq!(exchange_code(" nyse ").expect("code"), "NYSE");
        assert_eq!(symbol_code("brk.b").expect("code"), "BRK.B");
        assert_eq!(symbol_code("^dji").expect("code"), "^DJI");
    }

    #[test]
    fn rejects_empty_and_key_separators() {
        assert!(matches!(
            exchange_code("   "),
            Err(ValidationError::EmptyCode { kind: "exchange" })
        ));
        assert!(matches!(
            symbol_code("ABC/DEF"),
            Err(ValidationError::CodeInvalidChar { ch: '/', index: 3, .. })
        ));
        assert!(symbol_code("AB C").is_err());
    }
}
