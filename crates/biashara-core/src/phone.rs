//! # Phone Normalization
//!
//! Canonicalizes customer phone numbers before they are submitted to the
//! mobile-money gateway.
//!
//! ## Canonical Format
//! The gateway accepts exactly one format: `254XXXXXXXXX` (country code,
//! no plus sign). Customers enter numbers in several local conventions:
//!
//! ```text
//! 0712345678     →  254712345678   (leading local zero)
//! +254712345678  →  254712345678   (international with plus)
//! 254712345678   →  254712345678   (already canonical)
//! 712345678      →  254712345678   (bare national number)
//! ```

use crate::error::ValidationError;

/// Country calling code used as the canonical prefix.
const COUNTRY_CODE: &str = "254";

/// Canonical phone length: "254" plus a nine-digit subscriber number.
const CANONICAL_LEN: usize = 12;

/// Normalizes a phone number to the canonical `254…` format.
///
/// ## Rules
/// - Whitespace and a leading `+` are stripped
/// - A leading `0` is replaced with the country code
/// - A bare national number gets the country code prepended
/// - The result must be exactly 12 digits
///
/// ## Example
/// ```rust
/// use biashara_core::phone::normalize_phone;
///
/// assert_eq!(normalize_phone("0712345678").unwrap(), "254712345678");
/// assert_eq!(normalize_phone("+254 712 345 678").unwrap(), "254712345678");
/// assert!(normalize_phone("").is_err());
/// ```
pub fn normalize_phone(phone: &str) -> Result<String, ValidationError> {
    let cleaned: String = phone
        .trim()
        .trim_start_matches('+')
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    if cleaned.is_empty() {
        return Err(ValidationError::Required {
            field: "phone".to_string(),
        });
    }

    if !cleaned.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "must contain only digits".to_string(),
        });
    }

    let canonical = if let Some(rest) = cleaned.strip_prefix('0') {
        format!("{COUNTRY_CODE}{rest}")
    } else if cleaned.starts_with(COUNTRY_CODE) {
        cleaned
    } else {
        format!("{COUNTRY_CODE}{cleaned}")
    };

    if canonical.len() != CANONICAL_LEN {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: format!("expected {CANONICAL_LEN} digits, got {}", canonical.len()),
        });
    }

    Ok(canonical)
}

// =============================================================================
// Unit Tests
// =============================================================================
