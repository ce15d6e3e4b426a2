//! Field-level normalization and shape checks.
//!
//! Pure functions; no I/O and no store access.

use once_cell::sync::Lazy;
use regex::Regex;

const PHONE_MIN_DIGITS: usize = 7;
const PHONE_MAX_DIGITS: usize = 15;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[a-zA-Z0-9]{2,}$").expect("valid email regex")
});

/// Reduces a phone string to its digits.
///
/// `"(555) 123-4567"` becomes `"5551234567"`.
pub fn normalize_phone(raw: &str) -> String {
    raw.trim().chars().filter(char::is_ascii_digit).collect()
}

/// Returns whether a normalized phone has an accepted digit count.
pub fn is_valid_phone(normalized: &str) -> bool {
    normalized.chars().all(|ch| ch.is_ascii_digit())
        && (PHONE_MIN_DIGITS..=PHONE_MAX_DIGITS).contains(&normalized.len())
}

/// Returns whether `email` matches the basic `local@domain.tld` shape.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email.trim())
}

#[cfg(test)]
mod tests {
    use super::{is_valid_email, is_valid_phone, normalize_phone};

    #[test]
    fn phone_keeps_digits_only() {
        assert_eq!(normalize_phone("(555) 123-4567"), "5551234567");
        assert_eq!(normalize_phone(" +1 555.111.2222 "), "15551112222");
        assert_eq!(normalize_phone(""), "");
    }

    #[test]
    fn phone_length_bounds() {
        assert!(is_valid_phone("5551111"));
        assert!(!is_valid_phone("555111"));
        assert!(!is_valid_phone("1234567890123456"));
    }

    #[test]
    fn email_shape() {
        assert!(is_valid_email("jon@example.com"));
        assert!(!is_valid_email("jon@example"));
        assert!(!is_valid_email("jon smith@example.com"));
        assert!(!is_valid_email("example.com"));
    }
}
