use std::sync::LazyLock;

use regex::Regex;

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\+?998)?[0-9]{9}$").expect("phone regex"));

/// Canonicalize a phone number to the `998XXXXXXXXX` national format the SMS
/// gateway and the credential store expect. Accepts `+998...`, `998...`,
/// bare nine-digit subscriber numbers and legacy `8`-prefixed input.
pub fn normalize_phone(phone: &str) -> String {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.starts_with("998") {
        digits
    } else if digits.starts_with('8') {
        format!("998{}", &digits[1..])
    } else if digits.len() == 9 {
        format!("998{}", digits)
    } else {
        digits
    }
}

pub fn is_valid_phone(phone: &str) -> bool {
    let compact: String = phone.chars().filter(|c| !c.is_whitespace()).collect();
    PHONE_RE.is_match(&compact)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_common_inputs() {
        assert_eq!(normalize_phone("+998 90 123 45 67"), "998901234567");
        assert_eq!(normalize_phone("998901234567"), "998901234567");
        assert_eq!(normalize_phone("901234567"), "998901234567");
        assert_eq!(normalize_phone("8901234567"), "998901234567");
    }

    #[test]
    fn validates_format() {
        assert!(is_valid_phone("998901234567"));
        assert!(is_valid_phone("+998901234567"));
        assert!(is_valid_phone("90 123 45 67"));
        assert!(!is_valid_phone("12345"));
        assert!(!is_valid_phone("99890123456789"));
        assert!(!is_valid_phone("99890123456a"));
    }
}
