use once_cell::sync::Lazy;
use regex::Regex;

/// Mainland mobile numbers: 11 digits, 13x-19x prefixes.
static MOBILE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^1[3-9]\d{9}$").expect("mobile number pattern is valid"));

pub fn is_valid_mobile(number: &str) -> bool {
    MOBILE_RE.is_match(number)
}

/// Masked numbers keep their middle digits starred out, e.g. "138****5678".
pub fn is_masked(number: &str) -> bool {
    number.contains('*')
}

/// A step-up code is exactly `expected_len` ASCII digits.
pub fn is_valid_otp_code(code: &str, expected_len: usize) -> bool {
    code.len() == expected_len && code.chars().all(|c| c.is_ascii_digit())
}
