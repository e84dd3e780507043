//! Destination phone number normalization
//!
//! Turns user-entered numbers ("(985) 307-5465", "+1 985 307 5465", ...)
//! into a canonical dial-able `+<digits>` form before anything is sent to
//! the voice platform.

use std::fmt;

use serde::{Serialize, Serializer};

/// Country code assumed for bare ten digit numbers
pub const DEFAULT_COUNTRY_CODE: &str = "1";

/// Shortest digit run accepted without a leading `+`
pub const MIN_DIGITS: usize = 7;

/// Longest digit run accepted without a leading `+`
pub const MAX_DIGITS: usize = 15;

/// A destination number in canonical `+<digits>` form
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedNumber(String);

impl NormalizedNumber {
    /// Normalize using the default country code
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        normalize(raw, DEFAULT_COUNTRY_CODE)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Digits without the leading `+`
    #[must_use]
    pub fn digits(&self) -> &str {
        &self.0[1..]
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for NormalizedNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NormalizedNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for NormalizedNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// Normalize a raw number into `+<digits>` form
///
/// Returns `None` when the input cannot be dialed:
/// - empty input, or a `+` with no digits after it
/// - without `+`, a digit count outside 7..=15
///
/// Ten digit numbers get `default_country_code` prepended; eleven digit
/// numbers starting with `1` are taken to already carry country code 1.
#[must_use]
pub fn normalize(raw: &str, default_country_code: &str) -> Option<NormalizedNumber> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let digits = digits_only(raw);

    if raw.starts_with('+') {
        return (!digits.is_empty()).then(|| NormalizedNumber(format!("+{digits}")));
    }

    let canonical = match digits.len() {
        11 if digits.starts_with('1') => format!("+{digits}"),
        10 => format!("+{default_country_code}{digits}"),
        MIN_DIGITS..=MAX_DIGITS => format!("+{digits}"),
        _ => return None,
    };

    Some(NormalizedNumber(canonical))
}

/// Keep only the characters a user may type into a number field
///
/// Digits and `+` survive; everything else (spaces, dashes, parentheses,
/// letters) is dropped.
#[must_use]
pub fn sanitize_input(input: &str) -> String {
    input
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect()
}

fn digits_only(input: &str) -> String {
    input.chars().filter(char::is_ascii_digit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(raw: &str) -> Option<String> {
        NormalizedNumber::parse(raw).map(NormalizedNumber::into_string)
    }

    #[test]
    fn formatted_number_with_plus() {
        assert_eq!(norm("+1 (985) 307-5465").as_deref(), Some("+19853075465"));
    }

    #[test]
    fn ten_digits_get_default_country_code() {
        assert_eq!(norm("9853075465").as_deref(), Some("+19853075465"));
        assert_eq!(norm("(985) 307-5465").as_deref(), Some("+19853075465"));
    }

    #[test]
    fn ten_digits_use_configured_country_code() {
        let n = normalize("2071234567", "44").unwrap();
        assert_eq!(n.as_str(), "+442071234567");
    }

    #[test]
    fn eleven_digits_starting_with_one() {
        assert_eq!(norm("19853075465").as_deref(), Some("+19853075465"));
        assert_eq!(norm("1-985-307-5465").as_deref(), Some("+19853075465"));
    }

    #[test]
    fn eleven_digits_not_starting_with_one_pass_through() {
        assert_eq!(norm("44207123456").as_deref(), Some("+44207123456"));
    }

    #[test]
    fn digit_count_bounds() {
        assert_eq!(norm("1234567").as_deref(), Some("+1234567"));
        assert_eq!(norm("123456789012345").as_deref(), Some("+123456789012345"));
        assert_eq!(norm("123456"), None);
        assert_eq!(norm("1234567890123456"), None);
    }

    #[test]
    fn too_short() {
        assert_eq!(norm("123"), None);
    }

    #[test]
    fn empty_and_whitespace() {
        assert_eq!(norm(""), None);
        assert_eq!(norm("   "), None);
    }

    #[test]
    fn bare_plus_is_invalid() {
        assert_eq!(norm("+"), None);
        assert_eq!(norm("  + ( ) - "), None);
    }

    #[test]
    fn plus_path_has_no_length_bounds() {
        assert_eq!(norm("+12").as_deref(), Some("+12"));
    }

    #[test]
    fn letters_are_ignored() {
        assert_eq!(norm("call 985 307 5465 now").as_deref(), Some("+19853075465"));
    }

    #[test]
    fn normalization_is_idempotent() {
        for raw in [
            "+1 (985) 307-5465",
            "9853075465",
            "19853075465",
            "1234567",
            "+44 20 7123 4567",
            "123456789012345",
        ] {
            let once = NormalizedNumber::parse(raw).unwrap();
            let twice = NormalizedNumber::parse(once.as_str()).unwrap();
            assert_eq!(once, twice, "not idempotent for {raw}");
        }
    }

    #[test]
    fn digits_accessor_strips_plus() {
        let n = NormalizedNumber::parse("9853075465").unwrap();
        assert_eq!(n.digits(), "19853075465");
    }

    #[test]
    fn serializes_as_plain_string() {
        let n = NormalizedNumber::parse("9853075465").unwrap();
        assert_eq!(serde_json::to_string(&n).unwrap(), "\"+19853075465\"");
    }

    #[test]
    fn sanitize_keeps_digits_and_plus() {
        assert_eq!(sanitize_input("+1 (985) 307-5465"), "+19853075465");
        assert_eq!(sanitize_input("abc"), "");
        assert_eq!(sanitize_input("12+34"), "12+34");
    }
}
