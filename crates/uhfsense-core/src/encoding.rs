//! Hex encoding helpers.
//!
//! Tag identifiers, memory contents and serial commands are exchanged as
//! uppercase hex strings at every presentation boundary.

use crate::{Error, Result};

/// Encode bytes as an uppercase hex string without separators.
///
/// # Examples
///
/// ```
/// use uhfsense_core::encoding::to_hex;
///
/// assert_eq!(to_hex(&[0x12, 0x34, 0xab]), "1234AB");
/// assert_eq!(to_hex(&[]), "");
/// ```
pub fn to_hex(bytes: &[u8]) -> String {
    hex::encode_upper(bytes)
}

/// Decode a hex string into bytes.
///
/// Whitespace anywhere in the input is ignored so that spaced dumps such as
/// `"FF FF B6 24"` are accepted. Case does not matter.
///
/// # Errors
///
/// Returns [`Error::InvalidHex`] if the input has an odd number of digits or
/// contains a non-hex character.
///
/// # Examples
///
/// ```
/// use uhfsense_core::encoding::parse_hex;
///
/// assert_eq!(parse_hex("ff fe").unwrap(), vec![0xFF, 0xFE]);
/// assert!(parse_hex("abc").is_err());
/// ```
pub fn parse_hex(input: &str) -> Result<Vec<u8>> {
    let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    hex::decode(&compact).map_err(|e| Error::InvalidHex(format!("{input:?}: {e}")))
}

/// Compare two hex strings ignoring case and whitespace.
pub fn hex_eq_ignore_case(a: &str, b: &str) -> bool {
    let strip = |s: &str| -> String { s.chars().filter(|c| !c.is_whitespace()).collect() };
    strip(a).eq_ignore_ascii_case(&strip(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("12345678", vec![0x12, 0x34, 0x56, 0x78])]
    #[case("FFFFB6240000FEFE", vec![0xFF, 0xFF, 0xB6, 0x24, 0x00, 0x00, 0xFE, 0xFE])]
    #[case(" e2 00 ", vec![0xE2, 0x00])]
    #[case("", vec![])]
    fn test_parse_hex_valid(#[case] input: &str, #[case] expected: Vec<u8>) {
        assert_eq!(parse_hex(input).unwrap(), expected);
    }

    #[rstest]
    #[case("123")] // odd length
    #[case("zz")] // non-hex
    fn test_parse_hex_invalid(#[case] input: &str) {
        assert!(matches!(parse_hex(input), Err(Error::InvalidHex(_))));
    }

    #[test]
    fn test_hex_eq_ignore_case() {
        assert!(hex_eq_ignore_case("abcdef01", "ABCDEF01"));
        assert!(hex_eq_ignore_case("AB CD", "abcd"));
        assert!(!hex_eq_ignore_case("1234", "12345678"));
    }
}
