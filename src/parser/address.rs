//! Address syntax check.

use std::sync::LazyLock;

use regex::Regex;

/// `bc1` or a leading `1`/`3`, then 25-90 characters from the base-58-like
/// alphabet (no `I`, `O`).
#[allow(clippy::expect_used)]
static ADDRESS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(bc1|[13])[a-zA-HJ-NP-Z0-9]{25,90}$").expect("address regex is valid") // Static pattern, safe to panic
});

/// Returns true when `address` has valid Bitcoin-style syntax.
///
/// Only the shape is checked; no checksum is verified.
///
/// # Examples
///
/// ```
/// use keyscrape_core::is_valid_address;
///
/// assert!(is_valid_address("1BoatSLRHtKNngkdXEeobR76b53LETtpyT"));
/// assert!(!is_valid_address("0xde0B295669a9FD93d5F28D9Ec85E40f4cb697BAe"));
/// ```
#[must_use]
pub fn is_valid_address(address: &str) -> bool {
    ADDRESS_PATTERN.is_match(address)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_legacy_p2sh_and_bech32() {
        for address in [
            "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa",
            "3J98t1WpEZ73CNmQviecrnyiWrnqRhWNLy",
            "bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq",
            "bc1p5d7rjq7g6rdk2yhzks9smlaqtedr4dekq08ge8ztwac72sfr9rusxg3297",
        ] {
            assert!(is_valid_address(address), "{address} should be valid");
        }
    }

    #[test]
    fn test_rejects_wrong_prefix() {
        assert!(!is_valid_address("2A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa"));
        assert!(!is_valid_address("ltc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq"));
    }

    #[test]
    fn test_rejects_excluded_letters() {
        // 'O' and 'I' are outside the alphabet
        assert!(!is_valid_address("1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfOO"));
        assert!(!is_valid_address("1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfII"));
    }

    #[test]
    fn test_rejects_length_out_of_range() {
        // prefix + 24 chars: too short
        assert!(!is_valid_address(&format!("1{}", "a".repeat(24))));
        assert!(is_valid_address(&format!("1{}", "a".repeat(25))));
        assert!(is_valid_address(&format!("1{}", "a".repeat(90))));
        assert!(!is_valid_address(&format!("1{}", "a".repeat(91))));
    }

    #[test]
    fn test_rejects_whitespace_and_empty() {
        assert!(!is_valid_address(""));
        assert!(!is_valid_address(" 1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa"));
        assert!(!is_valid_address("1A1zP1eP5QGefi2DMPTfTL5SLmv7Div fNa"));
    }
}
