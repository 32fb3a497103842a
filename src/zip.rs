// 📮 Code Normalization - ZIP, FIPS and industry prefixes
// ZIP and FIPS codes are fixed-width strings; leading zeros matter.

pub const ZIP_WIDTH: usize = 5;
pub const FIPS_WIDTH: usize = 5;
pub const INDUSTRY_PREFIX_WIDTH: usize = 2;

/// Left-pad with '0' up to `width` characters. Longer input is returned unchanged.
pub fn zero_pad(raw: &str, width: usize) -> String {
    let len = raw.chars().count();
    if len >= width {
        return raw.to_string();
    }
    let mut padded = "0".repeat(width - len);
    padded.push_str(raw);
    padded
}

/// Normalize a sponsor ZIP: first 5 characters, then left-pad with zeros.
///
/// Truncation happens BEFORE padding, so ZIP+4 values keep their 5-digit
/// prefix and numeric ZIPs that lost a leading zero get it back:
/// - `"123"` → `"00123"`
/// - `"123456789"` → `"12345"`
/// - `"12345-6789"` → `"12345"`
///
/// Malformed input is passed through best-effort; it just won't resolve.
pub fn normalize_zip(raw: &str) -> String {
    let truncated: String = raw.chars().take(ZIP_WIDTH).collect();
    zero_pad(&truncated, ZIP_WIDTH)
}

/// Normalize a county FIPS code read from a table (pad only).
pub fn normalize_fips(raw: &str) -> String {
    zero_pad(raw.trim(), FIPS_WIDTH)
}

/// True when the value is exactly five ASCII digits
pub fn is_well_formed(code: &str) -> bool {
    code.len() == ZIP_WIDTH && code.bytes().all(|b| b.is_ascii_digit())
}

/// Two-character industry group of a business code.
///
/// Codes shorter than two characters have no group and never match a filter.
pub fn industry_prefix(code: &str) -> Option<&str> {
    let code = code.trim();
    let (end, _) = code.char_indices().nth(INDUSTRY_PREFIX_WIDTH - 1)?;
    let end = end + code[end..].chars().next()?.len_utf8();
    Some(&code[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_zip_pads_short_values() {
        assert_eq!(normalize_zip("123"), "00123");
        assert_eq!(normalize_zip("2134"), "02134");
        assert_eq!(normalize_zip(""), "00000");
    }

    #[test]
    fn test_normalize_zip_truncates_before_padding() {
        assert_eq!(normalize_zip("123456789"), "12345");
        assert_eq!(normalize_zip("12345-6789"), "12345");
        // a 9-digit ZIP+4 that lost its leading zero is NOT repaired
        assert_eq!(normalize_zip("21341234"), "21341");
    }

    #[test]
    fn test_normalize_zip_is_idempotent() {
        for raw in ["10001", "00501", "123", "123456789", "AB1", "9"] {
            let once = normalize_zip(raw);
            assert_eq!(normalize_zip(&once), once, "not idempotent for {raw:?}");
        }
    }

    #[test]
    fn test_malformed_zip_passes_through() {
        let zip = normalize_zip("N/A");
        assert_eq!(zip, "00N/A");
        assert!(!is_well_formed(&zip));
        assert!(is_well_formed("00501"));
    }

    #[test]
    fn test_normalize_fips() {
        assert_eq!(normalize_fips("1001"), "01001");
        assert_eq!(normalize_fips("36061"), "36061");
        assert_eq!(normalize_fips(" 6037 "), "06037");
    }

    #[test]
    fn test_industry_prefix() {
        assert_eq!(industry_prefix("621111"), Some("62"));
        assert_eq!(industry_prefix("11"), Some("11"));
        assert_eq!(industry_prefix(" 236110"), Some("23"));
        assert_eq!(industry_prefix("5"), None);
        assert_eq!(industry_prefix(""), None);
    }
}
