//! Currency cleaning: canonical digit-only strings for currency-bearing cells.

use crate::schema::SENTINEL;

/// Strip a currency-like string ("1,234,000원") down to its digits.
///
/// Pure and total: any input yields a value, never an error.
///
/// * trimmed input equal to `""`, `"없음"`, or `"N/A"` → `"0"`
/// * otherwise every non-digit character is stripped (full-width digits
///   count as digits and come out ASCII); an empty remainder
///   (e.g. `"해당없음"`) also yields `"0"`
///
/// No leading-zero normalisation and no thousands-separator reinsertion: the
/// sink receives exactly the digits that were on the page. Idempotent for
/// digit-only input, so re-cleaning already-clean cells is harmless.
pub fn clean_currency(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed == "없음" || trimmed == SENTINEL {
        return "0".to_string();
    }

    let digits: String = value.chars().filter_map(ascii_digit).collect();
    if digits.is_empty() {
        "0".to_string()
    } else {
        digits
    }
}

/// Keep ASCII digits; map full-width digits (U+FF10–U+FF19), which OCR of
/// Korean forms occasionally emits, onto their ASCII counterparts.
fn ascii_digit(c: char) -> Option<char> {
    match c {
        '0'..='9' => Some(c),
        '０'..='９' => char::from_u32('0' as u32 + (c as u32 - '０' as u32)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_separators_and_currency_marks() {
        assert_eq!(clean_currency("1,234,000원"), "1234000");
        assert_eq!(clean_currency("₩ 500,000"), "500000");
        assert_eq!(clean_currency("1 000 000"), "1000000");
    }

    #[test]
    fn sentinel_inputs_yield_zero() {
        assert_eq!(clean_currency(""), "0");
        assert_eq!(clean_currency("   "), "0");
        assert_eq!(clean_currency("없음"), "0");
        assert_eq!(clean_currency("N/A"), "0");
        assert_eq!(clean_currency("  N/A  "), "0");
    }

    #[test]
    fn full_width_digits_are_kept_as_ascii() {
        assert_eq!(clean_currency("１２３"), "123");
        assert_eq!(clean_currency("１,234,000원"), "1234000");
    }

    #[test]
    fn digit_free_input_yields_zero() {
        assert_eq!(clean_currency("해당없음"), "0");
        assert_eq!(clean_currency("-"), "0");
    }

    #[test]
    fn leading_zeros_are_preserved() {
        assert_eq!(clean_currency("0012"), "0012");
    }

    #[test]
    fn idempotent_on_its_own_output() {
        for input in ["1,234,000원", "없음", "해당없음", "42"] {
            let once = clean_currency(input);
            assert_eq!(clean_currency(&once), once, "input: {input}");
        }
    }
}
