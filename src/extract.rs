//! Verification code extraction from notification bodies.
//!
//! A code is a standalone run of 4 to 6 ASCII digits: the run must not be
//! preceded or followed by another digit. Longer runs (phone numbers,
//! order IDs) are rejected whole, never partially matched.
//!
//! # Example
//!
//! ```
//! use codemsg::extract::extract_code;
//!
//! assert_eq!(extract_code("Your code is 482913, valid 10 min"), "482913");
//! assert_eq!(extract_code("id 12345678 code 4321"), "4321");
//! assert_eq!(extract_code("9999 8888"), "9999,8888");
//! ```

use crate::constants::{CODE_MAX_DIGITS, CODE_MIN_DIGITS, CODE_SEPARATOR};

/// Find every standalone 4-6 digit run in `text`, in order of appearance.
///
/// Duplicates are kept. Slices borrow from `text`.
pub fn find_codes(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut codes = Vec::new();

    // ASCII digits never occur inside a multi-byte UTF-8 sequence, so run
    // boundaries found on bytes are always char boundaries.
    let mut i = 0;
    while i < bytes.len() {
        if !bytes[i].is_ascii_digit() {
            i += 1;
            continue;
        }

        let start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }

        let len = i - start;
        if (CODE_MIN_DIGITS..=CODE_MAX_DIGITS).contains(&len) {
            codes.push(&text[start..i]);
        }
    }

    codes
}

/// Extract the comma-joined code string from a message body.
///
/// Returns an empty string when the body holds no standalone 4-6 digit run.
pub fn extract_code(text: &str) -> String {
    find_codes(text).join(CODE_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_code_in_sentence() {
        assert_eq!(extract_code("code 1234 ok"), "1234");
    }

    #[test]
    fn test_long_run_excluded_short_run_kept() {
        assert_eq!(extract_code("id 12345678 code 4321"), "4321");
    }

    #[test]
    fn test_three_digit_run_ignored() {
        assert_eq!(extract_code("123 and 45678"), "45678");
        assert_eq!(extract_code("pin 123"), "");
    }

    #[test]
    fn test_order_and_duplicates_preserved() {
        assert_eq!(extract_code("9999 8888"), "9999,8888");
        assert_eq!(extract_code("1111 then 1111"), "1111,1111");
        assert_eq!(extract_code("b 222222 a 33333"), "222222,33333");
    }

    #[test]
    fn test_empty_and_digitless_input() {
        assert_eq!(extract_code(""), "");
        assert_eq!(extract_code("Hello, no code here"), "");
        assert_eq!(extract_code(crate::constants::DEFAULT_MESSAGE), "");
    }

    #[test]
    fn test_exact_lengths_as_whole_message() {
        assert_eq!(extract_code("1234"), "1234");
        assert_eq!(extract_code("12345"), "12345");
        assert_eq!(extract_code("123456"), "123456");
    }

    #[test]
    fn test_seven_digits_never_partially_match() {
        assert_eq!(extract_code("1234567"), "");
        assert_eq!(extract_code("call 13800138000 now"), "");
    }

    #[test]
    fn test_digits_adjacent_to_letters_and_punctuation() {
        assert_eq!(extract_code("abc1234def"), "1234");
        assert_eq!(extract_code("[4821]"), "4821");
        assert_eq!(extract_code("12.3456"), "3456");
    }

    #[test]
    fn test_multibyte_text_around_code() {
        assert_eq!(extract_code("【银行】验证码：739201，5分钟内有效"), "739201");
    }

    #[test]
    fn test_non_ascii_digits_are_not_digits() {
        // Full-width digits do not form or extend a run.
        assert_eq!(extract_code("１２３４"), "");
        assert_eq!(extract_code("１2345"), "2345");
    }

    #[test]
    fn test_find_codes_borrows_slices() {
        let text = "a 0042 b 7777";
        assert_eq!(find_codes(text), vec!["0042", "7777"]);
    }
}
