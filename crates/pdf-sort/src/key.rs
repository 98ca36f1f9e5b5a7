//! Sort key extraction from first-page text

use crate::options::KeyMode;
use crate::types::{NumericKey, SortKey};
use regex::Regex;
use std::sync::LazyLock;

/// Derive the sort key for a document from the text of its first page.
///
/// Without a pattern (or with [`KeyMode::None`]) every document gets the
/// neutral key, so a stable sort keeps the scan order.
pub fn extract_key(first_page_text: &str, pattern: Option<&Regex>, mode: KeyMode) -> SortKey {
    let Some(pattern) = pattern else {
        return SortKey::Neutral;
    };

    match mode {
        KeyMode::None => SortKey::Neutral,
        KeyMode::RawText => SortKey::Text(
            pattern
                .find(first_page_text)
                .map(|m| m.as_str().to_string())
                .unwrap_or_default(),
        ),
        KeyMode::Numeric => match pattern.find(first_page_text) {
            Some(m) => first_digit_run(m.as_str())
                .map(ascii_digits)
                .and_then(|digits| NumericKey::from_digits(&digits))
                .map(SortKey::Number)
                .unwrap_or(SortKey::Missing),
            None => SortKey::Missing,
        },
    }
}

static DIGIT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("valid digit run regex"));

static DECIMAL_DIGIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d$").expect("valid decimal digit regex"));

/// First maximal run of decimal digits in `text`, in any script.
///
/// Later runs are ignored: "Room12-Floor3" yields "12".
pub fn first_digit_run(text: &str) -> Option<&str> {
    DIGIT_RUN.find(text).map(|m| m.as_str())
}

/// Rewrite a digit run with ASCII digits: "٤٢" and "４２" both become "42"
fn ascii_digits(run: &str) -> String {
    run.chars().map(ascii_digit).collect()
}

fn is_decimal_digit(c: char) -> bool {
    let mut buf = [0u8; 4];
    DECIMAL_DIGIT.is_match(c.encode_utf8(&mut buf))
}

fn ascii_digit(c: char) -> char {
    if c.is_ascii_digit() {
        return c;
    }
    // Decimal digits are encoded in contiguous runs of ten, zero first
    let mut start = u32::from(c);
    while let Some(prev) = start.checked_sub(1).and_then(char::from_u32) {
        if !is_decimal_digit(prev) {
            break;
        }
        start -= 1;
    }
    let value = (u32::from(c) - start) % 10;
    char::from_digit(value, 10).unwrap_or('0')
}
