//! Normalization of user-supplied query input at the API boundary

use super::fund::is_fund_code;

/// Keywords shorter than this never match anything.
pub const MIN_KEYWORD_CHARS: usize = 2;

/// Strips every non-digit from `input` and accepts the rest only if it is a
/// well-formed fund code.
pub fn sanitize_fund_code(input: &str) -> Option<String> {
    let digits: String = input.chars().filter(char::is_ascii_digit).collect();
    is_fund_code(&digits).then_some(digits)
}

/// Out of range or absent limits fall back to `default` instead of being
/// rejected.
pub fn normalize_limit(requested: Option<i64>, default: usize, max: usize) -> usize {
    match requested {
        Some(n) if n >= 1 && (n as u64) <= max as u64 => n as usize,
        _ => default,
    }
}

pub fn is_searchable_keyword(keyword: &str) -> bool {
    keyword.trim().chars().count() >= MIN_KEYWORD_CHARS
}
