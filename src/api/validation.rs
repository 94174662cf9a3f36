use super::ApiError;
use crate::db::content::is_safe_id;
use crate::domain::UNLIMITED_DURATION;

/// Reads a leading integer the way browsers' form handling expects:
/// leading whitespace and trailing garbage are ignored, `"12h"` is 12.
/// Digit runs beyond `i64` saturate so range checks still reject them.
#[must_use]
pub fn parse_int_prefix(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }

    // Only overflow can fail here: the run is all ASCII digits.
    let value: i64 = digits[..end].parse().unwrap_or(i64::MAX);
    Some(if negative { -value } else { value })
}

/// HTML checkbox semantics: only the literal `"on"` counts as checked.
#[must_use]
pub fn is_checked(value: Option<&str>) -> bool {
    value == Some("on")
}

pub fn validate_article_id(id: &str) -> Result<&str, ApiError> {
    if !is_safe_id(id) {
        return Err(ApiError::validation(format!(
            "Invalid article ID: {id:?}. Use letters, digits, '-' and '_' only"
        )));
    }
    Ok(id)
}

pub fn validate_key_code(code: &str) -> Result<&str, ApiError> {
    let code = code.trim();
    if code.is_empty() {
        return Err(ApiError::validation("Key code cannot be empty"));
    }
    Ok(code)
}

/// Generation duration: missing or non-numeric means unlimited.
#[must_use]
pub fn key_duration(raw: Option<&str>) -> i64 {
    raw.and_then(parse_int_prefix).unwrap_or(UNLIMITED_DURATION)
}

/// Generation count: missing, zero or non-numeric means one.
pub fn key_count(raw: Option<&str>) -> Result<usize, ApiError> {
    match raw.and_then(parse_int_prefix) {
        None | Some(0) => Ok(1),
        Some(n) => usize::try_from(n)
            .map_err(|_| ApiError::validation(format!("Invalid key count: {n}"))),
    }
}

/// Integer form field where a missing, zero or non-numeric value means `default`.
#[must_use]
pub fn int_or_default(raw: Option<&str>, default: i64) -> i64 {
    match raw.and_then(parse_int_prefix) {
        None | Some(0) => default,
        Some(n) => n,
    }
}
