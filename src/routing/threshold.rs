//! Adaptive similarity threshold and search limit normalization.

use serde_json::Value;

/// Threshold used when neither rule below applies.
pub const DEFAULT_THRESHOLD: f64 = 0.65;

/// Threshold for vague queries: favors recall.
pub const BROAD_THRESHOLD: f64 = 0.5;

/// Threshold for detailed queries: favors precision.
pub const SPECIFIC_THRESHOLD: f64 = 0.75;

pub const DEFAULT_LIMIT: usize = 10;
pub const MAX_LIMIT: usize = 100;

/// Effective similarity threshold for `query`.
///
/// An explicit value is clamped to [0, 1] and returned as is. Otherwise the
/// default is adjusted by two rules, evaluated in order, each overwriting the
/// running value:
///
/// 1. broad: fewer than 10 chars, or at most 2 words -> [`BROAD_THRESHOLD`]
/// 2. specific: more than 30 chars, or contains "specific" or "exact"
///    -> [`SPECIFIC_THRESHOLD`]
///
/// When both fire the specific rule wins, so "exact" (short, vague) and a
/// long two-word query both end at 0.75.
pub fn derive_threshold(query: &str, explicit: Option<f64>) -> f64 {
    if let Some(value) = explicit.filter(|v| !v.is_nan()) {
        return value.clamp(0.0, 1.0);
    }

    let length = query.chars().count();
    let words = query.split_whitespace().count();

    let mut threshold = DEFAULT_THRESHOLD;

    if length < 10 || words <= 2 {
        threshold = BROAD_THRESHOLD;
    }

    if length > 30 || query.contains("specific") || query.contains("exact") {
        threshold = SPECIFIC_THRESHOLD;
    }

    threshold
}

/// Threshold from a raw request field: numbers are clamped, anything else
/// (absent, null, strings) falls back to [`derive_threshold`].
pub fn effective_threshold(query: &str, raw: Option<&Value>) -> f64 {
    derive_threshold(query, raw.and_then(Value::as_f64))
}

/// Limit from a raw request field: the parsed integer (or
/// [`DEFAULT_LIMIT`] when unparseable) clamped to [1, [`MAX_LIMIT`]].
pub fn effective_limit(raw: Option<&Value>) -> usize {
    let parsed = match raw {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|v| v.min(i64::MAX as u64) as i64))
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Some(Value::String(s)) => parse_int_prefix(s),
        _ => None,
    };

    parsed
        .unwrap_or(DEFAULT_LIMIT as i64)
        .clamp(1, MAX_LIMIT as i64) as usize
}

/// Leading integer of `s` after whitespace ("42abc" -> 42, "abc" -> None).
fn parse_int_prefix(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, s.strip_prefix('+').unwrap_or(s)),
    };

    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }

    // Saturate absurdly long digit strings; the result is clamped anyway.
    let magnitude = digits[..end].parse::<i64>().unwrap_or(i64::MAX);
    Some(sign * magnitude)
}
