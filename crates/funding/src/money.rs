//! Amount handling. Amounts are integer minor units (cents), never floats.

use serde_json::Value;

/// Parse a decimal money string ("25", "25.5", "-10.05") into cents.
///
/// Integer math only, at most two decimal places. Returns `None` for anything
/// else.
pub fn parse_money_string(input: &str) -> Option<i64> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let (whole, frac) = match digits.split_once('.') {
        Some((w, f)) => (w, f),
        None => (digits, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return None;
    }
    if frac.len() > 2
        || !whole.chars().all(|c| c.is_ascii_digit())
        || !frac.chars().all(|c| c.is_ascii_digit())
    {
        return None;
    }
    let whole_val: i64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let frac_val: i64 = match frac.len() {
        0 => 0,
        1 => frac.parse::<i64>().ok()? * 10,
        _ => frac.parse().ok()?,
    };
    let cents = whole_val.checked_mul(100)?.checked_add(frac_val)?;
    Some(if negative { -cents } else { cents })
}

/// Read an amount from a JSON value: numbers are rounded to the nearest cent,
/// strings go through [`parse_money_string`]. Null, missing or anything else
/// yields `None`.
pub fn amount_from_json(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return i.checked_mul(100);
            }
            let f = n.as_f64()?;
            if !f.is_finite() {
                return None;
            }
            Some((f * 100.0).round() as i64)
        }
        Value::String(s) => parse_money_string(s),
        _ => None,
    }
}

/// Render cents as `D.CC` (`-D.CC` for negatives).
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}
