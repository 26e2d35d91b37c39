//! Typed values from raw field tokens.

use super::model::Value;

/// Infer a typed value from a raw field token. Never fails: anything that is
/// not an integer, float, boolean or quoted string is kept verbatim.
pub fn coerce(raw: &str) -> Value {
    if let Some(digits) = raw.strip_suffix('i') {
        if let Some(i) = parse_int_literal(digits) {
            return Value::Integer(i);
        }
    }

    if let Ok(f) = raw.parse::<f64>() {
        return Value::Float(f);
    }

    match raw {
        "t" | "T" | "true" | "True" | "TRUE" => return Value::Boolean(true),
        "f" | "F" | "false" | "False" | "FALSE" => return Value::Boolean(false),
        _ => {}
    }

    if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
        return Value::String(raw[1..raw.len() - 1].to_string());
    }

    Value::String(raw.to_string())
}

/// Parse a signed integer literal with an optional `0x`, `0o` or `0b` prefix.
pub fn parse_int_literal(s: &str) -> Option<i64> {
    let (negative, unsigned) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let (radix, digits) = match unsigned.get(..2) {
        Some("0x") | Some("0X") => (16, &unsigned[2..]),
        Some("0o") | Some("0O") => (8, &unsigned[2..]),
        Some("0b") | Some("0B") => (2, &unsigned[2..]),
        _ => (10, unsigned),
    };

    // from_str_radix would otherwise accept a second sign after the prefix
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }

    let magnitude = u64::from_str_radix(digits, radix).ok()? as i128;
    i64::try_from(if negative { -magnitude } else { magnitude }).ok()
}
