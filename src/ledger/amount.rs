use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

use crate::error::AmountError;

/// Hex amounts wider than this do not fit the 96-bit decimal mantissa
const MAX_HEX_DIGITS: usize = 24;

/// The closed set of shapes a reward amount arrives in
#[derive(Debug, Clone, PartialEq)]
pub enum AmountValue {
    /// `0x`-prefixed base-16 integer
    Hex(String),
    /// Base-10 digits, optionally with a fractional part
    Decimal(String),
    /// A native JSON number
    Number(serde_json::Number),
    /// Field missing or null
    Absent,
}

impl AmountValue {
    /// Classify a JSON field. Booleans, arrays and objects are not amounts.
    pub fn from_json(value: Option<&Value>) -> Result<Self, AmountError> {
        match value {
            None | Some(Value::Null) => Ok(AmountValue::Absent),
            Some(Value::String(s)) if s.starts_with("0x") => Ok(AmountValue::Hex(s.clone())),
            Some(Value::String(s)) => Ok(AmountValue::Decimal(s.clone())),
            Some(Value::Number(n)) => Ok(AmountValue::Number(n.clone())),
            Some(other) => Err(AmountError::NotANumber {
                raw: other.to_string(),
            }),
        }
    }
}

/// Normalize any accepted amount shape into a non-negative decimal.
///
/// Absent amounts are zero. A malformed string is reported as `NotANumber`
/// rather than propagated as a sentinel.
pub fn normalize_amount(value: &AmountValue) -> Result<Decimal, AmountError> {
    match value {
        AmountValue::Absent => Ok(Decimal::ZERO),
        AmountValue::Hex(raw) => parse_hex(raw),
        AmountValue::Decimal(raw) => parse_decimal(raw),
        AmountValue::Number(n) => parse_number(n),
    }
}

fn parse_hex(raw: &str) -> Result<Decimal, AmountError> {
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(AmountError::NotANumber {
            raw: raw.to_string(),
        });
    }

    let significant = digits.trim_start_matches('0');
    if significant.len() > MAX_HEX_DIGITS {
        return Err(AmountError::OutOfRange {
            raw: raw.to_string(),
        });
    }
    if significant.is_empty() {
        return Ok(Decimal::ZERO);
    }

    let value = u128::from_str_radix(significant, 16).map_err(|_| AmountError::NotANumber {
        raw: raw.to_string(),
    })?;
    Decimal::from_str(&value.to_string()).map_err(|_| AmountError::OutOfRange {
        raw: raw.to_string(),
    })
}

fn parse_decimal(raw: &str) -> Result<Decimal, AmountError> {
    let trimmed = raw.trim();
    if trimmed.starts_with('-') {
        return Err(AmountError::Negative {
            raw: raw.to_string(),
        });
    }

    let (whole, fraction) = match trimmed.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (trimmed, None),
    };
    let digits = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
    let well_formed = digits(whole) && fraction.map_or(true, digits);
    if !well_formed {
        return Err(AmountError::NotANumber {
            raw: raw.to_string(),
        });
    }

    Decimal::from_str(trimmed)
        .map(|d| d.normalize())
        .map_err(|_| AmountError::OutOfRange {
            raw: raw.to_string(),
        })
}

fn parse_number(n: &serde_json::Number) -> Result<Decimal, AmountError> {
    if let Some(v) = n.as_u64() {
        return Ok(Decimal::from(v));
    }
    if n.as_i64().is_some() {
        return Err(AmountError::Negative { raw: n.to_string() });
    }

    let v = n.as_f64().ok_or_else(|| AmountError::NotANumber { raw: n.to_string() })?;
    if v < 0.0 {
        return Err(AmountError::Negative { raw: n.to_string() });
    }
    Decimal::try_from(v)
        .map(|d| d.normalize())
        .map_err(|_| AmountError::OutOfRange { raw: n.to_string() })
}
