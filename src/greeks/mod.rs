//! Greek parsing and usability checks for option quotes.
//!
//! Upstream chains report missing greeks as `null`, omit the field, or
//! send sentinel strings such as `"NaN"` and `"N/A"`. All of those parse
//! to `None`, and a quote is usable only when delta, gamma and theta are
//! all present and non-zero.

use crate::model::OptionQuote;
use rust_decimal::prelude::*;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

const SENTINELS: [&str; 2] = ["n/a", "nan"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsableGreeks {
    pub delta: Decimal,
    pub gamma: Decimal,
    pub theta: Decimal,
}

pub fn is_sentinel(raw: &str) -> bool {
    let lowered = raw.trim().to_ascii_lowercase();
    SENTINELS.contains(&lowered.as_str())
}

pub fn parse_greek(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(number) => parse_numeric(&number.to_string()),
        Value::String(raw) if is_sentinel(raw) => None,
        Value::String(raw) => parse_numeric(raw.trim()),
        _ => None,
    }
}

fn parse_numeric(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}

/// Serde hook for greek fields; never fails on odd payloads.
pub fn deserialize_greek<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<Value> = Option::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(parse_greek))
}

/// Prices go through the same parser; anything unreadable reads as zero so
/// one bad contract cannot fail the whole chain.
pub fn deserialize_price<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(deserialize_greek(deserializer)?.unwrap_or_default())
}

pub fn usable_greeks(quote: &OptionQuote) -> Option<UsableGreeks> {
    let present = |greek: Option<Decimal>| greek.filter(|value| !value.is_zero());
    Some(UsableGreeks {
        delta: present(quote.delta)?,
        gamma: present(quote.gamma)?,
        theta: present(quote.theta)?,
    })
}

pub fn is_usable(quote: &OptionQuote) -> bool {
    usable_greeks(quote).is_some()
}
