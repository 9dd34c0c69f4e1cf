use crate::greeks::is_usable;
use crate::model::{ChainParseError, OptionChain, OptionQuote, StrikeLadder};
use chrono::NaiveDate;
use rust_decimal::prelude::*;
use std::str::FromStr;
use tracing::warn;

/// Parsed form of an expiration key such as `2021-03-19:45`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpirationKey {
    pub raw: String,
    pub date: Option<NaiveDate>,
    pub days: i64,
}

impl FromStr for ExpirationKey {
    type Err = ChainParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (date_part, days_part) = s
            .split_once(':')
            .ok_or_else(|| ChainParseError::MissingDelimiter(s.to_string()))?;
        let days = days_part
            .trim()
            .parse::<i64>()
            .map_err(|_| ChainParseError::InvalidDays(s.to_string()))?;
        let date = NaiveDate::parse_from_str(date_part.trim(), "%Y-%m-%d").ok();
        Ok(Self {
            raw: s.to_string(),
            date,
            days,
        })
    }
}

pub fn parse_strike(key: &str) -> Result<Decimal, ChainParseError> {
    Decimal::from_str(key.trim()).map_err(|_| ChainParseError::InvalidStrike(key.to_string()))
}

/// Underlying symbol is the description text up to its first space.
pub fn symbol_from_description(description: &str) -> &str {
    description
        .split_once(' ')
        .map(|(symbol, _)| symbol)
        .unwrap_or(description)
}

/// Parses strike keys of a ladder, dropping (and logging) the ones that fail.
pub fn parse_ladder<'a>(expiration: &str, ladder: &'a StrikeLadder) -> Vec<(Decimal, &'a OptionQuote)> {
    ladder
        .iter()
        .filter_map(|(key, quotes)| {
            let strike = match parse_strike(key) {
                Ok(strike) => strike,
                Err(err) => {
                    warn!(target: "scan.skip", expiration, error = %err, "skipping strike");
                    return None;
                }
            };
            quotes.first().map(|quote| (strike, quote))
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChainStats {
    pub call_expirations: usize,
    pub put_expirations: usize,
    pub call_contracts: usize,
    pub put_contracts: usize,
    pub unusable_quotes: usize,
}

pub fn stats(chain: &OptionChain) -> ChainStats {
    let unusable = |ladder: &StrikeLadder| {
        ladder
            .iter()
            .filter_map(|(_, quotes)| quotes.first())
            .filter(|quote| !is_usable(quote))
            .count()
    };
    let unusable_quotes = chain
        .call_exp_date_map
        .iter()
        .chain(chain.put_exp_date_map.iter())
        .map(|(_, ladder)| unusable(ladder))
        .sum();
    ChainStats {
        call_expirations: chain.call_exp_date_map.len(),
        put_expirations: chain.put_exp_date_map.len(),
        call_contracts: chain.call_exp_date_map.contract_count(),
        put_contracts: chain.put_exp_date_map.contract_count(),
        unusable_quotes,
    }
}
