use crate::greeks::{deserialize_greek, deserialize_price};
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DefaultOnNull, Map};
use std::fmt::{Display, Formatter};
use thiserror::Error;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OptionQuote {
    #[serde(default)]
    pub description: String,
    #[serde(
        rename = "strikePrice",
        alias = "strike",
        default,
        deserialize_with = "deserialize_price"
    )]
    pub strike: Decimal,
    #[serde(default, deserialize_with = "deserialize_price")]
    pub bid: Decimal,
    #[serde(default, deserialize_with = "deserialize_price")]
    pub ask: Decimal,
    #[serde(default, deserialize_with = "deserialize_price")]
    pub last: Decimal,
    #[serde(default, deserialize_with = "deserialize_greek")]
    pub delta: Option<Decimal>,
    #[serde(default, deserialize_with = "deserialize_greek")]
    pub gamma: Option<Decimal>,
    #[serde(default, deserialize_with = "deserialize_greek")]
    pub theta: Option<Decimal>,
}

/// Strikes of one expiration, in the order the upstream chain listed them.
/// Each strike key maps to a one-element list holding the contract.
pub type StrikeLadder = Vec<(String, Vec<OptionQuote>)>;

/// Expiration key (`"<date>:<days>"`) to strike ladder, preserving document order.
#[serde_as]
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct ExpirationChain {
    #[serde_as(as = "Map<_, Map<_, _>>")]
    entries: Vec<(String, StrikeLadder)>,
}

impl ExpirationChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a contract, appending new expirations and strikes after the existing ones.
    pub fn insert(&mut self, expiration: &str, strike: &str, quote: OptionQuote) {
        let position = match self.entries.iter().position(|(key, _)| key == expiration) {
            Some(position) => position,
            None => {
                self.entries.push((expiration.to_string(), Vec::new()));
                self.entries.len() - 1
            }
        };
        let ladder = &mut self.entries[position].1;
        match ladder.iter_mut().find(|(key, _)| key == strike) {
            Some((_, quotes)) => *quotes = vec![quote],
            None => ladder.push((strike.to_string(), vec![quote])),
        }
    }

    pub fn expiration(&self, key: &str) -> Option<&StrikeLadder> {
        self.entries
            .iter()
            .find(|(expiration, _)| expiration == key)
            .map(|(_, ladder)| ladder)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &StrikeLadder)> {
        self.entries
            .iter()
            .map(|(expiration, ladder)| (expiration.as_str(), ladder))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(expiration, _)| expiration.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contract_count(&self) -> usize {
        self.entries.iter().map(|(_, ladder)| ladder.len()).sum()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UnderlyingQuote {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default, deserialize_with = "deserialize_price")]
    pub last: Decimal,
    #[serde(default, deserialize_with = "deserialize_price")]
    pub bid: Decimal,
    #[serde(default, deserialize_with = "deserialize_price")]
    pub ask: Decimal,
}

/// Option chain payload as delivered by the market-data collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OptionChain {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub underlying: Option<UnderlyingQuote>,
    #[serde(default)]
    pub call_exp_date_map: ExpirationChain,
    #[serde(default)]
    pub put_exp_date_map: ExpirationChain,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StrangleCandidate {
    pub symbol: String,
    pub underlying_last: Decimal,
    pub net_delta: Decimal,
    pub net_gamma: Decimal,
    pub net_theta: Decimal,
    pub call_expiration: String,
    pub call_strike: Decimal,
    pub put_expiration: String,
    pub put_strike: Decimal,
    pub days_to_expiration: i64,
    pub buying_power_effect: Decimal,
    pub theta_power: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SymbolScan {
    pub symbol: String,
    pub candidates: Vec<StrangleCandidate>,
}

impl SymbolScan {
    pub fn best(&self) -> Option<&StrangleCandidate> {
        self.candidates.first()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Buy,
    Sell,
    Waiting,
}

impl Display for Direction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Buy => write!(f, "BUY"),
            Direction::Sell => write!(f, "SELL"),
            Direction::Waiting => write!(f, "WAITING"),
        }
    }
}

/// What the previous repricing cycle placed, round-tripped by the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PriceDecisionState {
    pub placed_price: Option<Decimal>,
    pub bid: Option<Decimal>,
    pub ask: Option<Decimal>,
}

impl PriceDecisionState {
    pub fn after(decision: &PriceDecision, bid: Decimal, ask: Decimal) -> Self {
        Self {
            placed_price: Some(decision.limit_price),
            bid: Some(bid),
            ask: Some(ask),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceDecision {
    pub limit_price: Decimal,
    pub midpoint: Decimal,
    pub worst_possible_price: Option<Decimal>,
}

#[serde_as]
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuoteSnapshot {
    pub symbol: String,
    #[serde(rename = "bidPrice", alias = "bid", default)]
    #[serde_as(as = "DefaultOnNull")]
    pub bid: Decimal,
    #[serde(rename = "askPrice", alias = "ask", default)]
    #[serde_as(as = "DefaultOnNull")]
    pub ask: Decimal,
    #[serde(rename = "lastPrice", alias = "last", default)]
    #[serde_as(as = "DefaultOnNull")]
    pub last: Decimal,
}

/// Exclusive bounds on the net greeks of a strangle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ScanThresholds {
    pub min_delta: Decimal,
    pub max_delta: Decimal,
    pub min_gamma: Decimal,
    pub max_gamma: Decimal,
}

impl ScanThresholds {
    pub fn validate(&self) -> Result<(), ScanError> {
        if self.min_delta >= self.max_delta {
            return Err(ScanError::InvalidThresholds(format!(
                "delta window ({}, {}) is empty",
                self.min_delta, self.max_delta
            )));
        }
        if self.min_gamma >= self.max_gamma {
            return Err(ScanError::InvalidThresholds(format!(
                "gamma window ({}, {}) is empty",
                self.min_gamma, self.max_gamma
            )));
        }
        Ok(())
    }

    pub fn admits(&self, net_delta: Decimal, net_gamma: Decimal) -> bool {
        net_delta > self.min_delta
            && net_delta < self.max_delta
            && net_gamma > self.min_gamma
            && net_gamma < self.max_gamma
    }
}

impl Default for ScanThresholds {
    fn default() -> Self {
        Self {
            min_delta: Decimal::new(-5, 2),
            max_delta: Decimal::new(4, 2),
            min_gamma: Decimal::new(-5, 2),
            max_gamma: Decimal::new(5, 2),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScanLimits {
    pub max_expirations: usize,
    pub min_days: i64,
    pub max_days: i64,
}

impl ScanLimits {
    pub fn validate(&self) -> Result<(), ScanError> {
        if self.min_days >= self.max_days {
            return Err(ScanError::InvalidThresholds(format!(
                "days window ({}, {}) is empty",
                self.min_days, self.max_days
            )));
        }
        Ok(())
    }

    pub fn admits_days(&self, days: i64) -> bool {
        days > self.min_days && days < self.max_days
    }
}

impl Default for ScanLimits {
    fn default() -> Self {
        Self {
            max_expirations: 25,
            min_days: 40,
            max_days: 200,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChainParseError {
    #[error("expiration key has no ':' delimiter: {0}")]
    MissingDelimiter(String),
    #[error("invalid days-to-expiration in key: {0}")]
    InvalidDays(String),
    #[error("invalid strike: {0}")]
    InvalidStrike(String),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScanError {
    #[error("underlying last price must be positive, got {0}")]
    InvalidUnderlying(Decimal),
    #[error("invalid scan thresholds: {0}")]
    InvalidThresholds(String),
}
