//! Broker account payloads and the lookups the trade bot runs over them.

use crate::model::Direction;
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DefaultOnNull};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccountEnvelope {
    pub securities_account: SecuritiesAccount,
}

#[serde_as]
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SecuritiesAccount {
    pub account_id: String,
    #[serde(default)]
    #[serde_as(as = "DefaultOnNull")]
    pub positions: Vec<Position>,
    #[serde(default)]
    #[serde_as(as = "DefaultOnNull")]
    pub order_strategies: Vec<OrderStrategy>,
    #[serde(default)]
    pub current_balances: Option<Balances>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Balances {
    #[serde(default)]
    pub cash_balance: Option<Decimal>,
    #[serde(default)]
    pub cash_available_for_trading: Option<Decimal>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InstrumentRef {
    pub symbol: String,
    #[serde(default)]
    pub asset_type: Option<String>,
}

impl InstrumentRef {
    pub fn is_equity(&self, symbol: &str) -> bool {
        self.symbol == symbol && self.asset_type.as_deref() == Some("EQUITY")
    }
}

#[serde_as]
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub instrument: InstrumentRef,
    #[serde(default)]
    #[serde_as(as = "DefaultOnNull")]
    pub long_quantity: Decimal,
    #[serde(default)]
    #[serde_as(as = "DefaultOnNull")]
    pub short_quantity: Decimal,
    #[serde(default)]
    #[serde_as(as = "DefaultOnNull")]
    pub current_day_profit_loss: Decimal,
    #[serde(default)]
    #[serde_as(as = "DefaultOnNull")]
    pub current_day_profit_loss_percentage: Decimal,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Queued,
    Working,
    Filled,
    Canceled,
    Rejected,
    Expired,
    #[serde(other)]
    Other,
}

impl OrderStatus {
    pub fn is_open(&self) -> bool {
        matches!(self, OrderStatus::Queued | OrderStatus::Working)
    }
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderStrategy {
    pub order_id: i64,
    pub status: OrderStatus,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    #[serde_as(as = "DefaultOnNull")]
    pub order_leg_collection: Vec<OrderLeg>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderLeg {
    pub instruction: String,
    pub quantity: Decimal,
    pub instrument: InstrumentRef,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct RestingOrder {
    pub quantity: Decimal,
    pub price: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq)]
pub struct WorkingOrders {
    pub buy: Option<RestingOrder>,
    pub sell: Option<RestingOrder>,
}

impl WorkingOrders {
    pub fn resting(&self, direction: Direction) -> Option<RestingOrder> {
        match direction {
            Direction::Buy => self.buy,
            Direction::Sell => self.sell,
            Direction::Waiting => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq)]
pub struct DayProfitLoss {
    pub amount: Decimal,
    pub percentage: Decimal,
}

fn account<'a>(accounts: &'a [AccountEnvelope], account_id: &str) -> Option<&'a SecuritiesAccount> {
    accounts
        .iter()
        .map(|envelope| &envelope.securities_account)
        .find(|account| account.account_id == account_id)
}

fn open_equity_orders<'a>(
    accounts: &'a [AccountEnvelope],
    account_id: &str,
    symbol: &'a str,
) -> impl Iterator<Item = (&'a OrderStrategy, &'a OrderLeg)> + 'a {
    account(accounts, account_id)
        .into_iter()
        .flat_map(|account| account.order_strategies.iter())
        .filter(|order| order.status.is_open())
        .flat_map(|order| order.order_leg_collection.iter().map(move |leg| (order, leg)))
        .filter(move |(_, leg)| leg.instrument.is_equity(symbol))
}

fn matching_position<'a>(
    accounts: &'a [AccountEnvelope],
    account_id: &str,
    symbol: &str,
) -> Option<&'a Position> {
    account(accounts, account_id)?
        .positions
        .iter()
        .filter(|position| position.instrument.symbol == symbol)
        .last()
}

pub fn shares_held(accounts: &[AccountEnvelope], account_id: &str, symbol: &str) -> Decimal {
    matching_position(accounts, account_id, symbol)
        .map(|position| position.long_quantity)
        .unwrap_or(Decimal::ZERO)
}

pub fn day_profit_loss(
    accounts: &[AccountEnvelope],
    account_id: &str,
    symbol: &str,
) -> DayProfitLoss {
    matching_position(accounts, account_id, symbol)
        .map(|position| DayProfitLoss {
            amount: position.current_day_profit_loss,
            percentage: position.current_day_profit_loss_percentage,
        })
        .unwrap_or_default()
}

pub fn free_cash(account: &SecuritiesAccount) -> Option<Decimal> {
    let balances = account.current_balances.as_ref()?;
    balances
        .cash_balance
        .filter(|cash| !cash.is_zero())
        .or(balances.cash_available_for_trading)
}

pub fn working_orders(accounts: &[AccountEnvelope], account_id: &str, symbol: &str) -> WorkingOrders {
    let mut working = WorkingOrders::default();
    for (order, leg) in open_equity_orders(accounts, account_id, symbol) {
        let resting = Some(RestingOrder {
            quantity: leg.quantity,
            price: order.price,
        });
        match leg.instruction.to_ascii_uppercase().as_str() {
            "BUY" => working.buy = resting,
            "SELL" => working.sell = resting,
            _ => {}
        }
    }
    working
}

pub fn order_ids_to_cancel(accounts: &[AccountEnvelope], account_id: &str, symbol: &str) -> Vec<i64> {
    let mut ids: Vec<i64> = open_equity_orders(accounts, account_id, symbol)
        .map(|(order, _)| order.order_id)
        .collect();
    ids.dedup();
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn free_cash_falls_back_to_available_for_trading() {
        let account: SecuritiesAccount = serde_json::from_value(json!({
            "accountId": "123",
            "positions": null,
            "currentBalances": { "cashBalance": 0, "cashAvailableForTrading": 812.5 }
        }))
        .expect("account");
        assert!(account.positions.is_empty());
        assert_eq!(free_cash(&account), Some(dec!(812.5)));
    }

    #[test]
    fn unknown_status_is_not_open() {
        let order: OrderStrategy = serde_json::from_value(json!({
            "orderId": 7,
            "status": "PENDING_ACTIVATION",
            "orderLegCollection": []
        }))
        .expect("order");
        assert_eq!(order.status, OrderStatus::Other);
        assert!(!order.status.is_open());
    }
}
