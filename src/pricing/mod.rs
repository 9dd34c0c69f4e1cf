//! Limit price ratchet.
//!
//! A resting buy order creeps up one cent per cycle toward the midpoint and
//! never goes above `midpoint - buffer`; a sell order mirrors that from the
//! ask side. When the market moves away from the order (bid drops for a
//! buy, ask rises for a sell) the order jumps straight to the new touch.

use crate::model::{Direction, PriceDecision, PriceDecisionState};
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use tracing::debug;

pub const ONE_CENT: Decimal = dec!(0.01);
pub const DEFAULT_BUFFER: Decimal = dec!(0.05);

pub fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

pub fn midpoint(bid: Decimal, ask: Decimal) -> Decimal {
    round_cents((bid + ask) / dec!(2))
}

#[derive(Debug, Clone, Copy)]
pub struct LimitPriceDecider {
    buffer: Decimal,
}

impl Default for LimitPriceDecider {
    fn default() -> Self {
        Self {
            buffer: DEFAULT_BUFFER,
        }
    }
}

impl LimitPriceDecider {
    pub fn new(buffer: Decimal) -> Self {
        Self { buffer }
    }

    pub fn buffer(&self) -> Decimal {
        self.buffer
    }

    /// `None` means no repricing this cycle.
    pub fn decide(
        &self,
        direction: Direction,
        current_bid: Decimal,
        current_ask: Decimal,
        previous: &PriceDecisionState,
    ) -> Option<PriceDecision> {
        let midpoint = midpoint(current_bid, current_ask);
        // a zero placed price counts as never placed
        let placed = previous.placed_price.filter(|price| !price.is_zero());

        let (price, worst_possible_price) = match (direction, placed) {
            (Direction::Buy, None) => (current_bid, None),
            (Direction::Buy, Some(_)) if previous.bid.is_some_and(|bid| current_bid < bid) => {
                (current_bid, None)
            }
            (Direction::Buy, Some(placed)) => {
                let worst = round_cents(midpoint - self.buffer);
                ((placed + ONE_CENT).min(worst), Some(worst))
            }
            (Direction::Sell, None) => (current_ask, None),
            (Direction::Sell, Some(_)) if previous.ask.is_some_and(|ask| current_ask > ask) => {
                (current_ask, None)
            }
            (Direction::Sell, Some(placed)) => {
                let worst = round_cents(midpoint + self.buffer);
                ((placed - ONE_CENT).max(worst), Some(worst))
            }
            (Direction::Waiting, _) => return None,
        };

        let limit_price = round_cents(price);
        if limit_price <= Decimal::ZERO {
            debug!(target: "pricing", %direction, %limit_price, "no usable price");
            return None;
        }
        debug!(
            target: "pricing",
            %direction,
            %limit_price,
            %midpoint,
            worst = ?worst_possible_price,
            "decided limit price"
        );
        Some(PriceDecision {
            limit_price,
            midpoint,
            worst_possible_price,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn state(placed: Decimal, bid: Decimal, ask: Decimal) -> PriceDecisionState {
        PriceDecisionState {
            placed_price: Some(placed),
            bid: Some(bid),
            ask: Some(ask),
        }
    }

    #[rstest]
    #[case(dec!(1.005), dec!(1.01))]
    #[case(dec!(-1.005), dec!(-1.01))]
    #[case(dec!(1.004), dec!(1.00))]
    #[case(dec!(2.5), dec!(2.50))]
    fn rounds_half_away_from_zero(#[case] raw: Decimal, #[case] expected: Decimal) {
        assert_eq!(round_cents(raw), expected);
    }

    #[test]
    fn buy_ratchets_one_cent_below_ceiling() {
        let decider = LimitPriceDecider::default();
        let decision = decider
            .decide(
                Direction::Buy,
                dec!(1.00),
                dec!(1.40),
                &state(dec!(1.05), dec!(1.00), dec!(1.40)),
            )
            .expect("decision");
        assert_eq!(decision.midpoint, dec!(1.20));
        assert_eq!(decision.worst_possible_price, Some(dec!(1.15)));
        assert_eq!(decision.limit_price, dec!(1.06));
    }

    #[test]
    fn sell_jumps_to_rising_ask() {
        let decider = LimitPriceDecider::default();
        let decision = decider
            .decide(
                Direction::Sell,
                dec!(1.30),
                dec!(1.45),
                &state(dec!(1.41), dec!(1.25), dec!(1.40)),
            )
            .expect("decision");
        assert_eq!(decision.limit_price, dec!(1.45));
        assert_eq!(decision.worst_possible_price, None);
    }

    #[test]
    fn step_and_buffer_are_whole_cents() {
        assert_eq!(ONE_CENT, Decimal::new(1, 2));
        assert_eq!(DEFAULT_BUFFER, Decimal::new(5, 2));
        assert_eq!(LimitPriceDecider::default().buffer(), DEFAULT_BUFFER);
    }

    #[test]
    fn waiting_never_decides() {
        let decider = LimitPriceDecider::default();
        assert!(decider
            .decide(Direction::Waiting, dec!(1), dec!(2), &PriceDecisionState::default())
            .is_none());
    }
}
