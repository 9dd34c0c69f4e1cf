use crate::model::{Direction, PriceDecisionState};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, Default)]
pub struct PositionSizer;

impl PositionSizer {
    pub fn new() -> Self {
        Self
    }

    /// Sell once the position has reached the bet size, otherwise keep buying.
    /// `Waiting` is never produced here.
    pub fn decide_direction(&self, shares_held: Decimal, bet_size: Decimal) -> Direction {
        if shares_held >= bet_size {
            Direction::Sell
        } else {
            Direction::Buy
        }
    }
}

#[derive(Default)]
struct LedgerEntry {
    state: PriceDecisionState,
    in_flight: bool,
}

/// Previous-cycle price state per symbol. At most one reprice may be in
/// flight for a symbol; `begin` refuses a second one until `commit` or
/// `abandon` is called.
#[derive(Clone, Default)]
pub struct DecisionLedger {
    entries: Arc<Mutex<HashMap<String, LedgerEntry>>>,
}

impl DecisionLedger {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn seed(&self, symbol: &str, state: PriceDecisionState) {
        let mut entries = self.entries.lock();
        entries.entry(symbol.to_string()).or_default().state = state;
    }

    pub fn state(&self, symbol: &str) -> PriceDecisionState {
        let entries = self.entries.lock();
        entries
            .get(symbol)
            .map(|entry| entry.state.clone())
            .unwrap_or_default()
    }

    pub fn begin(&self, symbol: &str) -> Option<PriceDecisionState> {
        let mut entries = self.entries.lock();
        let entry = entries.entry(symbol.to_string()).or_default();
        if entry.in_flight {
            warn!(target: "risk", symbol, "reprice already in flight");
            return None;
        }
        entry.in_flight = true;
        Some(entry.state.clone())
    }

    pub fn commit(&self, symbol: &str, state: PriceDecisionState) {
        let mut entries = self.entries.lock();
        let entry = entries.entry(symbol.to_string()).or_default();
        entry.state = state;
        entry.in_flight = false;
        info!(
            target: "risk",
            symbol,
            placed = ?entry.state.placed_price,
            "reprice state committed"
        );
    }

    pub fn abandon(&self, symbol: &str) {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get_mut(symbol) {
            entry.in_flight = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case(dec!(5), dec!(5), Direction::Sell)]
    #[case(dec!(6), dec!(5), Direction::Sell)]
    #[case(dec!(4), dec!(5), Direction::Buy)]
    #[case(dec!(0), dec!(0), Direction::Sell)]
    fn sizes_direction(#[case] held: Decimal, #[case] bet: Decimal, #[case] expected: Direction) {
        assert_eq!(PositionSizer::new().decide_direction(held, bet), expected);
    }

    #[test]
    fn ledger_serializes_reprices_per_symbol() {
        let ledger = DecisionLedger::new();
        assert!(ledger.begin("GME").is_some());
        assert!(ledger.begin("GME").is_none());
        assert!(ledger.begin("AMC").is_some());

        let next = PriceDecisionState {
            placed_price: Some(dec!(1.20)),
            bid: Some(dec!(1.19)),
            ask: Some(dec!(1.29)),
        };
        ledger.commit("GME", next.clone());
        assert_eq!(ledger.begin("GME"), Some(next));
    }

    #[test]
    fn abandon_keeps_previous_state() {
        let ledger = DecisionLedger::new();
        let seeded = PriceDecisionState {
            placed_price: Some(dec!(2.00)),
            bid: None,
            ask: None,
        };
        ledger.seed("TSLA", seeded.clone());
        assert!(ledger.begin("TSLA").is_some());
        ledger.abandon("TSLA");
        assert_eq!(ledger.state("TSLA"), seeded);
        assert!(ledger.begin("TSLA").is_some());
    }
}
