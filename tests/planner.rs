use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;
use strangulator::config::RepriceConfig;
use strangulator::exec::{OrderPlanner, PaperBook, PaperBroker};
use strangulator::model::{Direction, PriceDecisionState, QuoteSnapshot};
use strangulator::risk::DecisionLedger;

fn book(shares: u32) -> PaperBook {
    serde_json::from_value(json!({
        "accounts": [{
            "securitiesAccount": {
                "accountId": "222",
                "positions": [{
                    "instrument": { "symbol": "GME", "assetType": "EQUITY" },
                    "longQuantity": shares
                }]
            }
        }],
        "quotes": [
            { "symbol": "GME", "bidPrice": 1.20, "askPrice": 1.30, "lastPrice": 1.25 }
        ]
    }))
    .expect("book")
}

fn quote(bid: Decimal, ask: Decimal) -> QuoteSnapshot {
    QuoteSnapshot {
        symbol: "GME".into(),
        bid,
        ask,
        last: (bid + ask) / dec!(2),
    }
}

#[tokio::test]
async fn first_cycle_buys_at_the_bid() {
    let broker = PaperBroker::new(book(3));
    let config = RepriceConfig::new("222", dec!(5), dec!(1));
    let ledger = DecisionLedger::new();
    let planner = OrderPlanner::new(&broker, &config, &ledger);

    let report = planner.reprice("GME").await.expect("reprice");
    assert_eq!(report.direction, Direction::Buy);
    assert_eq!(report.shares_held, dec!(3));
    assert!(report.submitted);
    assert!(report.cancelled.is_empty());

    let placed = broker.placed();
    assert_eq!(placed.len(), 1);
    let (account, order) = &placed[0];
    assert_eq!(account, "222");
    assert_eq!(order.price, dec!(1.20));
    assert_eq!(order.order_leg_collection[0].instruction, Direction::Buy);
    assert_eq!(order.order_leg_collection[0].instrument.symbol, "GME");

    assert_eq!(
        ledger.state("GME"),
        PriceDecisionState {
            placed_price: Some(dec!(1.20)),
            bid: Some(dec!(1.20)),
            ask: Some(dec!(1.30)),
        }
    );
}

#[tokio::test]
async fn resting_order_at_decided_price_is_left_alone() {
    let broker = PaperBroker::new(book(3));
    let config = RepriceConfig::new("222", dec!(5), dec!(1));
    let ledger = DecisionLedger::new();
    let planner = OrderPlanner::new(&broker, &config, &ledger);

    planner.reprice("GME").await.expect("first");
    // ceiling is 1.25 - 0.05, so the ratchet stays at 1.20
    let second = planner.reprice("GME").await.expect("second");
    assert_eq!(second.decision.expect("decision").limit_price, dec!(1.20));
    assert!(!second.submitted);
    assert!(second.order.is_none());
    assert_eq!(broker.placed().len(), 1);
    assert!(broker.cancelled().is_empty());
}

#[tokio::test]
async fn falling_bid_replaces_the_resting_order() {
    let broker = PaperBroker::new(book(3));
    let config = RepriceConfig::new("222", dec!(5), dec!(1));
    let ledger = DecisionLedger::new();
    let planner = OrderPlanner::new(&broker, &config, &ledger);

    planner.reprice("GME").await.expect("first");
    broker.set_quote(quote(dec!(1.10), dec!(1.30)));
    let report = planner.reprice("GME").await.expect("second");

    assert!(report.submitted);
    assert_eq!(report.cancelled, vec![1]);
    assert_eq!(broker.cancelled(), vec![1]);
    let placed = broker.placed();
    assert_eq!(placed.len(), 2);
    assert_eq!(placed[1].1.price, dec!(1.10));
    assert_eq!(ledger.state("GME").placed_price, Some(dec!(1.10)));
}

#[tokio::test]
async fn full_position_sells_at_the_ask() {
    let broker = PaperBroker::new(book(5));
    let config = RepriceConfig::new("222", dec!(5), dec!(2));
    let ledger = DecisionLedger::new();
    let planner = OrderPlanner::new(&broker, &config, &ledger);

    let report = planner.reprice("GME").await.expect("reprice");
    assert_eq!(report.direction, Direction::Sell);
    let order = report.order.expect("order");
    assert_eq!(order.price, dec!(1.30));
    assert_eq!(order.order_leg_collection[0].quantity, dec!(2));
    assert_eq!(order.order_leg_collection[0].instruction, Direction::Sell);
}

#[tokio::test]
async fn dry_run_leaves_the_broker_untouched() {
    let broker = PaperBroker::new(book(3));
    let mut config = RepriceConfig::new("222", dec!(5), dec!(1));
    config.dry_run = true;
    let ledger = DecisionLedger::new();
    let planner = OrderPlanner::new(&broker, &config, &ledger);

    let report = planner.reprice("GME").await.expect("reprice");
    assert!(!report.submitted);
    assert!(report.order.is_some());
    assert!(broker.placed().is_empty());
    assert_eq!(ledger.state("GME").placed_price, Some(dec!(1.20)));
}

#[tokio::test]
async fn concurrent_reprice_is_refused() {
    let broker = PaperBroker::new(book(3));
    let config = RepriceConfig::new("222", dec!(5), dec!(1));
    let ledger = DecisionLedger::new();
    let planner = OrderPlanner::new(&broker, &config, &ledger);

    assert!(ledger.begin("GME").is_some());
    assert!(planner.reprice("GME").await.is_err());
    assert!(broker.placed().is_empty());
}

#[tokio::test]
async fn failed_cycle_keeps_previous_state() {
    let broker = PaperBroker::new(book(3));
    let config = RepriceConfig::new("222", dec!(5), dec!(1));
    let ledger = DecisionLedger::new();
    let seeded = PriceDecisionState {
        placed_price: Some(dec!(3.00)),
        bid: Some(dec!(2.90)),
        ask: Some(dec!(3.10)),
    };
    ledger.seed("AMC", seeded.clone());
    let planner = OrderPlanner::new(&broker, &config, &ledger);

    // no quote for AMC
    assert!(planner.reprice("AMC").await.is_err());
    assert_eq!(ledger.state("AMC"), seeded);
    assert!(ledger.begin("AMC").is_some());
}

#[tokio::test]
async fn empty_book_holds_without_ordering() {
    let broker = PaperBroker::new(book(3));
    broker.set_quote(quote(Decimal::ZERO, Decimal::ZERO));
    let config = RepriceConfig::new("222", dec!(5), dec!(1));
    let ledger = DecisionLedger::new();
    let planner = OrderPlanner::new(&broker, &config, &ledger);

    let report = planner.reprice("GME").await.expect("reprice");
    assert!(report.decision.is_none());
    assert!(report.order.is_none());
    assert_eq!(report.next_state, PriceDecisionState::default());
    assert!(broker.placed().is_empty());
}
