use rust_decimal_macros::dec;
use serde_json::json;
use strangulator::chain::stats;
use strangulator::client::{ChainDirectory, ChainSource};

#[tokio::test]
async fn loads_snapshot_by_symbol() {
    let dir = tempfile::tempdir().expect("tempdir");
    let payload = json!({
        "underlying": { "last": 41.5 },
        "callExpDateMap": {
            "2021-03-19:45": {
                "45.0": [{ "description": "AMC Mar 19 2021 45 Call", "strikePrice": 45.0,
                           "last": 1.1, "delta": 0.3, "gamma": 0.02, "theta": -0.04 }]
            }
        },
        "putExpDateMap": {
            "2021-03-19:45": {
                "40.0": [{ "description": "AMC Mar 19 2021 40 Put", "strikePrice": 40.0,
                           "last": null, "delta": "NaN", "gamma": 0.02, "theta": -0.03 }]
            }
        }
    });
    std::fs::write(dir.path().join("AMC.json"), payload.to_string()).expect("write");

    let source = ChainDirectory::new(dir.path());
    let chain = source.option_chain("amc").await.expect("chain");
    assert_eq!(chain.symbol.as_deref(), Some("AMC"));
    assert_eq!(chain.underlying.as_ref().map(|u| u.last), Some(dec!(41.5)));

    let summary = stats(&chain);
    assert_eq!(summary.call_contracts, 1);
    assert_eq!(summary.put_contracts, 1);
    assert_eq!(summary.unusable_quotes, 1);
}

#[tokio::test]
async fn missing_snapshot_is_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let source = ChainDirectory::new(dir.path());
    assert!(source.option_chain("TSLA").await.is_err());
}
