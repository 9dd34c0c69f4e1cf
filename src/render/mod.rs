use crate::model::{StrangleCandidate, SymbolScan};
use anyhow::Result;
use comfy_table::{presets::UTF8_BORDERS_ONLY, Cell, Table};
use rust_decimal::Decimal;

pub fn candidates_table(candidates: &[StrangleCandidate], limit: usize) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec![
        "Symbol",
        "Last",
        "Expiration",
        "DTE",
        "Put",
        "Call",
        "Net Delta",
        "Net Gamma",
        "Net Theta",
        "BPE",
        "Theta Power",
    ]);

    for candidate in candidates.iter().take(limit) {
        table.add_row(vec![
            Cell::new(&candidate.symbol),
            Cell::new(format_decimal(candidate.underlying_last)),
            Cell::new(&candidate.call_expiration),
            Cell::new(candidate.days_to_expiration.to_string()),
            Cell::new(candidate.put_strike.normalize().to_string()),
            Cell::new(candidate.call_strike.normalize().to_string()),
            Cell::new(format_decimal(candidate.net_delta)),
            Cell::new(format_decimal(candidate.net_gamma)),
            Cell::new(format_decimal(candidate.net_theta)),
            Cell::new(format_decimal(candidate.buying_power_effect)),
            Cell::new(format_decimal(candidate.theta_power)),
        ]);
    }
    table
}

pub fn rankings_table(scans: &[SymbolScan]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Rank", "Symbol", "Candidates", "Best Pair", "Best Theta Power"]);
    for (rank, scan) in scans.iter().enumerate() {
        let (pair, score) = match scan.best() {
            Some(best) => (
                format!(
                    "{} {}/{}",
                    best.call_expiration,
                    best.put_strike.normalize(),
                    best.call_strike.normalize()
                ),
                format_decimal(best.theta_power),
            ),
            None => ("-".to_string(), "-".to_string()),
        };
        table.add_row(vec![
            Cell::new(rank + 1),
            Cell::new(&scan.symbol),
            Cell::new(scan.candidates.len()),
            Cell::new(pair),
            Cell::new(score),
        ]);
    }
    table
}

pub fn print_rankings(scans: &[SymbolScan], per_symbol: usize) -> Result<()> {
    println!("{}", rankings_table(scans));
    for scan in scans {
        println!("{}", candidates_table(&scan.candidates, per_symbol));
    }
    Ok(())
}

fn format_decimal(value: Decimal) -> String {
    if !value.is_zero() && value.abs() < Decimal::new(1, 2) {
        format!("{:.4}", value)
    } else {
        format!("{:.2}", value)
    }
}
