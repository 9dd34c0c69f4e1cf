use anyhow::Result;
use clap::Parser;
use futures::future::join_all;
use strangulator::chain;
use strangulator::client::{ChainDirectory, ChainSource};
use strangulator::config::{AppConfig, Cli, RepriceConfig, ScanConfig};
use strangulator::detect::{rank_scans, StrangleScanner};
use strangulator::exec::{OrderPlanner, PaperBroker};
use strangulator::model::SymbolScan;
use strangulator::render;
use strangulator::risk::DecisionLedger;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    match AppConfig::from_cli(cli)? {
        AppConfig::Scan(config) => run_scan(&config).await,
        AppConfig::Reprice(config) => run_reprice(&config).await,
    }
}

async fn run_scan(config: &ScanConfig) -> Result<()> {
    let source = ChainDirectory::new(config.chains_dir.clone());
    let scanner = StrangleScanner::new(config.thresholds).with_limits(config.limits);

    let scans = join_all(
        config
            .symbols
            .iter()
            .map(|symbol| scan_symbol(&source, &scanner, symbol)),
    )
    .await;
    let ranked = rank_scans(scans.into_iter().flatten().collect());

    if ranked.is_empty() {
        info!(target: "scan", "no strangle candidates in any chain");
        return Ok(());
    }
    render::print_rankings(&ranked, config.top)
}

async fn scan_symbol(
    source: &dyn ChainSource,
    scanner: &StrangleScanner,
    symbol: &str,
) -> Option<SymbolScan> {
    let chain = match source.option_chain(symbol).await {
        Ok(chain) => chain,
        Err(err) => {
            error!(target: "scan", symbol, error = %format!("{err:#}"), "failed to load chain");
            return None;
        }
    };
    let stats = chain::stats(&chain);
    info!(
        target: "scan.stats",
        symbol,
        call_expirations = stats.call_expirations,
        put_expirations = stats.put_expirations,
        contracts = stats.call_contracts + stats.put_contracts,
        unusable = stats.unusable_quotes
    );
    match scanner.scan_chain(&chain) {
        Ok(candidates) => {
            info!(target: "scan", symbol, candidates = candidates.len(), "symbol scanned");
            Some(SymbolScan {
                symbol: symbol.to_string(),
                candidates,
            })
        }
        Err(err) => {
            error!(target: "scan", symbol, error = %err, "scan rejected chain");
            None
        }
    }
}

async fn run_reprice(config: &RepriceConfig) -> Result<()> {
    let broker = PaperBroker::from_path(&config.state_path).await?;
    let ledger = DecisionLedger::new();
    ledger.seed(&config.symbol, config.previous.clone());

    let planner = OrderPlanner::new(&broker, config, &ledger);
    let report = planner.reprice(&config.symbol).await?;
    info!(
        target: "exec",
        symbol = %report.symbol,
        direction = %report.direction,
        submitted = report.submitted,
        "reprice cycle finished"
    );
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
