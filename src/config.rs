use crate::model::{PriceDecisionState, ScanLimits, ScanThresholds};
use crate::pricing::DEFAULT_BUFFER;
use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Parser, Clone)]
#[command(name = "strangulator", author, version, about = "Short strangle scanner and limit order repricer", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Scan option chain snapshots for short strangle candidates
    Scan(ScanArgs),
    /// Run one limit order repricing cycle against a paper broker
    Reprice(RepriceArgs),
}

#[derive(Debug, Args, Clone)]
pub struct ScanArgs {
    /// Directory holding one `<SYMBOL>.json` chain snapshot per symbol
    #[arg(long, env = "CHAINS_DIR", default_value = "chains")]
    pub chains: PathBuf,

    #[arg(long, env = "SYMBOLS", value_delimiter = ',', required = true)]
    pub symbols: Vec<String>,

    #[arg(long, env = "MIN_DELTA", default_value = "-0.05", allow_hyphen_values = true)]
    pub min_delta: Decimal,

    #[arg(long, env = "MAX_DELTA", default_value = "0.04", allow_hyphen_values = true)]
    pub max_delta: Decimal,

    #[arg(long, env = "MIN_GAMMA", default_value = "-0.05", allow_hyphen_values = true)]
    pub min_gamma: Decimal,

    #[arg(long, env = "MAX_GAMMA", default_value = "0.05", allow_hyphen_values = true)]
    pub max_gamma: Decimal,

    #[arg(long, env = "MAX_EXPIRATIONS", default_value_t = 25usize)]
    pub max_expirations: usize,

    #[arg(long, env = "MIN_DAYS", default_value_t = 40i64)]
    pub min_days: i64,

    #[arg(long, env = "MAX_DAYS", default_value_t = 200i64)]
    pub max_days: i64,

    /// Candidates shown per symbol
    #[arg(long, env = "TOP", default_value_t = 5usize)]
    pub top: usize,
}

#[derive(Debug, Args, Clone)]
pub struct RepriceArgs {
    /// JSON file with broker accounts and quotes
    #[arg(long, env = "BROKER_STATE")]
    pub state: PathBuf,

    #[arg(long, env = "SYMBOL")]
    pub symbol: String,

    #[arg(long, env = "ACCOUNT_ID")]
    pub account: String,

    #[arg(long, env = "BET_SIZE")]
    pub bet_size: Decimal,

    #[arg(long, env = "ORDER_QUANTITY", default_value = "1")]
    pub quantity: Decimal,

    #[arg(long, env = "PRICE_BUFFER", default_value = "0.05")]
    pub buffer: Decimal,

    #[arg(long, env = "DRY_RUN", default_value_t = false)]
    pub dry_run: bool,

    #[arg(long)]
    pub prev_price: Option<Decimal>,

    #[arg(long)]
    pub prev_bid: Option<Decimal>,

    #[arg(long)]
    pub prev_ask: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanConfig {
    pub chains_dir: PathBuf,
    pub symbols: Vec<String>,
    pub thresholds: ScanThresholds,
    pub limits: ScanLimits,
    pub top: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RepriceConfig {
    pub state_path: PathBuf,
    pub symbol: String,
    pub account_id: String,
    pub bet_size: Decimal,
    pub quantity: Decimal,
    pub buffer: Decimal,
    pub dry_run: bool,
    pub previous: PriceDecisionState,
}

impl RepriceConfig {
    pub fn new(account_id: &str, bet_size: Decimal, quantity: Decimal) -> Self {
        Self {
            state_path: PathBuf::new(),
            symbol: String::new(),
            account_id: account_id.to_string(),
            bet_size,
            quantity,
            buffer: DEFAULT_BUFFER,
            dry_run: false,
            previous: PriceDecisionState::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub enum AppConfig {
    Scan(ScanConfig),
    Reprice(RepriceConfig),
}

impl AppConfig {
    pub fn from_cli(cli: Cli) -> Result<Self> {
        let config = match cli.command {
            Command::Scan(args) => AppConfig::Scan(scan_config(args)?),
            Command::Reprice(args) => AppConfig::Reprice(reprice_config(args)?),
        };
        info!(
            target: "config",
            config = %serde_json::to_string(&config).unwrap_or_default(),
            "configuration loaded"
        );
        Ok(config)
    }
}

fn scan_config(args: ScanArgs) -> Result<ScanConfig> {
    let symbols: Vec<String> = args
        .symbols
        .iter()
        .map(|s| s.trim().to_ascii_uppercase())
        .filter(|s| !s.is_empty())
        .collect();
    if symbols.is_empty() {
        return Err(anyhow!("at least one symbol is required"));
    }

    let thresholds = ScanThresholds {
        min_delta: args.min_delta,
        max_delta: args.max_delta,
        min_gamma: args.min_gamma,
        max_gamma: args.max_gamma,
    };
    thresholds.validate()?;

    if args.max_expirations == 0 {
        return Err(anyhow!("max expirations must be at least 1"));
    }
    let limits = ScanLimits {
        max_expirations: args.max_expirations,
        min_days: args.min_days,
        max_days: args.max_days,
    };
    limits.validate()?;

    Ok(ScanConfig {
        chains_dir: args.chains,
        symbols,
        thresholds,
        limits,
        top: args.top,
    })
}

fn reprice_config(args: RepriceArgs) -> Result<RepriceConfig> {
    let symbol = args.symbol.trim().to_ascii_uppercase();
    if symbol.is_empty() {
        return Err(anyhow!("symbol must not be empty"));
    }
    if args.bet_size < Decimal::ZERO {
        return Err(anyhow!("bet size must not be negative"));
    }
    if args.quantity <= Decimal::ZERO {
        return Err(anyhow!("order quantity must be positive"));
    }
    if args.buffer < Decimal::ZERO {
        return Err(anyhow!("price buffer must not be negative"));
    }

    Ok(RepriceConfig {
        state_path: args.state,
        symbol,
        account_id: args.account,
        bet_size: args.bet_size,
        quantity: args.quantity,
        buffer: args.buffer,
        dry_run: args.dry_run,
        previous: PriceDecisionState {
            placed_price: args.prev_price,
            bid: args.prev_bid,
            ask: args.prev_ask,
        },
    })
}
