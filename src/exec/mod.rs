use crate::account::{
    day_profit_loss, free_cash, order_ids_to_cancel, shares_held, working_orders, AccountEnvelope,
    DayProfitLoss, InstrumentRef, OrderLeg, OrderStatus, OrderStrategy,
};
use crate::config::RepriceConfig;
use crate::model::{Direction, PriceDecision, PriceDecisionState, QuoteSnapshot};
use crate::pricing::LimitPriceDecider;
use crate::risk::{DecisionLedger, PositionSizer};
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

#[async_trait]
pub trait BrokerApi: Send + Sync {
    async fn accounts(&self) -> Result<Vec<AccountEnvelope>>;
    async fn quote(&self, symbol: &str) -> Result<QuoteSnapshot>;
    async fn place_limit_order(&self, account_id: &str, order: &LimitOrderRequest) -> Result<()>;
    async fn cancel_order(&self, account_id: &str, order_id: i64) -> Result<()>;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderInstrument {
    pub symbol: String,
    pub asset_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderLegRequest {
    pub instruction: Direction,
    pub quantity: Decimal,
    pub instrument: OrderInstrument,
}

/// Good-till-cancel single-leg equity limit order, as posted to the broker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LimitOrderRequest {
    pub price: Decimal,
    pub order_type: String,
    pub session: String,
    pub duration: String,
    pub order_strategy_type: String,
    pub order_leg_collection: Vec<OrderLegRequest>,
}

impl LimitOrderRequest {
    pub fn equity(
        direction: Direction,
        symbol: &str,
        price: Decimal,
        quantity: Decimal,
    ) -> Result<Self> {
        if direction == Direction::Waiting {
            bail!("cannot build an order while waiting");
        }
        if quantity <= Decimal::ZERO {
            bail!("order quantity must be positive, got {quantity}");
        }
        Ok(Self {
            price,
            order_type: "LIMIT".into(),
            session: "NORMAL".into(),
            duration: "GOOD_TILL_CANCEL".into(),
            order_strategy_type: "SINGLE".into(),
            order_leg_collection: vec![OrderLegRequest {
                instruction: direction,
                quantity,
                instrument: OrderInstrument {
                    symbol: symbol.to_string(),
                    asset_type: "EQUITY".into(),
                },
            }],
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RepriceReport {
    pub symbol: String,
    pub direction: Direction,
    pub shares_held: Decimal,
    pub day_profit_loss: DayProfitLoss,
    pub free_cash: Option<Decimal>,
    pub quote: QuoteSnapshot,
    pub decision: Option<PriceDecision>,
    pub cancelled: Vec<i64>,
    pub order: Option<LimitOrderRequest>,
    pub submitted: bool,
    pub next_state: PriceDecisionState,
}

/// Runs one repricing cycle for a symbol against a broker.
pub struct OrderPlanner<'a, A: BrokerApi + ?Sized> {
    client: &'a A,
    config: &'a RepriceConfig,
    ledger: &'a DecisionLedger,
    sizer: PositionSizer,
    decider: LimitPriceDecider,
}

impl<'a, A: BrokerApi + ?Sized> OrderPlanner<'a, A> {
    pub fn new(client: &'a A, config: &'a RepriceConfig, ledger: &'a DecisionLedger) -> Self {
        Self {
            client,
            config,
            ledger,
            sizer: PositionSizer::new(),
            decider: LimitPriceDecider::new(config.buffer),
        }
    }

    pub async fn reprice(&self, symbol: &str) -> Result<RepriceReport> {
        let previous = self
            .ledger
            .begin(symbol)
            .ok_or_else(|| anyhow!("reprice already in flight for {symbol}"))?;
        match self.cycle(symbol, previous).await {
            Ok(report) => {
                self.ledger.commit(symbol, report.next_state.clone());
                Ok(report)
            }
            Err(err) => {
                self.ledger.abandon(symbol);
                Err(err)
            }
        }
    }

    async fn cycle(&self, symbol: &str, previous: PriceDecisionState) -> Result<RepriceReport> {
        let accounts = self
            .client
            .accounts()
            .await
            .context("failed to load accounts")?;
        let account_id = self.config.account_id.as_str();
        let held = shares_held(&accounts, account_id, symbol);
        let direction = self.sizer.decide_direction(held, self.config.bet_size);

        let quote = self
            .client
            .quote(symbol)
            .await
            .with_context(|| format!("failed to load quote for {symbol}"))?;

        let mut report = RepriceReport {
            symbol: symbol.to_string(),
            direction,
            shares_held: held,
            day_profit_loss: day_profit_loss(&accounts, account_id, symbol),
            free_cash: accounts
                .iter()
                .map(|envelope| &envelope.securities_account)
                .find(|account| account.account_id == account_id)
                .and_then(free_cash),
            quote: quote.clone(),
            decision: None,
            cancelled: Vec::new(),
            order: None,
            submitted: false,
            next_state: previous.clone(),
        };

        let Some(decision) = self.decider.decide(direction, quote.bid, quote.ask, &previous) else {
            info!(target: "exec", symbol, %direction, "no price decision, holding");
            return Ok(report);
        };
        report.next_state = PriceDecisionState::after(&decision, quote.bid, quote.ask);
        report.decision = Some(decision.clone());

        let resting = working_orders(&accounts, account_id, symbol).resting(direction);
        if resting.and_then(|order| order.price) == Some(decision.limit_price) {
            info!(
                target: "exec",
                symbol,
                price = %decision.limit_price,
                "order already resting at decided price"
            );
            return Ok(report);
        }

        let order = LimitOrderRequest::equity(
            direction,
            symbol,
            decision.limit_price,
            self.config.quantity,
        )?;
        let stale = order_ids_to_cancel(&accounts, account_id, symbol);

        if self.config.dry_run {
            info!(
                target: "exec",
                symbol,
                %direction,
                price = %decision.limit_price,
                stale = stale.len(),
                "dry run only, not touching orders"
            );
            report.order = Some(order);
            return Ok(report);
        }

        for order_id in &stale {
            self.client
                .cancel_order(account_id, *order_id)
                .await
                .with_context(|| format!("failed to cancel order {order_id}"))?;
        }
        report.cancelled = stale;

        self.client
            .place_limit_order(account_id, &order)
            .await
            .with_context(|| format!("failed to place {direction} order for {symbol}"))?;
        info!(
            target: "exec",
            symbol,
            %direction,
            price = %decision.limit_price,
            quantity = %self.config.quantity,
            "limit order placed"
        );
        report.order = Some(order);
        report.submitted = true;
        Ok(report)
    }
}

/// Broker state for paper trading: account payloads plus the quotes to serve.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaperBook {
    #[serde(default)]
    pub accounts: Vec<AccountEnvelope>,
    #[serde(default)]
    pub quotes: Vec<QuoteSnapshot>,
}

/// In-memory broker that records orders instead of sending them.
pub struct PaperBroker {
    book: Mutex<PaperBook>,
    placed: Mutex<Vec<(String, LimitOrderRequest)>>,
    cancelled: Mutex<Vec<i64>>,
    next_order_id: Mutex<i64>,
}

impl PaperBroker {
    pub fn new(book: PaperBook) -> Self {
        let next_order_id = book
            .accounts
            .iter()
            .flat_map(|envelope| envelope.securities_account.order_strategies.iter())
            .map(|order| order.order_id)
            .max()
            .unwrap_or(0)
            + 1;
        Self {
            book: Mutex::new(book),
            placed: Mutex::new(Vec::new()),
            cancelled: Mutex::new(Vec::new()),
            next_order_id: Mutex::new(next_order_id),
        }
    }

    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read broker state {}", path.display()))?;
        let book: PaperBook = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse broker state {}", path.display()))?;
        Ok(Self::new(book))
    }

    pub fn set_quote(&self, quote: QuoteSnapshot) {
        let mut book = self.book.lock();
        book.quotes.retain(|existing| existing.symbol != quote.symbol);
        book.quotes.push(quote);
    }

    pub fn placed(&self) -> Vec<(String, LimitOrderRequest)> {
        self.placed.lock().clone()
    }

    pub fn cancelled(&self) -> Vec<i64> {
        self.cancelled.lock().clone()
    }
}

#[async_trait]
impl BrokerApi for PaperBroker {
    async fn accounts(&self) -> Result<Vec<AccountEnvelope>> {
        Ok(self.book.lock().accounts.clone())
    }

    async fn quote(&self, symbol: &str) -> Result<QuoteSnapshot> {
        self.book
            .lock()
            .quotes
            .iter()
            .find(|quote| quote.symbol == symbol)
            .cloned()
            .ok_or_else(|| anyhow!("no quote for {symbol}"))
    }

    async fn place_limit_order(&self, account_id: &str, order: &LimitOrderRequest) -> Result<()> {
        let order_id = {
            let mut next = self.next_order_id.lock();
            let id = *next;
            *next += 1;
            id
        };
        {
            let mut book = self.book.lock();
            let account = book
                .accounts
                .iter_mut()
                .map(|envelope| &mut envelope.securities_account)
                .find(|account| account.account_id == account_id)
                .ok_or_else(|| anyhow!("unknown account {account_id}"))?;
            account.order_strategies.push(OrderStrategy {
                order_id,
                status: OrderStatus::Working,
                price: Some(order.price),
                order_leg_collection: order
                    .order_leg_collection
                    .iter()
                    .map(|leg| OrderLeg {
                        instruction: leg.instruction.to_string(),
                        quantity: leg.quantity,
                        instrument: InstrumentRef {
                            symbol: leg.instrument.symbol.clone(),
                            asset_type: Some(leg.instrument.asset_type.clone()),
                        },
                    })
                    .collect(),
            });
        }
        self.placed.lock().push((account_id.to_string(), order.clone()));
        Ok(())
    }

    async fn cancel_order(&self, account_id: &str, order_id: i64) -> Result<()> {
        let found = {
            let mut book = self.book.lock();
            let order = book
                .accounts
                .iter_mut()
                .map(|envelope| &mut envelope.securities_account)
                .filter(|account| account.account_id == account_id)
                .flat_map(|account| account.order_strategies.iter_mut())
                .find(|order| order.order_id == order_id);
            match order {
                Some(order) => {
                    order.status = OrderStatus::Canceled;
                    true
                }
                None => false,
            }
        };
        if !found {
            warn!(target: "exec.paper", account_id, order_id, "cancel for unknown order");
            bail!("unknown order {order_id}");
        }
        self.cancelled.lock().push(order_id);
        Ok(())
    }
}
