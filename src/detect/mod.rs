use crate::chain::{parse_ladder, symbol_from_description, ExpirationKey};
use crate::greeks::{usable_greeks, UsableGreeks};
use crate::margin::BuyingPowerEstimator;
use crate::model::{
    ExpirationChain, OptionChain, OptionQuote, ScanError, ScanLimits, ScanThresholds,
    StrangleCandidate, StrikeLadder, SymbolScan,
};
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use tracing::{debug, warn};

/// Matches calls to same-expiration puts at or below the call strike and
/// keeps the pairs whose net greeks fall inside the configured windows.
pub struct StrangleScanner {
    thresholds: ScanThresholds,
    limits: ScanLimits,
    estimator: BuyingPowerEstimator,
}

struct Leg<'a> {
    strike: Decimal,
    quote: &'a OptionQuote,
    greeks: UsableGreeks,
}

impl StrangleScanner {
    pub fn new(thresholds: ScanThresholds) -> Self {
        Self {
            thresholds,
            limits: ScanLimits::default(),
            estimator: BuyingPowerEstimator::default(),
        }
    }

    pub fn with_limits(mut self, limits: ScanLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_estimator(mut self, estimator: BuyingPowerEstimator) -> Self {
        self.estimator = estimator;
        self
    }

    /// Scans a chain payload. A payload without an underlying quote has
    /// nothing to price against and yields no candidates.
    pub fn scan_chain(&self, chain: &OptionChain) -> Result<Vec<StrangleCandidate>, ScanError> {
        match &chain.underlying {
            Some(underlying) => self.scan(
                &chain.call_exp_date_map,
                &chain.put_exp_date_map,
                underlying.last,
            ),
            None => {
                debug!(target: "scan", symbol = ?chain.symbol, "chain has no underlying quote");
                Ok(Vec::new())
            }
        }
    }

    /// Returns candidates sorted ascending by theta power; equal scores keep
    /// the order in which they were found.
    pub fn scan(
        &self,
        calls: &ExpirationChain,
        puts: &ExpirationChain,
        underlying_last: Decimal,
    ) -> Result<Vec<StrangleCandidate>, ScanError> {
        self.thresholds.validate()?;
        self.limits.validate()?;
        if underlying_last <= Decimal::ZERO {
            return Err(ScanError::InvalidUnderlying(underlying_last));
        }

        let mut candidates = Vec::new();
        for (expiration, call_ladder) in calls.iter().take(self.limits.max_expirations) {
            let Some(put_ladder) = puts.expiration(expiration) else {
                debug!(target: "scan.skip", expiration, "no puts for expiration");
                continue;
            };
            let key = match expiration.parse::<ExpirationKey>() {
                Ok(key) => key,
                Err(err) => {
                    warn!(target: "scan.skip", error = %err, "skipping expiration");
                    continue;
                }
            };
            if !self.limits.admits_days(key.days) {
                continue;
            }

            let call_legs = usable_legs(expiration, call_ladder);
            let put_legs = usable_legs(expiration, put_ladder);
            for call in &call_legs {
                for put in put_legs.iter().filter(|put| put.strike <= call.strike) {
                    if let Some(candidate) = self.evaluate(&key, call, put, underlying_last) {
                        candidates.push(candidate);
                    }
                }
            }
        }

        candidates.sort_by(|a, b| a.theta_power.cmp(&b.theta_power));
        debug!(target: "scan", count = candidates.len(), "scan complete");
        Ok(candidates)
    }

    fn evaluate(
        &self,
        key: &ExpirationKey,
        call: &Leg<'_>,
        put: &Leg<'_>,
        underlying_last: Decimal,
    ) -> Option<StrangleCandidate> {
        let (Some(net_delta), Some(net_gamma)) = (
            call.greeks.delta.checked_add(put.greeks.delta),
            call.greeks.gamma.checked_add(put.greeks.gamma),
        ) else {
            skip_pair(key, call, put, "net greeks overflow");
            return None;
        };
        if !self.thresholds.admits(net_delta, net_gamma) {
            return None;
        }

        // Arguments follow the historical call site: the put strike fills the
        // call premium slot and the call premium fills the put strike slot.
        // Likely a latent transposition, kept so rankings stay comparable.
        let Some(buying_power_effect) = self.estimator.estimate(
            underlying_last,
            call.strike,
            put.strike,
            call.quote.last,
            put.quote.last,
        ) else {
            skip_pair(key, call, put, "buying power effect overflow");
            return None;
        };
        if buying_power_effect.is_zero() {
            skip_pair(key, call, put, "buying power effect is zero");
            return None;
        }

        let Some(scaled) = scale_figures(net_delta, net_gamma, call, put, buying_power_effect) else {
            skip_pair(key, call, put, "theta power overflow");
            return None;
        };

        Some(StrangleCandidate {
            symbol: symbol_from_description(&call.quote.description).to_string(),
            underlying_last,
            net_delta: scaled.net_delta,
            net_gamma: scaled.net_gamma,
            net_theta: scaled.net_theta,
            call_expiration: key.raw.clone(),
            call_strike: call.strike,
            put_expiration: key.raw.clone(),
            put_strike: put.strike,
            days_to_expiration: key.days,
            buying_power_effect,
            theta_power: scaled.theta_power,
        })
    }
}

/// Net greeks in per-100-share units plus theta power.
struct ScaledFigures {
    net_delta: Decimal,
    net_gamma: Decimal,
    net_theta: Decimal,
    theta_power: Decimal,
}

fn scale_figures(
    net_delta: Decimal,
    net_gamma: Decimal,
    call: &Leg<'_>,
    put: &Leg<'_>,
    buying_power_effect: Decimal,
) -> Option<ScaledFigures> {
    let hundred = dec!(100);
    let net_theta = call
        .greeks
        .theta
        .checked_add(put.greeks.theta)?
        .checked_mul(hundred)?;
    let theta_power = net_theta
        .checked_div(buying_power_effect)?
        .checked_mul(hundred)?;
    Some(ScaledFigures {
        net_delta: net_delta.checked_mul(hundred)?,
        net_gamma: net_gamma.checked_mul(hundred)?,
        net_theta,
        theta_power,
    })
}

fn skip_pair(key: &ExpirationKey, call: &Leg<'_>, put: &Leg<'_>, reason: &str) {
    warn!(
        target: "scan.skip",
        expiration = %key.raw,
        call_strike = %call.strike,
        put_strike = %put.strike,
        reason,
        "skipping strangle"
    );
}

fn usable_legs<'a>(expiration: &str, ladder: &'a StrikeLadder) -> Vec<Leg<'a>> {
    parse_ladder(expiration, ladder)
        .into_iter()
        .filter_map(|(strike, quote)| {
            usable_greeks(quote).map(|greeks| Leg {
                strike,
                quote,
                greeks,
            })
        })
        .collect()
}

/// Orders per-symbol scans by their best candidate, dropping empty scans.
pub fn rank_scans(scans: Vec<SymbolScan>) -> Vec<SymbolScan> {
    let mut ranked: Vec<_> = scans
        .into_iter()
        .filter(|scan| !scan.candidates.is_empty())
        .collect();
    ranked.sort_by(|a, b| {
        let a = a.best().map(|c| c.theta_power);
        let b = b.best().map(|c| c.theta_power);
        a.cmp(&b)
    });
    ranked
}
