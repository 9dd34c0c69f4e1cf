use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrangleMarginInput {
    pub underlying_last: Decimal,
    pub call_strike: Decimal,
    pub call_price: Decimal,
    pub put_strike: Decimal,
    pub put_price: Decimal,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum GoverningSide {
    Call,
    Put,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LegRequirement {
    pub otm_amount: Decimal,
    pub uncovered_rule: Decimal,
    pub ten_percent_rule: Decimal,
    pub plus_fifty_rule: Decimal,
    pub requirement: Decimal,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MarginBreakdown {
    pub call: LegRequirement,
    pub put: LegRequirement,
    pub governing: GoverningSide,
    pub total: Decimal,
}

/// Short strangle buying-power approximation: the larger uncovered leg
/// plus the premium of the other leg. Not a broker-accurate margin model.
#[derive(Debug, Clone, Copy)]
pub struct BuyingPowerEstimator {
    pub uncovered_rate: Decimal,
    pub min_per_leg: Decimal,
}

impl Default for BuyingPowerEstimator {
    fn default() -> Self {
        Self {
            uncovered_rate: dec!(0.20),
            min_per_leg: dec!(250),
        }
    }
}

impl BuyingPowerEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` when the inputs are too large to price without overflow.
    pub fn estimate(
        &self,
        underlying_last: Decimal,
        call_strike: Decimal,
        call_price: Decimal,
        put_strike: Decimal,
        put_price: Decimal,
    ) -> Option<Decimal> {
        self.breakdown(&StrangleMarginInput {
            underlying_last,
            call_strike,
            call_price,
            put_strike,
            put_price,
        })
        .map(|breakdown| breakdown.total)
    }

    pub fn breakdown(&self, input: &StrangleMarginInput) -> Option<MarginBreakdown> {
        let call = self.leg(
            input.underlying_last,
            input.call_strike.checked_sub(input.underlying_last)?,
        )?;
        let put = self.leg(
            input.underlying_last,
            input.underlying_last.checked_sub(input.put_strike)?,
        )?;

        let (governing, total) = if call.requirement > put.requirement {
            (GoverningSide::Call, call.requirement.checked_add(input.put_price)?)
        } else {
            (GoverningSide::Put, put.requirement.checked_add(input.call_price)?)
        };

        Some(MarginBreakdown {
            call,
            put,
            governing,
            total,
        })
    }

    fn leg(&self, underlying_last: Decimal, otm_amount: Decimal) -> Option<LegRequirement> {
        let uncovered_rule = self
            .uncovered_rate
            .checked_mul(underlying_last)?
            .checked_sub(otm_amount)?;
        // 10% and +50 sub-rules are not modelled
        let ten_percent_rule = Decimal::ZERO;
        let plus_fifty_rule = Decimal::ZERO;
        let requirement = uncovered_rule
            .max(ten_percent_rule)
            .max(plus_fifty_rule)
            .max(self.min_per_leg);
        Some(LegRequirement {
            otm_amount,
            uncovered_rule,
            ten_percent_rule,
            plus_fifty_rule,
            requirement,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(dec!(100), dec!(110), dec!(2), dec!(90), dec!(1.5), dec!(252))]
    #[case(dec!(2000), dec!(2100), dec!(3), dec!(1900), dec!(4), dec!(303))]
    #[case(dec!(2000), dec!(2050), dec!(3), dec!(1800), dec!(4), dec!(354))]
    fn estimates_strangle_requirement(
        #[case] underlying: Decimal,
        #[case] call_strike: Decimal,
        #[case] call_price: Decimal,
        #[case] put_strike: Decimal,
        #[case] put_price: Decimal,
        #[case] expected: Decimal,
    ) {
        let estimator = BuyingPowerEstimator::new();
        let bpe = estimator.estimate(underlying, call_strike, call_price, put_strike, put_price);
        assert_eq!(bpe, Some(expected));
    }

    #[test]
    fn equal_legs_charge_the_call_premium() {
        let estimator = BuyingPowerEstimator::new();
        let breakdown = estimator.breakdown(&StrangleMarginInput {
            underlying_last: dec!(100),
            call_strike: dec!(110),
            call_price: dec!(2),
            put_strike: dec!(90),
            put_price: dec!(1.5),
        })
        .expect("breakdown");
        assert_eq!(breakdown.call.requirement, dec!(250));
        assert_eq!(breakdown.put.requirement, dec!(250));
        assert_eq!(breakdown.governing, GoverningSide::Put);
        assert_eq!(breakdown.total, dec!(252));
    }

    #[test]
    fn overflowing_inputs_have_no_estimate() {
        let estimator = BuyingPowerEstimator::new();
        assert_eq!(
            estimator.estimate(dec!(100), dec!(110), dec!(2), Decimal::MIN, dec!(1.5)),
            None
        );
        assert_eq!(
            estimator.estimate(dec!(100), dec!(110), Decimal::MAX, dec!(90), dec!(1.5)),
            None
        );
    }
}
