//! Rate adjustment
//!
//! Turns a rule's base rates into the rates actually offered: risk loading
//! by merchandise tier first, then the volume discount.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use core_kernel::{Money, MoneyError, Rate};

use crate::catalogue::InsurerBusinessRule;
use crate::error::RatingError;
use crate::risk::RiskTier;

/// Extra loading applied on top of the rule multiplier for EXTREME cargo
pub const EXTREME_RISK_FACTOR: Decimal = dec!(1.5);

/// Rates after loading and discount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustedRates {
    pub rctr_c: Rate,
    pub rc_dc: Rate,
    /// Combined factor applied for the risk tier (1 when unloaded)
    pub risk_factor: Decimal,
    /// Factor applied for the volume discount (1 when not applied)
    pub discount_factor: Decimal,
}

impl AdjustedRates {
    pub fn volume_discount_applied(&self) -> bool {
        self.discount_factor != Decimal::ONE
    }
}

/// Loading factor for a tier given the rule's high-risk multiplier
pub fn risk_factor(tier: RiskTier, high_risk_multiplier: Decimal) -> Result<Decimal, RatingError> {
    match tier {
        RiskTier::Low | RiskTier::Moderate => Ok(Decimal::ONE),
        RiskTier::High => Ok(high_risk_multiplier),
        RiskTier::Extreme => high_risk_multiplier
            .checked_mul(EXTREME_RISK_FACTOR)
            .ok_or(RatingError::Financial(MoneyError::Overflow)),
    }
}

/// Discount factor for a monthly revenue
///
/// The discount applies when the threshold is positive and revenue reaches
/// it; `rate_percentage` of 5 yields a factor of 0.95.
pub fn discount_factor(
    monthly_revenue: &Money,
    threshold: &Money,
    rate_percentage: Decimal,
) -> Decimal {
    if threshold.is_positive() && monthly_revenue.amount() >= threshold.amount() {
        Decimal::ONE - rate_percentage / dec!(100)
    } else {
        Decimal::ONE
    }
}

/// Applies the rule's loading and discount to its base rates
pub fn adjust_rates(
    rule: &InsurerBusinessRule,
    tier: RiskTier,
    monthly_revenue: &Money,
) -> Result<AdjustedRates, RatingError> {
    let loading = risk_factor(tier, rule.high_risk_multiplier)?;
    let discount = discount_factor(
        monthly_revenue,
        &rule.volume_discount_threshold,
        rule.volume_discount_rate,
    );

    let rctr_c = rule
        .rctr_c_base_rate
        .checked_scale(loading)?
        .checked_scale(discount)?;
    let rc_dc = rule
        .rc_dc_base_rate
        .checked_scale(loading)?
        .checked_scale(discount)?;

    Ok(AdjustedRates {
        rctr_c,
        rc_dc,
        risk_factor: loading,
        discount_factor: discount,
    })
}
