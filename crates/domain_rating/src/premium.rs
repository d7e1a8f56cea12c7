//! Limit and premium calculation
//!
//! Offered limits are the requested limits capped at the insurer maxima.
//! The monthly premium is declared revenue times each adjusted rate, rounded
//! to centavos and floored at the insurer minimum.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use core_kernel::{Money, MoneyError};

use crate::adjuster::AdjustedRates;
use crate::catalogue::{Insurer, InsurerBusinessRule};
use crate::error::RatingError;
use crate::quote::RequestedLimits;

/// Limits an insurer offers for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferedLimits {
    pub rctr_c: Money,
    pub rc_dc: Money,
    /// Container sub-limit, capped by the RCTR-C maximum
    pub container: Option<Money>,
    /// Rio de Janeiro operation sub-limit, capped by the RCTR-C maximum
    pub rj_operation: Option<Money>,
}

/// `min(requested, insurer_max)`
pub fn offered_limit(requested: &Money, insurer_max: &Money) -> Result<Money, MoneyError> {
    requested.min(insurer_max)
}

pub fn offered_limits(
    requested: &RequestedLimits,
    insurer: &Insurer,
) -> Result<OfferedLimits, RatingError> {
    let cap_sub_limit = |limit: &Option<Money>| -> Result<Option<Money>, MoneyError> {
        limit
            .as_ref()
            .map(|l| offered_limit(l, &insurer.max_rctr_c_limit))
            .transpose()
    };

    Ok(OfferedLimits {
        rctr_c: offered_limit(&requested.general, &insurer.max_rctr_c_limit)?,
        rc_dc: offered_limit(&requested.general, &insurer.max_rc_dc_limit)?,
        container: cap_sub_limit(&requested.container)?,
        rj_operation: cap_sub_limit(&requested.rj_operation)?,
    })
}

/// How a monthly premium was arrived at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PremiumBreakdown {
    pub rctr_c_premium: Money,
    pub rc_dc_premium: Money,
    /// Sum of both coverages rounded to the currency, before the floor
    pub calculated: Money,
    pub minimum: Money,
    /// Final monthly premium
    pub premium: Money,
}

impl PremiumBreakdown {
    pub fn minimum_applied(&self) -> bool {
        self.premium.amount() > self.calculated.amount()
    }
}

pub fn monthly_premium(
    monthly_revenue: &Money,
    rates: &AdjustedRates,
    minimum_premium: &Money,
) -> Result<PremiumBreakdown, RatingError> {
    let revenue = monthly_revenue.amount();
    let rctr_c_exact = revenue
        .checked_mul(rates.rctr_c.as_decimal())
        .ok_or(MoneyError::Overflow)?;
    let rc_dc_exact = revenue
        .checked_mul(rates.rc_dc.as_decimal())
        .ok_or(MoneyError::Overflow)?;
    let total = rctr_c_exact
        .checked_add(rc_dc_exact)
        .ok_or(MoneyError::Overflow)?;

    // Single rounding on the exact sum; the per-coverage figures are informative
    let calculated = Money::rounded(total, monthly_revenue.currency());
    let premium = calculated.max(minimum_premium)?;
    let rctr_c_premium = Money::new(rctr_c_exact, monthly_revenue.currency());
    let rc_dc_premium = Money::new(rc_dc_exact, monthly_revenue.currency());

    Ok(PremiumBreakdown {
        rctr_c_premium,
        rc_dc_premium,
        calculated,
        minimum: *minimum_premium,
        premium,
    })
}

/// Franchise text such as "10% com mínimo de R$ 1.000,00"
pub fn franchise_description(rule: &InsurerBusinessRule) -> String {
    format!(
        "{}% com mínimo de {} {}",
        rule.franchise_percentage.normalize(),
        rule.franchise_minimum.currency().symbol(),
        format_brazilian(rule.franchise_minimum.amount()),
    )
}

/// Formats an amount with '.' thousands separators and ',' decimals
pub fn format_brazilian(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven);
    let text = format!("{:.2}", rounded.abs());
    let (integer, fraction) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (i, digit) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    format!("{}{},{}", sign, grouped, fraction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::{InsurerId, MerchandiseTypeId, Rate};
    use rust_decimal_macros::dec;

    fn insurer() -> Insurer {
        Insurer::new(
            "Porto",
            Money::brl(dec!(150.00)),
            Money::brl(dec!(1000000)),
            Money::brl(dec!(500000)),
        )
    }

    fn rates(rctr_c: Decimal, rc_dc: Decimal) -> AdjustedRates {
        AdjustedRates {
            rctr_c: Rate::from_percentage(rctr_c),
            rc_dc: Rate::from_percentage(rc_dc),
            risk_factor: Decimal::ONE,
            discount_factor: Decimal::ONE,
        }
    }

    #[test]
    fn test_premium_above_minimum() {
        let breakdown = monthly_premium(
            &Money::brl(dec!(200000)),
            &rates(dec!(0.625), dec!(0.375)),
            &Money::brl(dec!(150.00)),
        )
        .unwrap();
        assert_eq!(breakdown.premium.amount(), dec!(2000.00));
        assert_eq!(breakdown.rctr_c_premium.amount(), dec!(1250));
        assert!(!breakdown.minimum_applied());
    }

    #[test]
    fn test_minimum_premium_floor() {
        let breakdown = monthly_premium(
            &Money::brl(dec!(1000)),
            &rates(dec!(0.625), dec!(0.375)),
            &Money::brl(dec!(150.00)),
        )
        .unwrap();
        assert_eq!(breakdown.calculated.amount(), dec!(10.00));
        assert_eq!(breakdown.premium.amount(), dec!(150.00));
        assert!(breakdown.minimum_applied());
    }

    #[test]
    fn test_premium_rounded_once_from_exact_sum() {
        // 0.504472% / 0.912272% loaded by 1.25 on 76327.41 is 1351.7050019...
        let loaded = rates(dec!(0.504472) * dec!(1.25), dec!(0.912272) * dec!(1.25));
        let breakdown = monthly_premium(
            &Money::brl(dec!(76327.41)),
            &loaded,
            &Money::brl(dec!(150.00)),
        )
        .unwrap();
        assert_eq!(breakdown.calculated.amount(), dec!(1351.71));
        assert_eq!(breakdown.premium.amount(), dec!(1351.71));
    }

    #[test]
    fn test_limits_capped_per_coverage() {
        let requested = RequestedLimits {
            general: Money::brl(dec!(750000)),
            container: Some(Money::brl(dec!(2000000))),
            rj_operation: None,
        };
        let offered = offered_limits(&requested, &insurer()).unwrap();
        assert_eq!(offered.rctr_c.amount(), dec!(750000));
        assert_eq!(offered.rc_dc.amount(), dec!(500000));
        assert_eq!(offered.container.map(|m| m.amount()), Some(dec!(1000000)));
        assert_eq!(offered.rj_operation, None);
    }

    #[test]
    fn test_franchise_description() {
        let rule = InsurerBusinessRule::new(InsurerId::new(), MerchandiseTypeId::new(), dec!(0.1), dec!(0.1));
        assert_eq!(franchise_description(&rule), "10% com mínimo de R$ 1.000,00");

        let custom = rule.with_franchise(dec!(12.5), Money::brl(dec!(2500)));
        assert_eq!(franchise_description(&custom), "12.5% com mínimo de R$ 2.500,00");
    }

    #[test]
    fn test_format_brazilian() {
        assert_eq!(format_brazilian(dec!(0)), "0,00");
        assert_eq!(format_brazilian(dec!(999.5)), "999,50");
        assert_eq!(format_brazilian(dec!(1234567.891)), "1.234.567,89");
        assert_eq!(format_brazilian(dec!(-1000)), "-1.000,00");
    }
}
