//! Money types with precise decimal arithmetic
//!
//! This module provides a type-safe representation of monetary values and
//! percentage rates using rust_decimal, so premiums never drift through
//! binary floating-point rounding.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Currency codes following ISO 4217
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    BRL,
    USD,
    EUR,
}

impl Currency {
    /// Returns the number of decimal places for this currency
    pub fn decimal_places(&self) -> u32 {
        2
    }

    /// Returns the currency symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::BRL => "R$",
            Currency::USD => "$",
            Currency::EUR => "€",
        }
    }

    /// Returns the ISO 4217 code
    pub fn code(&self) -> &'static str {
        match self {
            Currency::BRL => "BRL",
            Currency::USD => "USD",
            Currency::EUR => "EUR",
        }
    }
}

impl Default for Currency {
    fn default() -> Self {
        Currency::BRL
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors that can occur during money operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Currency mismatch: cannot operate on {0} and {1}")]
    CurrencyMismatch(String, String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Overflow during calculation")]
    Overflow,
}

/// A monetary amount with associated currency
///
/// Amounts are stored with 4 decimal places internally; use
/// [`Money::round_to_currency`] when presenting a final figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    amount: Decimal,
    currency: Currency,
}

impl Money {
    /// Creates a new Money value
    pub fn new(amount: Decimal, currency: Currency) -> Self {
        Self {
            amount: amount.round_dp(4),
            currency,
        }
    }

    /// Shorthand for a Brazilian real amount
    pub fn brl(amount: Decimal) -> Self {
        Self::new(amount, Currency::BRL)
    }

    /// Creates a zero amount in the specified currency
    pub fn zero(currency: Currency) -> Self {
        Self {
            amount: dec!(0),
            currency,
        }
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Returns true if the amount is strictly positive
    pub fn is_positive(&self) -> bool {
        self.amount.is_sign_positive() && !self.amount.is_zero()
    }

    /// Rounds an exact amount straight to the currency's decimal places
    ///
    /// Skips the four-place storage rounding of [`Money::new`], so a figure
    /// computed on raw decimals is rounded exactly once.
    pub fn rounded(amount: Decimal, currency: Currency) -> Self {
        Self {
            amount: amount.round_dp_with_strategy(
                currency.decimal_places(),
                rust_decimal::RoundingStrategy::MidpointNearestEven,
            ),
            currency,
        }
    }

    /// Rounds to the currency's standard decimal places (half to even)
    pub fn round_to_currency(&self) -> Self {
        Self {
            amount: self.amount.round_dp_with_strategy(
                self.currency.decimal_places(),
                rust_decimal::RoundingStrategy::MidpointNearestEven,
            ),
            currency: self.currency,
        }
    }

    fn ensure_same_currency(&self, other: &Money) -> Result<(), MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch(
                self.currency.to_string(),
                other.currency.to_string(),
            ));
        }
        Ok(())
    }

    /// Checked addition that returns an error on currency mismatch or overflow
    pub fn checked_add(&self, other: &Money) -> Result<Money, MoneyError> {
        self.ensure_same_currency(other)?;
        let sum = self
            .amount
            .checked_add(other.amount)
            .ok_or(MoneyError::Overflow)?;
        Ok(Self::new(sum, self.currency))
    }

    /// Checked subtraction that returns an error on currency mismatch or overflow
    pub fn checked_sub(&self, other: &Money) -> Result<Money, MoneyError> {
        self.ensure_same_currency(other)?;
        let diff = self
            .amount
            .checked_sub(other.amount)
            .ok_or(MoneyError::Overflow)?;
        Ok(Self::new(diff, self.currency))
    }

    /// Multiplies by a scalar, failing instead of panicking on overflow
    pub fn checked_multiply(&self, factor: Decimal) -> Result<Money, MoneyError> {
        let product = self.amount.checked_mul(factor).ok_or(MoneyError::Overflow)?;
        Ok(Self::new(product, self.currency))
    }

    /// Returns the smaller of two amounts in the same currency
    pub fn min(&self, other: &Money) -> Result<Money, MoneyError> {
        self.ensure_same_currency(other)?;
        Ok(if other.amount < self.amount { *other } else { *self })
    }

    /// Returns the larger of two amounts in the same currency
    pub fn max(&self, other: &Money) -> Result<Money, MoneyError> {
        self.ensure_same_currency(other)?;
        Ok(if other.amount > self.amount { *other } else { *self })
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dp = self.currency.decimal_places();
        write!(
            f,
            "{} {:.dp$}",
            self.currency.symbol(),
            self.amount,
            dp = dp as usize
        )
    }
}

/// A percentage rate such as an insurance rate or a discount
///
/// Insurer rules express rates in percent (`0.5` means 0.5%); internally the
/// rate is held as a fraction so it can be applied to money directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rate {
    /// The rate as a fraction (e.g., 0.005 for 0.5%)
    value: Decimal,
}

impl Rate {
    /// Creates a rate from a fraction (e.g., 0.05 for 5%)
    pub fn new(value: Decimal) -> Self {
        Self { value }
    }

    /// Creates a rate from a percentage (e.g., 5.0 for 5%)
    pub fn from_percentage(percentage: Decimal) -> Self {
        Self {
            value: percentage / dec!(100),
        }
    }

    pub fn zero() -> Self {
        Self { value: dec!(0) }
    }

    pub fn as_decimal(&self) -> Decimal {
        self.value
    }

    pub fn as_percentage(&self) -> Decimal {
        self.value * dec!(100)
    }

    /// Scales the rate by a factor (risk loading or discount)
    pub fn checked_scale(&self, factor: Decimal) -> Result<Rate, MoneyError> {
        let value = self.value.checked_mul(factor).ok_or(MoneyError::Overflow)?;
        Ok(Self { value })
    }

    /// Applies this rate to a money amount
    pub fn apply(&self, money: &Money) -> Result<Money, MoneyError> {
        money.checked_multiply(self.value)
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.as_percentage().round_dp(4).normalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_creation() {
        let m = Money::new(dec!(100.50), Currency::BRL);
        assert_eq!(m.amount(), dec!(100.50));
        assert_eq!(m.currency(), Currency::BRL);
    }

    #[test]
    fn test_money_arithmetic() {
        let a = Money::brl(dec!(100.00));
        let b = Money::brl(dec!(50.00));

        assert_eq!(a.checked_add(&b).unwrap().amount(), dec!(150.00));
        assert_eq!(a.checked_sub(&b).unwrap().amount(), dec!(50.00));
    }

    #[test]
    fn test_currency_mismatch() {
        let brl = Money::brl(dec!(100.00));
        let usd = Money::new(dec!(100.00), Currency::USD);

        assert!(matches!(brl.checked_add(&usd), Err(MoneyError::CurrencyMismatch(_, _))));
        assert!(matches!(brl.min(&usd), Err(MoneyError::CurrencyMismatch(_, _))));
    }

    #[test]
    fn test_min_max() {
        let a = Money::brl(dec!(10));
        let b = Money::brl(dec!(20));
        assert_eq!(a.min(&b).unwrap(), a);
        assert_eq!(a.max(&b).unwrap(), b);
    }

    #[test]
    fn test_overflow_is_reported() {
        let huge = Money::brl(Decimal::MAX);
        assert_eq!(huge.checked_multiply(dec!(2)), Err(MoneyError::Overflow));
    }

    #[test]
    fn test_rate_application() {
        let rate = Rate::from_percentage(dec!(0.5));
        let revenue = Money::brl(dec!(200000));

        assert_eq!(rate.apply(&revenue).unwrap().amount(), dec!(1000));
        assert_eq!(rate.as_percentage(), dec!(0.5));
    }

    #[test]
    fn test_rate_display() {
        let rate = Rate::from_percentage(dec!(0.625));
        assert_eq!(rate.to_string(), "0.625%");
    }

    #[test]
    fn test_rounded_rounds_once() {
        // 1351.70500191 would become 1351.7050 at storage scale, then 1351.70
        let exact = dec!(1351.7050019130);
        assert_eq!(Money::rounded(exact, Currency::BRL).amount(), dec!(1351.71));
        assert_eq!(Money::brl(exact).round_to_currency().amount(), dec!(1351.70));
    }

    #[test]
    fn test_round_to_currency_half_even() {
        assert_eq!(Money::brl(dec!(10.125)).round_to_currency().amount(), dec!(10.12));
        assert_eq!(Money::brl(dec!(10.135)).round_to_currency().amount(), dec!(10.14));
    }
}
