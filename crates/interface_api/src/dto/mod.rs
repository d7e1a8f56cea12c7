//! Request and response bodies
//!
//! Requests derive `validator::Validate`; handlers validate before calling
//! the domain services. Responses flatten domain types into plain JSON with
//! rates as percentages and amounts as decimals.

pub mod quotes;
pub mod proposals;
pub mod audit;

use rust_decimal::Decimal;
use validator::ValidationError;

/// Amounts must be strictly positive
pub(crate) fn positive_amount(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_positive() && !value.is_zero() {
        Ok(())
    } else {
        let mut error = ValidationError::new("positive");
        error.message = Some("must be greater than zero".into());
        Err(error)
    }
}
