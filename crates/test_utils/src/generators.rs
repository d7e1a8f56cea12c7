//! Property-Based Test Generators
//!
//! Proptest strategies that produce values satisfying the input invariants
//! (positive amounts, sane rates) so properties exercise rating, not
//! validation.

use proptest::prelude::*;
use rust_decimal::Decimal;

use core_kernel::Money;
use domain_proposal::{ProposalOperation, ProposalStatus};
use domain_rating::RiskTier;

/// Positive BRL amount between 0.01 and `max_units` reais
pub fn positive_brl_strategy(max_units: i64) -> impl Strategy<Value = Money> {
    (1i64..=max_units * 100).prop_map(|cents| Money::brl(Decimal::new(cents, 2)))
}

/// Monthly revenue from 1,000.00 to 5,000,000.00
pub fn monthly_revenue_strategy() -> impl Strategy<Value = Money> {
    (100_000i64..500_000_000i64).prop_map(|cents| Money::brl(Decimal::new(cents, 2)))
}

/// Base rate in percent, 0.0001% to 5%
pub fn rate_percentage_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..=50_000i64).prop_map(|n| Decimal::new(n, 4))
}

/// High-risk multiplier from 1.00 to 3.00
pub fn multiplier_strategy() -> impl Strategy<Value = Decimal> {
    (100i64..=300i64).prop_map(|n| Decimal::new(n, 2))
}

/// Volume discount in percent, 0% to 50%
pub fn discount_percentage_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..=5_000i64).prop_map(|n| Decimal::new(n, 2))
}

pub fn risk_tier_strategy() -> impl Strategy<Value = RiskTier> {
    prop_oneof![
        Just(RiskTier::Low),
        Just(RiskTier::Moderate),
        Just(RiskTier::High),
        Just(RiskTier::Extreme),
    ]
}

pub fn proposal_status_strategy() -> impl Strategy<Value = ProposalStatus> {
    proptest::sample::select(ProposalStatus::ALL.to_vec())
}

pub fn proposal_operation_strategy() -> impl Strategy<Value = ProposalOperation> {
    prop_oneof![
        Just(ProposalOperation::Approve),
        Just(ProposalOperation::Reject),
        Just(ProposalOperation::RequestDocument),
        Just(ProposalOperation::CompleteDocument),
        Just(ProposalOperation::ConfirmRejection),
        Just(ProposalOperation::RevertRejection),
        Just(ProposalOperation::RevertDocumentRequest(ProposalStatus::Pending)),
        Just(ProposalOperation::RevertDocumentRequest(ProposalStatus::Approved)),
    ]
}
