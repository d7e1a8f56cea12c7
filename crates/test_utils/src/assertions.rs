//! Custom Test Assertions
//!
//! Assertion helpers for the rating invariants, with messages that name the
//! insurer and the amounts involved.

use rust_decimal::Decimal;

use core_kernel::Money;
use domain_rating::{Insurer, QuoteResult, RequestedLimits};

/// Asserts two Money values share a currency and differ by at most `tolerance`
pub fn assert_money_approx_eq(actual: &Money, expected: &Money, tolerance: Decimal) {
    assert_eq!(
        actual.currency(),
        expected.currency(),
        "Currency mismatch: actual={}, expected={}",
        actual.currency(),
        expected.currency()
    );
    let diff = (actual.amount() - expected.amount()).abs();
    assert!(
        diff <= tolerance,
        "Money amounts differ by more than tolerance: actual={}, expected={}, diff={}",
        actual.amount(),
        expected.amount(),
        diff
    );
}

/// Asserts the premium respects the insurer's minimum
pub fn assert_premium_floor(result: &QuoteResult, insurer: &Insurer) {
    assert!(
        result.premium.amount() >= insurer.minimum_premium.amount(),
        "{}: premium {} below minimum {}",
        insurer.name,
        result.premium,
        insurer.minimum_premium
    );
}

/// Asserts every offered limit is within both the request and the insurer maxima
pub fn assert_limits_capped(result: &QuoteResult, requested: &RequestedLimits, insurer: &Insurer) {
    let checks = [
        ("RCTR-C", result.limits.rctr_c, requested.general, insurer.max_rctr_c_limit),
        ("RC-DC", result.limits.rc_dc, requested.general, insurer.max_rc_dc_limit),
    ];
    for (coverage, offered, asked, max) in checks {
        assert!(
            offered.amount() <= asked.amount() && offered.amount() <= max.amount(),
            "{} {}: offered {} exceeds min(requested {}, max {})",
            insurer.name,
            coverage,
            offered,
            asked,
            max
        );
    }
}
