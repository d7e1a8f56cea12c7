//! Special conditions composer
//!
//! Produces the observations text attached to a quote result. Clauses come
//! in a fixed order: the rule's own observations, the high-risk operation
//! clause, then the premium-client clause. Missing reference data drops the
//! clause with a warning.

use rust_decimal::Decimal;
use tracing::warn;

use core_kernel::Money;

use crate::catalogue::{CatalogueSnapshot, InsurerBusinessRule};
use crate::reference::{
    HIGH_RISK_OPERATION, PREMIUM_CLIENT_SPECIAL_CONDITIONS, PREMIUM_CLIENT_THRESHOLD_KEY,
};

pub const CLAUSE_SEPARATOR: &str = "; ";

pub struct ConditionsComposer<'a> {
    snapshot: &'a CatalogueSnapshot,
}

impl<'a> ConditionsComposer<'a> {
    pub fn new(snapshot: &'a CatalogueSnapshot) -> Self {
        Self { snapshot }
    }

    /// Ordered clauses for one insurer's result
    pub fn clauses(
        &self,
        rule: &InsurerBusinessRule,
        high_risk_route: bool,
        monthly_revenue: &Money,
    ) -> Vec<String> {
        let mut clauses = Vec::new();

        let observations = rule.observations.trim();
        if !observations.is_empty() {
            clauses.push(observations.to_string());
        }

        if high_risk_route {
            if let Some(text) = self.condition_text(HIGH_RISK_OPERATION) {
                clauses.push(text);
            }
        }

        if let Some(threshold) = self.premium_client_threshold() {
            if monthly_revenue.amount() > threshold {
                if let Some(text) = self.condition_text(PREMIUM_CLIENT_SPECIAL_CONDITIONS) {
                    clauses.push(text);
                }
            }
        }

        clauses
    }

    /// Clauses joined with `"; "`
    pub fn compose(
        &self,
        rule: &InsurerBusinessRule,
        high_risk_route: bool,
        monthly_revenue: &Money,
    ) -> String {
        self.clauses(rule, high_risk_route, monthly_revenue)
            .join(CLAUSE_SEPARATOR)
    }

    fn condition_text(&self, code: &str) -> Option<String> {
        match self.snapshot.special_condition(code) {
            Ok(text) => Some(text.to_string()),
            Err(error) => {
                warn!(code, %error, "special condition missing; clause omitted");
                None
            }
        }
    }

    fn premium_client_threshold(&self) -> Option<Decimal> {
        match self.snapshot.decimal_parameter(PREMIUM_CLIENT_THRESHOLD_KEY) {
            Ok(threshold) => Some(threshold),
            Err(error) => {
                warn!(
                    key = PREMIUM_CLIENT_THRESHOLD_KEY,
                    %error,
                    "premium client threshold unavailable; clause omitted"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::seeded_snapshot;
    use chrono::Utc;
    use core_kernel::{InsurerId, MerchandiseTypeId};
    use rust_decimal_macros::dec;

    fn rule(observations: &str) -> InsurerBusinessRule {
        InsurerBusinessRule::new(InsurerId::new(), MerchandiseTypeId::new(), dec!(0.5), dec!(0.3))
            .with_observations(observations)
    }

    #[test]
    fn test_all_clauses_in_order() {
        let snapshot = seeded_snapshot(Utc::now());
        let composer = ConditionsComposer::new(&snapshot);
        let text = composer.compose(&rule("Escolta obrigatória"), true, &Money::brl(dec!(2000000)));
        assert_eq!(
            text,
            "Escolta obrigatória; Operação de alto risco - franquia diferenciada; \
             Cliente premium - condições especiais disponíveis"
        );
    }

    #[test]
    fn test_blank_observations_and_low_revenue_yield_empty_text() {
        let snapshot = seeded_snapshot(Utc::now());
        let composer = ConditionsComposer::new(&snapshot);
        assert_eq!(composer.compose(&rule("   "), false, &Money::brl(dec!(1000))), "");
    }

    #[test]
    fn test_threshold_is_strictly_exceeded() {
        let snapshot = seeded_snapshot(Utc::now());
        let composer = ConditionsComposer::new(&snapshot);
        assert!(composer
            .clauses(&rule(""), false, &Money::brl(dec!(1000000)))
            .is_empty());
        assert_eq!(
            composer
                .clauses(&rule(""), false, &Money::brl(dec!(1000000.01)))
                .len(),
            1
        );
    }

    #[test]
    fn test_missing_reference_data_omits_clauses() {
        let snapshot = CatalogueSnapshot::empty(Utc::now());
        let composer = ConditionsComposer::new(&snapshot);
        let clauses = composer.clauses(&rule("Base"), true, &Money::brl(dec!(5000000)));
        assert_eq!(clauses, vec!["Base".to_string()]);
    }

    #[test]
    fn test_unparsable_threshold_omits_premium_clause() {
        let mut snapshot = seeded_snapshot(Utc::now());
        snapshot.set_parameter(PREMIUM_CLIENT_THRESHOLD_KEY, "one million");
        let composer = ConditionsComposer::new(&snapshot);
        assert!(composer
            .clauses(&rule(""), false, &Money::brl(dec!(5000000)))
            .is_empty());
    }
}
