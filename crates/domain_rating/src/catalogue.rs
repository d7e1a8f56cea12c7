//! Rule catalogue
//!
//! Reference data the engine rates against: insurers, merchandise types,
//! insurer business rules, high-risk cities, system parameters and special
//! condition texts. The engine never reads live storage; it works on a
//! [`CatalogueSnapshot`] taken once at the start of a rating run, so rule
//! edits made while a run is in progress are not observed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use core_kernel::{
    DomainPort, InsurerId, MerchandiseTypeId, Money, PortError, Rate, RuleId, ValidPeriod,
};

use crate::error::RatingError;
use crate::reference::{DEFAULT_FRANCHISE_MINIMUM, DEFAULT_FRANCHISE_PERCENTAGE};
use crate::risk::RiskTier;

/// A rating counterparty
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insurer {
    pub id: InsurerId,
    pub name: String,
    pub is_active: bool,
    /// Floor applied to every monthly premium this insurer quotes
    pub minimum_premium: Money,
    pub max_rctr_c_limit: Money,
    pub max_rc_dc_limit: Money,
}

impl Insurer {
    pub fn new(
        name: impl Into<String>,
        minimum_premium: Money,
        max_rctr_c_limit: Money,
        max_rc_dc_limit: Money,
    ) -> Self {
        Self {
            id: InsurerId::new(),
            name: name.into(),
            is_active: true,
            minimum_premium,
            max_rctr_c_limit,
            max_rc_dc_limit,
        }
    }

    pub fn deactivated(mut self) -> Self {
        self.is_active = false;
        self
    }
}

/// A cargo category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerchandiseType {
    pub id: MerchandiseTypeId,
    pub name: String,
    pub risk_tier: RiskTier,
    pub description: Option<String>,
}

impl MerchandiseType {
    pub fn new(name: impl Into<String>, risk_tier: RiskTier) -> Self {
        Self {
            id: MerchandiseTypeId::new(),
            name: name.into(),
            risk_tier,
            description: None,
        }
    }
}

/// The rating rule for one (insurer, merchandise type) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsurerBusinessRule {
    pub id: RuleId,
    pub insurer_id: InsurerId,
    pub merchandise_type_id: MerchandiseTypeId,
    pub rctr_c_base_rate: Rate,
    pub rc_dc_base_rate: Rate,
    /// Multiplier applied for HIGH tier; EXTREME uses 1.5 times this value
    pub high_risk_multiplier: Decimal,
    /// Revenue at or above which the discount applies; zero disables it
    pub volume_discount_threshold: Money,
    /// Discount in percent (5 means rates are multiplied by 0.95)
    pub volume_discount_rate: Decimal,
    /// Franchise in percent of the loss
    pub franchise_percentage: Decimal,
    pub franchise_minimum: Money,
    pub is_excluded: bool,
    pub is_active: bool,
    pub validity: ValidPeriod,
    pub observations: String,
}

impl InsurerBusinessRule {
    /// Creates a rule with base rates given in percent and neutral defaults
    /// for every other term
    pub fn new(
        insurer_id: InsurerId,
        merchandise_type_id: MerchandiseTypeId,
        rctr_c_percentage: Decimal,
        rc_dc_percentage: Decimal,
    ) -> Self {
        Self {
            id: RuleId::new(),
            insurer_id,
            merchandise_type_id,
            rctr_c_base_rate: Rate::from_percentage(rctr_c_percentage),
            rc_dc_base_rate: Rate::from_percentage(rc_dc_percentage),
            high_risk_multiplier: dec!(1.0),
            volume_discount_threshold: Money::brl(Decimal::ZERO),
            volume_discount_rate: Decimal::ZERO,
            franchise_percentage: DEFAULT_FRANCHISE_PERCENTAGE,
            franchise_minimum: Money::brl(DEFAULT_FRANCHISE_MINIMUM),
            is_excluded: false,
            is_active: true,
            validity: ValidPeriod::always(),
            observations: String::new(),
        }
    }

    pub fn with_high_risk_multiplier(mut self, multiplier: Decimal) -> Self {
        self.high_risk_multiplier = multiplier;
        self
    }

    pub fn with_volume_discount(mut self, threshold: Money, rate_percentage: Decimal) -> Self {
        self.volume_discount_threshold = threshold;
        self.volume_discount_rate = rate_percentage;
        self
    }

    pub fn with_franchise(mut self, percentage: Decimal, minimum: Money) -> Self {
        self.franchise_percentage = percentage;
        self.franchise_minimum = minimum;
        self
    }

    pub fn with_observations(mut self, observations: impl Into<String>) -> Self {
        self.observations = observations.into();
        self
    }

    pub fn with_validity(mut self, validity: ValidPeriod) -> Self {
        self.validity = validity;
        self
    }

    pub fn excluded(mut self) -> Self {
        self.is_excluded = true;
        self
    }

    pub fn deactivated(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Active and inside its validity window at `at`
    pub fn is_in_force(&self, at: DateTime<Utc>) -> bool {
        self.is_active && self.validity.contains(at)
    }
}

/// Read-only view of the catalogue for one rating run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogueSnapshot {
    taken_at: DateTime<Utc>,
    insurers: Vec<Insurer>,
    /// Keyed by normalised name
    merchandise_types: HashMap<String, MerchandiseType>,
    rules: HashMap<(InsurerId, MerchandiseTypeId), InsurerBusinessRule>,
    risk_cities: Vec<String>,
    parameters: HashMap<String, String>,
    special_conditions: HashMap<String, String>,
}

fn normalise(name: &str) -> String {
    name.trim().to_lowercase()
}

impl CatalogueSnapshot {
    pub fn empty(taken_at: DateTime<Utc>) -> Self {
        Self {
            taken_at,
            insurers: Vec::new(),
            merchandise_types: HashMap::new(),
            rules: HashMap::new(),
            risk_cities: Vec::new(),
            parameters: HashMap::new(),
            special_conditions: HashMap::new(),
        }
    }

    /// Instant the snapshot represents; rule validity is judged against it
    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }

    /// Returns a copy of this snapshot re-stamped at `taken_at`
    pub fn at(&self, taken_at: DateTime<Utc>) -> Self {
        Self {
            taken_at,
            ..self.clone()
        }
    }

    // ------------------------------------------------------------------
    // Assembly
    // ------------------------------------------------------------------

    pub fn add_insurer(&mut self, insurer: Insurer) {
        self.insurers.push(insurer);
    }

    pub fn add_merchandise_type(&mut self, merchandise_type: MerchandiseType) {
        self.merchandise_types
            .insert(normalise(&merchandise_type.name), merchandise_type);
    }

    /// Registers a rule; a second rule for the same pair is rejected
    pub fn add_rule(&mut self, rule: InsurerBusinessRule) -> Result<(), RatingError> {
        let key = (rule.insurer_id, rule.merchandise_type_id);
        if self.rules.contains_key(&key) {
            return Err(RatingError::DuplicateRule {
                insurer: rule.insurer_id.to_string(),
                merchandise_type: rule.merchandise_type_id.to_string(),
            });
        }
        self.rules.insert(key, rule);
        Ok(())
    }

    pub fn add_risk_city(&mut self, city: impl Into<String>) {
        self.risk_cities.push(city.into());
    }

    pub fn set_parameter(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.parameters.insert(key.into(), value.into());
    }

    pub fn add_special_condition(&mut self, code: impl Into<String>, text: impl Into<String>) {
        self.special_conditions.insert(code.into(), text.into());
    }

    // ------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------

    /// Active insurers in registration order
    ///
    /// The order is fixed for the lifetime of the snapshot, which keeps the
    /// orchestrator's output order deterministic.
    pub fn active_insurers(&self) -> impl Iterator<Item = &Insurer> {
        self.insurers.iter().filter(|insurer| insurer.is_active)
    }

    pub fn insurers(&self) -> &[Insurer] {
        &self.insurers
    }

    pub fn insurer(&self, id: InsurerId) -> Option<&Insurer> {
        self.insurers.iter().find(|insurer| insurer.id == id)
    }

    pub fn merchandise_type(&self, name: &str) -> Result<&MerchandiseType, RatingError> {
        self.merchandise_types
            .get(&normalise(name))
            .ok_or_else(|| RatingError::MerchandiseTypeNotFound(name.to_string()))
    }

    /// The rule for an insurer and a merchandise type name
    ///
    /// Returns the raw rule regardless of its active flag, validity window or
    /// exclusion; eligibility is judged by the engine.
    pub fn lookup(
        &self,
        insurer: &Insurer,
        merchandise_type: &str,
    ) -> Result<&InsurerBusinessRule, RatingError> {
        let merchandise = self.merchandise_type(merchandise_type)?;
        self.rules
            .get(&(insurer.id, merchandise.id))
            .ok_or_else(|| RatingError::RuleNotFound {
                insurer: insurer.name.clone(),
                merchandise_type: merchandise.name.clone(),
            })
    }

    pub fn rules(&self) -> impl Iterator<Item = &InsurerBusinessRule> {
        self.rules.values()
    }

    pub fn high_risk_cities(&self) -> &[String] {
        &self.risk_cities
    }

    pub fn system_parameter(&self, key: &str) -> Result<&str, RatingError> {
        self.parameters
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| RatingError::ParameterNotFound(key.to_string()))
    }

    /// A system parameter interpreted as a decimal
    pub fn decimal_parameter(&self, key: &str) -> Result<Decimal, RatingError> {
        let raw = self.system_parameter(key)?;
        raw.trim()
            .parse::<Decimal>()
            .map_err(|_| RatingError::InvalidParameter {
                key: key.to_string(),
                value: raw.to_string(),
            })
    }

    pub fn special_condition(&self, code: &str) -> Result<&str, RatingError> {
        self.special_conditions
            .get(code)
            .map(String::as_str)
            .ok_or_else(|| RatingError::ConditionNotFound(code.to_string()))
    }
}

/// Source of catalogue snapshots
///
/// Implementations must return a consistent view: every collection in the
/// snapshot reflects the same point in time.
#[async_trait]
pub trait CataloguePort: DomainPort {
    async fn load_snapshot(&self) -> Result<CatalogueSnapshot, PortError>;
}

/// In-memory catalogue for tests and local runs
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    #[derive(Debug, Clone)]
    pub struct InMemoryCatalogue {
        snapshot: Arc<RwLock<CatalogueSnapshot>>,
        fail_loads: Arc<RwLock<bool>>,
    }

    impl InMemoryCatalogue {
        pub fn new(snapshot: CatalogueSnapshot) -> Self {
            Self {
                snapshot: Arc::new(RwLock::new(snapshot)),
                fail_loads: Arc::new(RwLock::new(false)),
            }
        }

        /// Swaps the whole catalogue; snapshots already handed out are unaffected
        pub async fn replace(&self, snapshot: CatalogueSnapshot) {
            *self.snapshot.write().await = snapshot;
        }

        /// Makes subsequent loads fail as if the store were down
        pub async fn set_unavailable(&self, unavailable: bool) {
            *self.fail_loads.write().await = unavailable;
        }
    }

    impl DomainPort for InMemoryCatalogue {}

    #[async_trait]
    impl CataloguePort for InMemoryCatalogue {
        async fn load_snapshot(&self) -> Result<CatalogueSnapshot, PortError> {
            if *self.fail_loads.read().await {
                return Err(PortError::unavailable("catalogue"));
            }
            let snapshot = self.snapshot.read().await;
            Ok(snapshot.at(Utc::now()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn insurer(name: &str) -> Insurer {
        Insurer::new(
            name,
            Money::brl(dec!(150)),
            Money::brl(dec!(1000000)),
            Money::brl(dec!(500000)),
        )
    }

    #[test]
    fn test_lookup_resolves_merchandise_case_insensitively() {
        let mut snapshot = CatalogueSnapshot::empty(Utc::now());
        let ins = insurer("Porto");
        let merch = MerchandiseType::new("Electronics", RiskTier::High);
        let rule = InsurerBusinessRule::new(ins.id, merch.id, dec!(0.5), dec!(0.3));
        snapshot.add_insurer(ins.clone());
        snapshot.add_merchandise_type(merch);
        snapshot.add_rule(rule.clone()).unwrap();

        assert_eq!(snapshot.lookup(&ins, " ELECTRONICS ").unwrap(), &rule);
    }

    #[test]
    fn test_lookup_missing_rule_and_type() {
        let mut snapshot = CatalogueSnapshot::empty(Utc::now());
        let ins = insurer("Porto");
        snapshot.add_insurer(ins.clone());
        snapshot.add_merchandise_type(MerchandiseType::new("Grain", RiskTier::Low));

        assert!(matches!(
            snapshot.lookup(&ins, "Grain"),
            Err(RatingError::RuleNotFound { .. })
        ));
        assert!(matches!(
            snapshot.lookup(&ins, "Livestock"),
            Err(RatingError::MerchandiseTypeNotFound(_))
        ));
    }

    #[test]
    fn test_duplicate_rule_rejected() {
        let mut snapshot = CatalogueSnapshot::empty(Utc::now());
        let ins = insurer("Porto");
        let merch = MerchandiseType::new("Grain", RiskTier::Low);
        snapshot
            .add_rule(InsurerBusinessRule::new(ins.id, merch.id, dec!(0.1), dec!(0.1)))
            .unwrap();
        let second = snapshot.add_rule(InsurerBusinessRule::new(ins.id, merch.id, dec!(0.2), dec!(0.2)));
        assert!(matches!(second, Err(RatingError::DuplicateRule { .. })));
    }

    #[test]
    fn test_active_insurers_preserve_order_and_skip_inactive() {
        let mut snapshot = CatalogueSnapshot::empty(Utc::now());
        snapshot.add_insurer(insurer("B"));
        snapshot.add_insurer(insurer("A").deactivated());
        snapshot.add_insurer(insurer("C"));

        let names: Vec<_> = snapshot.active_insurers().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["B", "C"]);
    }

    #[test]
    fn test_decimal_parameter() {
        let mut snapshot = CatalogueSnapshot::empty(Utc::now());
        snapshot.set_parameter("THRESHOLD", " 1000000 ");
        snapshot.set_parameter("BROKEN", "a lot");

        assert_eq!(snapshot.decimal_parameter("THRESHOLD").unwrap(), dec!(1000000));
        assert!(matches!(
            snapshot.decimal_parameter("BROKEN"),
            Err(RatingError::InvalidParameter { .. })
        ));
        assert!(snapshot.decimal_parameter("MISSING").unwrap_err().is_not_found());
    }

    #[test]
    fn test_rule_in_force_window() {
        let now = Utc::now();
        let rule = InsurerBusinessRule::new(InsurerId::new(), MerchandiseTypeId::new(), dec!(0.1), dec!(0.1))
            .with_validity(ValidPeriod::bounded(now - Duration::days(10), now - Duration::days(1)).unwrap());
        assert!(!rule.is_in_force(now));
        assert!(rule.is_in_force(now - Duration::days(5)));
        assert!(!rule.clone().deactivated().is_in_force(now - Duration::days(5)));
    }

    #[tokio::test]
    async fn test_in_memory_catalogue_snapshots_are_isolated() {
        let catalogue = mock::InMemoryCatalogue::new(CatalogueSnapshot::empty(Utc::now()));
        let before = catalogue.load_snapshot().await.unwrap();

        let mut changed = CatalogueSnapshot::empty(Utc::now());
        changed.add_insurer(insurer("Late"));
        catalogue.replace(changed).await;

        assert_eq!(before.insurers().len(), 0);
        assert_eq!(catalogue.load_snapshot().await.unwrap().insurers().len(), 1);

        catalogue.set_unavailable(true).await;
        assert!(catalogue.load_snapshot().await.unwrap_err().is_transient());
    }
}
