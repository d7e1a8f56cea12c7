//! Risk classification
//!
//! Two independent signals feed the rate adjuster and the conditions
//! composer: the merchandise risk tier and whether the route touches a
//! high-risk city.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::catalogue::CatalogueSnapshot;
use crate::error::RatingError;

/// Risk tier of a merchandise type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskTier {
    Low,
    Moderate,
    High,
    Extreme,
}

impl RiskTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTier::Low => "LOW",
            RiskTier::Moderate => "MODERATE",
            RiskTier::High => "HIGH",
            RiskTier::Extreme => "EXTREME",
        }
    }

    /// Tiers that load the base rates
    pub fn is_loaded(&self) -> bool {
        matches!(self, RiskTier::High | RiskTier::Extreme)
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskTier {
    type Err = RatingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOW" => Ok(RiskTier::Low),
            "MODERATE" => Ok(RiskTier::Moderate),
            "HIGH" => Ok(RiskTier::High),
            "EXTREME" => Ok(RiskTier::Extreme),
            other => Err(RatingError::validation(format!("unknown risk tier '{}'", other))),
        }
    }
}

/// Classifies routes and merchandise against one catalogue snapshot
#[derive(Debug, Clone, Copy)]
pub struct RiskClassifier<'a> {
    snapshot: &'a CatalogueSnapshot,
}

impl<'a> RiskClassifier<'a> {
    pub fn new(snapshot: &'a CatalogueSnapshot) -> Self {
        Self { snapshot }
    }

    /// True if any configured high-risk city appears in origin or destination
    ///
    /// Matching is a case-insensitive substring test, so "Rio de Janeiro - RJ"
    /// matches "RJ" and "Sorocaba" would match a city named "Caba". Blank city
    /// entries are ignored; an empty list never flags a route.
    pub fn is_high_risk_route(&self, origin: &str, destination: &str) -> bool {
        let origin = origin.to_lowercase();
        let destination = destination.to_lowercase();

        self.snapshot
            .high_risk_cities()
            .iter()
            .map(|city| city.trim().to_lowercase())
            .filter(|city| !city.is_empty())
            .any(|city| origin.contains(&city) || destination.contains(&city))
    }

    /// Risk tier of the named merchandise type
    pub fn merchandise_risk_tier(&self, merchandise_type: &str) -> Result<RiskTier, RatingError> {
        self.snapshot
            .merchandise_type(merchandise_type)
            .map(|m| m.risk_tier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue::MerchandiseType;
    use chrono::Utc;

    fn snapshot_with_cities(cities: &[&str]) -> CatalogueSnapshot {
        let mut snapshot = CatalogueSnapshot::empty(Utc::now());
        for city in cities {
            snapshot.add_risk_city(*city);
        }
        snapshot
    }

    #[test]
    fn test_origin_match_is_case_insensitive() {
        let snapshot = snapshot_with_cities(&["Rio de Janeiro"]);
        let classifier = RiskClassifier::new(&snapshot);
        assert!(classifier.is_high_risk_route("RIO DE JANEIRO", "Curitiba"));
    }

    #[test]
    fn test_destination_match() {
        let snapshot = snapshot_with_cities(&["Guarulhos"]);
        let classifier = RiskClassifier::new(&snapshot);
        assert!(classifier.is_high_risk_route("Curitiba", "Aeroporto de Guarulhos"));
    }

    #[test]
    fn test_substring_semantics_accept_false_positives() {
        let snapshot = snapshot_with_cities(&["Caba"]);
        let classifier = RiskClassifier::new(&snapshot);
        assert!(classifier.is_high_risk_route("Sorocaba", "Curitiba"));
    }

    #[test]
    fn test_empty_list_is_never_high_risk() {
        let snapshot = snapshot_with_cities(&[]);
        let classifier = RiskClassifier::new(&snapshot);
        assert!(!classifier.is_high_risk_route("Rio de Janeiro", "São Paulo"));
    }

    #[test]
    fn test_blank_city_entries_are_ignored() {
        let snapshot = snapshot_with_cities(&["", "   "]);
        let classifier = RiskClassifier::new(&snapshot);
        assert!(!classifier.is_high_risk_route("Curitiba", "Porto Alegre"));
    }

    #[test]
    fn test_merchandise_tier_lookup() {
        let mut snapshot = CatalogueSnapshot::empty(Utc::now());
        snapshot.add_merchandise_type(MerchandiseType::new("Electronics", RiskTier::High));
        let classifier = RiskClassifier::new(&snapshot);

        assert_eq!(classifier.merchandise_risk_tier("electronics").unwrap(), RiskTier::High);
        assert!(classifier.merchandise_risk_tier("Livestock").unwrap_err().is_not_found());
    }

    #[test]
    fn test_tier_parsing() {
        assert_eq!("extreme".parse::<RiskTier>().unwrap(), RiskTier::Extreme);
        assert!("volcanic".parse::<RiskTier>().is_err());
    }
}
