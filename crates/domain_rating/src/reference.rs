//! Reference data defaults
//!
//! Values a fresh deployment is provisioned with. Rating itself only reads
//! them through the catalogue; nothing here is consulted as a fallback.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::catalogue::CatalogueSnapshot;

/// System parameter: monthly revenue above which a client is premium
pub const PREMIUM_CLIENT_THRESHOLD_KEY: &str = "PREMIUM_CLIENT_MONTHLY_REVENUE_THRESHOLD";

pub const HIGH_RISK_OPERATION: &str = "HIGH_RISK_OPERATION";
pub const PREMIUM_CLIENT_SPECIAL_CONDITIONS: &str = "PREMIUM_CLIENT_SPECIAL_CONDITIONS";

pub const DEFAULT_PREMIUM_CLIENT_THRESHOLD: Decimal = dec!(1000000);

pub const DEFAULT_FRANCHISE_PERCENTAGE: Decimal = dec!(10.00);
pub const DEFAULT_FRANCHISE_MINIMUM: Decimal = dec!(1000.00);

pub const DEFAULT_RISK_CITIES: &[&str] = &[
    "Rio de Janeiro",
    "RJ",
    "São Paulo",
    "SP",
    "Guarulhos",
    "Duque de Caxias",
];

/// (code, text) pairs for the special conditions the composer references
pub const DEFAULT_SPECIAL_CONDITIONS: &[(&str, &str)] = &[
    (
        HIGH_RISK_OPERATION,
        "Operação de alto risco - franquia diferenciada",
    ),
    (
        PREMIUM_CLIENT_SPECIAL_CONDITIONS,
        "Cliente premium - condições especiais disponíveis",
    ),
];

/// (key, value, description) triples for system parameters
pub fn default_system_parameters() -> Vec<(&'static str, String, &'static str)> {
    vec![(
        PREMIUM_CLIENT_THRESHOLD_KEY,
        DEFAULT_PREMIUM_CLIENT_THRESHOLD.to_string(),
        "Monthly revenue threshold for a client to be considered premium.",
    )]
}

/// A snapshot holding only the default ancillary data (no insurers or rules)
pub fn seeded_snapshot(taken_at: DateTime<Utc>) -> CatalogueSnapshot {
    let mut snapshot = CatalogueSnapshot::empty(taken_at);
    for city in DEFAULT_RISK_CITIES {
        snapshot.add_risk_city(*city);
    }
    for (code, text) in DEFAULT_SPECIAL_CONDITIONS {
        snapshot.add_special_condition(*code, *text);
    }
    for (key, value, _) in default_system_parameters() {
        snapshot.set_parameter(key, value);
    }
    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_snapshot_has_ancillary_data() {
        let snapshot = seeded_snapshot(Utc::now());
        assert_eq!(snapshot.high_risk_cities().len(), DEFAULT_RISK_CITIES.len());
        assert!(snapshot.special_condition(HIGH_RISK_OPERATION).is_ok());
        assert_eq!(
            snapshot.decimal_parameter(PREMIUM_CLIENT_THRESHOLD_KEY).unwrap(),
            dec!(1000000)
        );
        assert_eq!(snapshot.active_insurers().count(), 0);
    }
}
