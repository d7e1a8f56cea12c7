//! Test Fixtures
//!
//! A small, fully known catalogue used by scenario tests across crates.
//!
//! | Insurer | Electronics (HIGH)                  | Grain (LOW)  | Min premium |
//! |---------|-------------------------------------|--------------|-------------|
//! | Alpha   | 0.5% / 0.3%, x1.25                  | 0.2% / 0.1%  | 150.00      |
//! | Beta    | 0.4% / 0.25%, x1.3, 10% over 500k   | excluded     | 300.00      |
//! | Gamma   | inactive insurer                    |              |             |

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal_macros::dec;

use core_kernel::{Money, UserId};
use domain_rating::reference::seeded_snapshot;
use domain_rating::{
    CatalogueSnapshot, ClientDetails, Insurer, InsurerBusinessRule, MerchandiseType,
    QuoteDetails, QuoteRequest, RequestedLimits, RiskTier,
};

/// The scenario catalogue plus handles to its entities
#[derive(Debug, Clone)]
pub struct ScenarioCatalogue {
    pub snapshot: CatalogueSnapshot,
    pub alpha: Insurer,
    pub beta: Insurer,
    pub gamma: Insurer,
    pub electronics: MerchandiseType,
    pub grain: MerchandiseType,
}

pub struct CatalogueFixtures;

impl CatalogueFixtures {
    pub fn taken_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    pub fn electronics() -> MerchandiseType {
        MerchandiseType::new("Electronics", RiskTier::High)
    }

    pub fn grain() -> MerchandiseType {
        MerchandiseType::new("Grain", RiskTier::Low)
    }

    pub fn alpha() -> Insurer {
        Insurer::new(
            "Alpha Seguros",
            Money::brl(dec!(150.00)),
            Money::brl(dec!(1000000)),
            Money::brl(dec!(500000)),
        )
    }

    pub fn beta() -> Insurer {
        Insurer::new(
            "Beta Seguros",
            Money::brl(dec!(300.00)),
            Money::brl(dec!(400000)),
            Money::brl(dec!(250000)),
        )
    }

    pub fn gamma() -> Insurer {
        Insurer::new(
            "Gamma Seguros",
            Money::brl(dec!(100.00)),
            Money::brl(dec!(2000000)),
            Money::brl(dec!(2000000)),
        )
        .deactivated()
    }

    /// The catalogue described in the module table
    pub fn scenario() -> ScenarioCatalogue {
        let mut snapshot = seeded_snapshot(Self::taken_at());
        let (alpha, beta, gamma) = (Self::alpha(), Self::beta(), Self::gamma());
        let (electronics, grain) = (Self::electronics(), Self::grain());

        let rules = [
            InsurerBusinessRule::new(alpha.id, electronics.id, dec!(0.5), dec!(0.3))
                .with_high_risk_multiplier(dec!(1.25)),
            InsurerBusinessRule::new(alpha.id, grain.id, dec!(0.2), dec!(0.1)),
            InsurerBusinessRule::new(beta.id, electronics.id, dec!(0.4), dec!(0.25))
                .with_high_risk_multiplier(dec!(1.3))
                .with_volume_discount(Money::brl(dec!(500000)), dec!(10))
                .with_observations("Rastreamento obrigatório"),
            InsurerBusinessRule::new(beta.id, grain.id, dec!(0.2), dec!(0.2)).excluded(),
            InsurerBusinessRule::new(gamma.id, electronics.id, dec!(0.1), dec!(0.1)),
        ];
        for rule in rules {
            snapshot
                .add_rule(rule)
                .expect("fixture rules are unique per pair");
        }

        snapshot.add_merchandise_type(electronics.clone());
        snapshot.add_merchandise_type(grain.clone());
        snapshot.add_insurer(alpha.clone());
        snapshot.add_insurer(beta.clone());
        snapshot.add_insurer(gamma.clone());

        ScenarioCatalogue {
            snapshot,
            alpha,
            beta,
            gamma,
            electronics,
            grain,
        }
    }
}

pub struct QuoteFixtures;

impl QuoteFixtures {
    pub fn client() -> ClientDetails {
        ClientDetails {
            name: "Transportes Silva Ltda".to_string(),
            document: "12.345.678/0001-90".to_string(),
            address: Some("Rua das Flores, 100 - Curitiba/PR".to_string()),
            contact: Some("(41) 3333-4444".to_string()),
        }
    }

    /// Electronics from Rio de Janeiro to Curitiba, 200k monthly revenue
    pub fn details() -> QuoteDetails {
        QuoteDetails {
            client: Self::client(),
            cargo_type: "Electronics".to_string(),
            cargo_value: Money::brl(dec!(50000)),
            monthly_revenue: Money::brl(dec!(200000)),
            origin: "Rio de Janeiro".to_string(),
            destination: "Curitiba".to_string(),
            limits: RequestedLimits {
                general: Money::brl(dec!(600000)),
                container: None,
                rj_operation: None,
            },
        }
    }

    pub fn request(details: QuoteDetails) -> QuoteRequest {
        QuoteRequest::create(details, UserId::new(), CatalogueFixtures::taken_at())
            .expect("fixture details are valid")
    }

    pub const CLIENT_EMAIL: &'static str = "financeiro@transportessilva.com.br";
}
