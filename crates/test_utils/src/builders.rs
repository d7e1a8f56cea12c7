//! Test Data Builders
//!
//! Builders with realistic random defaults (via `fake`) so tests only spell
//! out the fields they care about.

use fake::faker::address::en::CityName;
use fake::faker::company::en::CompanyName;
use fake::Fake;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::Money;
use domain_rating::{ClientDetails, Insurer, QuoteDetails, RequestedLimits};

/// Builder for quote request details
pub struct QuoteDetailsBuilder {
    details: QuoteDetails,
}

impl Default for QuoteDetailsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl QuoteDetailsBuilder {
    pub fn new() -> Self {
        let company: String = CompanyName().fake();
        let origin: String = CityName().fake();
        let destination: String = CityName().fake();
        Self {
            details: QuoteDetails {
                client: ClientDetails {
                    name: company,
                    document: "11.222.333/0001-81".to_string(),
                    address: None,
                    contact: None,
                },
                cargo_type: "Electronics".to_string(),
                cargo_value: Money::brl(dec!(25000)),
                monthly_revenue: Money::brl(dec!(100000)),
                origin,
                destination,
                limits: RequestedLimits {
                    general: Money::brl(dec!(300000)),
                    container: None,
                    rj_operation: None,
                },
            },
        }
    }

    pub fn cargo_type(mut self, cargo_type: impl Into<String>) -> Self {
        self.details.cargo_type = cargo_type.into();
        self
    }

    pub fn monthly_revenue(mut self, amount: Decimal) -> Self {
        self.details.monthly_revenue = Money::brl(amount);
        self
    }

    pub fn cargo_value(mut self, amount: Decimal) -> Self {
        self.details.cargo_value = Money::brl(amount);
        self
    }

    pub fn route(mut self, origin: impl Into<String>, destination: impl Into<String>) -> Self {
        self.details.origin = origin.into();
        self.details.destination = destination.into();
        self
    }

    pub fn general_limit(mut self, amount: Decimal) -> Self {
        self.details.limits.general = Money::brl(amount);
        self
    }

    pub fn container_limit(mut self, amount: Decimal) -> Self {
        self.details.limits.container = Some(Money::brl(amount));
        self
    }

    pub fn rj_operation_limit(mut self, amount: Decimal) -> Self {
        self.details.limits.rj_operation = Some(Money::brl(amount));
        self
    }

    pub fn client_name(mut self, name: impl Into<String>) -> Self {
        self.details.client.name = name.into();
        self
    }

    pub fn build(self) -> QuoteDetails {
        self.details
    }
}

/// Builder for insurers
pub struct InsurerBuilder {
    name: String,
    minimum_premium: Decimal,
    max_rctr_c: Decimal,
    max_rc_dc: Decimal,
    active: bool,
}

impl Default for InsurerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl InsurerBuilder {
    pub fn new() -> Self {
        let name: String = CompanyName().fake();
        Self {
            name,
            minimum_premium: dec!(150),
            max_rctr_c: dec!(1000000),
            max_rc_dc: dec!(1000000),
            active: true,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn minimum_premium(mut self, amount: Decimal) -> Self {
        self.minimum_premium = amount;
        self
    }

    pub fn max_limits(mut self, rctr_c: Decimal, rc_dc: Decimal) -> Self {
        self.max_rctr_c = rctr_c;
        self.max_rc_dc = rc_dc;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    pub fn build(self) -> Insurer {
        let insurer = Insurer::new(
            self.name,
            Money::brl(self.minimum_premium),
            Money::brl(self.max_rctr_c),
            Money::brl(self.max_rc_dc),
        );
        if self.active {
            insurer
        } else {
            insurer.deactivated()
        }
    }
}
