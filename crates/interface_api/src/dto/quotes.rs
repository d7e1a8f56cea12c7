//! Quote DTOs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use core_kernel::Money;
use domain_rating::{
    ClientDetails, QuoteDetails, QuoteRequest, QuoteResult, RatedQuote, RequestedLimits,
    SkippedInsurer,
};

use super::positive_amount;

/// Body of quote creation, new version and edit
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct QuoteRequestBody {
    #[validate(length(min = 1, max = 200))]
    pub client_name: String,
    /// CNPJ or CPF
    #[validate(length(min = 11, max = 18))]
    pub client_document: String,
    #[validate(length(max = 500))]
    pub client_address: Option<String>,
    #[validate(length(max = 200))]
    pub client_contact: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub cargo_type: String,
    #[validate(custom(function = "positive_amount"))]
    pub cargo_value: Decimal,
    #[validate(custom(function = "positive_amount"))]
    pub monthly_revenue: Decimal,
    #[validate(length(min = 1, max = 200))]
    pub origin: String,
    #[validate(length(min = 1, max = 200))]
    pub destination: String,
    #[validate(custom(function = "positive_amount"))]
    pub general_limit: Decimal,
    #[validate(custom(function = "positive_amount"))]
    pub container_limit: Option<Decimal>,
    #[validate(custom(function = "positive_amount"))]
    pub rj_operation_limit: Option<Decimal>,
}

impl QuoteRequestBody {
    pub fn into_details(self) -> QuoteDetails {
        QuoteDetails {
            client: ClientDetails {
                name: self.client_name,
                document: self.client_document,
                address: self.client_address,
                contact: self.client_contact,
            },
            cargo_type: self.cargo_type,
            cargo_value: Money::brl(self.cargo_value),
            monthly_revenue: Money::brl(self.monthly_revenue),
            origin: self.origin,
            destination: self.destination,
            limits: RequestedLimits {
                general: Money::brl(self.general_limit),
                container: self.container_limit.map(Money::brl),
                rj_operation: self.rj_operation_limit.map(Money::brl),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteResponse {
    pub id: Uuid,
    pub lineage_id: Uuid,
    pub version: u32,
    pub previous_version: Option<Uuid>,
    pub is_current: bool,
    pub requested_at: DateTime<Utc>,
    pub client_name: String,
    pub cargo_type: String,
    pub origin: String,
    pub destination: String,
    pub monthly_revenue: Decimal,
    pub offers: Vec<OfferResponse>,
    /// Insurers left out of this rating run; empty when read back later
    pub skipped: Vec<SkippedResponse>,
}

impl QuoteResponse {
    fn from_parts(request: QuoteRequest, results: Vec<QuoteResult>, skipped: Vec<SkippedInsurer>) -> Self {
        Self {
            id: *request.id.as_uuid(),
            lineage_id: *request.lineage_id.as_uuid(),
            version: request.version,
            previous_version: request.previous_version.map(|id| *id.as_uuid()),
            is_current: request.is_current,
            requested_at: request.requested_at,
            client_name: request.details.client.name,
            cargo_type: request.details.cargo_type,
            origin: request.details.origin,
            destination: request.details.destination,
            monthly_revenue: request.details.monthly_revenue.amount(),
            offers: results.into_iter().map(OfferResponse::from).collect(),
            skipped: skipped.into_iter().map(SkippedResponse::from).collect(),
        }
    }
}

impl From<RatedQuote> for QuoteResponse {
    fn from(rated: RatedQuote) -> Self {
        Self::from_parts(rated.request, rated.results, rated.skipped)
    }
}

/// One insurer's offer; rates are percentages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfferResponse {
    pub id: Uuid,
    pub insurer_id: Uuid,
    pub insurer_name: String,
    pub rctr_c_rate: Decimal,
    pub rc_dc_rate: Decimal,
    pub rctr_c_limit: Decimal,
    pub rc_dc_limit: Decimal,
    pub container_limit: Option<Decimal>,
    pub rj_operation_limit: Option<Decimal>,
    pub rctr_c_franchise: String,
    pub rc_dc_franchise: String,
    pub premium: Decimal,
    pub minimum_applied: bool,
    pub risk_tier: String,
    pub high_risk_route: bool,
    pub observations: String,
}

impl From<QuoteResult> for OfferResponse {
    fn from(result: QuoteResult) -> Self {
        Self {
            id: *result.id.as_uuid(),
            insurer_id: *result.insurer_id.as_uuid(),
            insurer_name: result.insurer_name,
            rctr_c_rate: result.rctr_c_rate.as_percentage(),
            rc_dc_rate: result.rc_dc_rate.as_percentage(),
            rctr_c_limit: result.limits.rctr_c.amount(),
            rc_dc_limit: result.limits.rc_dc.amount(),
            container_limit: result.limits.container.map(|m| m.amount()),
            rj_operation_limit: result.limits.rj_operation.map(|m| m.amount()),
            rctr_c_franchise: result.rctr_c_franchise,
            rc_dc_franchise: result.rc_dc_franchise,
            premium: result.premium.amount(),
            minimum_applied: result.minimum_applied,
            risk_tier: result.risk_tier.as_str().to_string(),
            high_risk_route: result.high_risk_route,
            observations: result.observations,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedResponse {
    pub insurer_id: Uuid,
    pub insurer_name: String,
    pub reason: String,
}

impl From<SkippedInsurer> for SkippedResponse {
    fn from(skipped: SkippedInsurer) -> Self {
        Self {
            insurer_id: *skipped.insurer_id.as_uuid(),
            insurer_name: skipped.insurer_name,
            reason: skipped.reason,
        }
    }
}
