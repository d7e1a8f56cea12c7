//! Quote requests and results
//!
//! A quote request is versioned: every edit after the lineage is locked
//! produces a successor linked to its predecessor, and exactly one version
//! per lineage is current. Results are immutable computed offers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{InsurerId, Money, QuoteRequestId, QuoteResultId, Rate, UserId};

use crate::error::RatingError;
use crate::premium::OfferedLimits;
use crate::risk::RiskTier;

/// Client identity as captured on the request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientDetails {
    pub name: String,
    /// CNPJ or CPF
    pub document: String,
    pub address: Option<String>,
    pub contact: Option<String>,
}

/// Limits the client asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedLimits {
    pub general: Money,
    pub container: Option<Money>,
    pub rj_operation: Option<Money>,
}

/// Input for a new request or a revision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteDetails {
    pub client: ClientDetails,
    pub cargo_type: String,
    /// Average value per shipment
    pub cargo_value: Money,
    pub monthly_revenue: Money,
    pub origin: String,
    pub destination: String,
    pub limits: RequestedLimits,
}

impl QuoteDetails {
    /// Rejects blank text and non-positive amounts
    pub fn validate(&self) -> Result<(), RatingError> {
        let required = [
            ("client name", &self.client.name),
            ("client document", &self.client.document),
            ("cargo type", &self.cargo_type),
            ("origin", &self.origin),
            ("destination", &self.destination),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(RatingError::validation(format!("{} is required", field)));
            }
        }

        let positive = [
            ("cargo value", Some(&self.cargo_value)),
            ("monthly revenue", Some(&self.monthly_revenue)),
            ("general limit", Some(&self.limits.general)),
            ("container limit", self.limits.container.as_ref()),
            ("RJ operation limit", self.limits.rj_operation.as_ref()),
        ];
        for (field, amount) in positive {
            if let Some(amount) = amount {
                if !amount.is_positive() {
                    return Err(RatingError::validation(format!(
                        "{} must be greater than zero",
                        field
                    )));
                }
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub id: QuoteRequestId,
    /// Id of the first version; shared by every version of the lineage
    pub lineage_id: QuoteRequestId,
    pub version: u32,
    pub previous_version: Option<QuoteRequestId>,
    pub is_current: bool,
    pub requested_by: UserId,
    pub requested_at: DateTime<Utc>,
    pub details: QuoteDetails,
}

impl QuoteRequest {
    /// Starts a new lineage at version 1
    pub fn create(
        details: QuoteDetails,
        requested_by: UserId,
        now: DateTime<Utc>,
    ) -> Result<Self, RatingError> {
        details.validate()?;
        let id = QuoteRequestId::new_v7();
        Ok(Self {
            id,
            lineage_id: id,
            version: 1,
            previous_version: None,
            is_current: true,
            requested_by,
            requested_at: now,
            details,
        })
    }

    /// Creates the successor version and retires this one
    ///
    /// On error neither version is changed.
    pub fn new_version(
        &mut self,
        details: QuoteDetails,
        requested_by: UserId,
        now: DateTime<Utc>,
    ) -> Result<QuoteRequest, RatingError> {
        if !self.is_current {
            return Err(RatingError::NotCurrentVersion(self.id.to_string()));
        }
        details.validate()?;

        self.is_current = false;
        Ok(QuoteRequest {
            id: QuoteRequestId::new_v7(),
            lineage_id: self.lineage_id,
            version: self.version + 1,
            previous_version: Some(self.id),
            is_current: true,
            requested_by,
            requested_at: now,
            details,
        })
    }

    /// Overwrites this version's details
    ///
    /// Refused once any proposal on the lineage has reached an approved
    /// state; such changes must go through [`QuoteRequest::new_version`].
    pub fn edit_in_place(
        &mut self,
        details: QuoteDetails,
        lineage_locked: bool,
    ) -> Result<(), RatingError> {
        if lineage_locked {
            return Err(RatingError::VersionLocked(self.id.to_string()));
        }
        if !self.is_current {
            return Err(RatingError::NotCurrentVersion(self.id.to_string()));
        }
        details.validate()?;
        self.details = details;
        Ok(())
    }
}

/// One insurer's computed offer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteResult {
    pub id: QuoteResultId,
    pub quote_request_id: QuoteRequestId,
    pub insurer_id: InsurerId,
    pub insurer_name: String,
    pub rctr_c_rate: Rate,
    pub rc_dc_rate: Rate,
    pub limits: OfferedLimits,
    pub rctr_c_franchise: String,
    pub rc_dc_franchise: String,
    /// Monthly premium after the minimum floor
    pub premium: Money,
    pub minimum_applied: bool,
    pub risk_tier: RiskTier,
    pub high_risk_route: bool,
    pub observations: String,
}

impl QuoteResult {
    /// Result ids depend only on the request and insurer, so re-rating the
    /// same request yields the same ids
    pub fn id_for(request: QuoteRequestId, insurer: InsurerId) -> QuoteResultId {
        QuoteResultId::derived(request.as_uuid(), insurer.as_uuid().as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn details() -> QuoteDetails {
        QuoteDetails {
            client: ClientDetails {
                name: "Transportes Silva".to_string(),
                document: "12.345.678/0001-90".to_string(),
                address: None,
                contact: None,
            },
            cargo_type: "Electronics".to_string(),
            cargo_value: Money::brl(dec!(50000)),
            monthly_revenue: Money::brl(dec!(200000)),
            origin: "Rio de Janeiro".to_string(),
            destination: "Curitiba".to_string(),
            limits: RequestedLimits {
                general: Money::brl(dec!(500000)),
                container: None,
                rj_operation: None,
            },
        }
    }

    #[test]
    fn test_create_starts_lineage() {
        let request = QuoteRequest::create(details(), UserId::new(), Utc::now()).unwrap();
        assert_eq!(request.version, 1);
        assert_eq!(request.lineage_id, request.id);
        assert!(request.is_current);
        assert!(request.previous_version.is_none());
    }

    #[test]
    fn test_validation_rejects_non_positive_amounts() {
        let mut input = details();
        input.monthly_revenue = Money::brl(dec!(0));
        assert!(matches!(
            QuoteRequest::create(input, UserId::new(), Utc::now()),
            Err(RatingError::Validation(_))
        ));

        let mut input = details();
        input.limits.container = Some(Money::brl(dec!(-1)));
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_blank_text() {
        let mut input = details();
        input.origin = "  ".to_string();
        let err = input.validate().unwrap_err();
        assert!(err.to_string().contains("origin"));
    }

    #[test]
    fn test_new_version_links_and_retires_predecessor() {
        let mut first = QuoteRequest::create(details(), UserId::new(), Utc::now()).unwrap();
        let mut changed = details();
        changed.monthly_revenue = Money::brl(dec!(300000));

        let second = first.new_version(changed, UserId::new(), Utc::now()).unwrap();
        assert!(!first.is_current);
        assert!(second.is_current);
        assert_eq!(second.version, 2);
        assert_eq!(second.previous_version, Some(first.id));
        assert_eq!(second.lineage_id, first.lineage_id);

        assert!(matches!(
            first.new_version(details(), UserId::new(), Utc::now()),
            Err(RatingError::NotCurrentVersion(_))
        ));
    }

    #[test]
    fn test_failed_new_version_leaves_predecessor_current() {
        let mut first = QuoteRequest::create(details(), UserId::new(), Utc::now()).unwrap();
        let mut invalid = details();
        invalid.cargo_value = Money::brl(dec!(0));
        assert!(first.new_version(invalid, UserId::new(), Utc::now()).is_err());
        assert!(first.is_current);
    }

    #[test]
    fn test_edit_in_place_respects_lock() {
        let mut request = QuoteRequest::create(details(), UserId::new(), Utc::now()).unwrap();
        let mut changed = details();
        changed.destination = "Manaus".to_string();

        assert!(matches!(
            request.edit_in_place(changed.clone(), true),
            Err(RatingError::VersionLocked(_))
        ));
        assert_eq!(request.details.destination, "Curitiba");

        request.edit_in_place(changed, false).unwrap();
        assert_eq!(request.details.destination, "Manaus");
    }

    #[test]
    fn test_result_ids_are_stable() {
        let request = QuoteRequestId::new();
        let insurer = InsurerId::new();
        assert_eq!(QuoteResult::id_for(request, insurer), QuoteResult::id_for(request, insurer));
        assert_ne!(QuoteResult::id_for(request, insurer), QuoteResult::id_for(request, InsurerId::new()));
    }
}
