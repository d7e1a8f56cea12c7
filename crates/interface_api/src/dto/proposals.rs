//! Proposal DTOs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use domain_proposal::Proposal;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateProposalRequest {
    pub quote_result_id: Uuid,
    #[validate(email)]
    pub client_email: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct RejectProposalRequest {
    #[validate(length(max = 1000))]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposalResponse {
    pub id: Uuid,
    pub quote_request_id: Uuid,
    pub quote_result_id: Uuid,
    pub insurer_name: String,
    pub client_name: String,
    pub client_email: String,
    pub rctr_c_rate: Decimal,
    pub rc_dc_rate: Decimal,
    pub rctr_c_limit: Decimal,
    pub rc_dc_limit: Decimal,
    pub rctr_c_franchise: String,
    pub rc_dc_franchise: String,
    pub premium: Decimal,
    pub observations: String,
    pub payment_frequency: String,
    pub policy_duration_months: u32,
    pub valid_until: NaiveDate,
    pub status: String,
    /// Correlation id of the last queued document or email job
    pub job_id: Option<Uuid>,
    pub document_location: Option<String>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Proposal> for ProposalResponse {
    fn from(proposal: Proposal) -> Self {
        Self {
            id: *proposal.id.as_uuid(),
            quote_request_id: *proposal.quote_request_id.as_uuid(),
            quote_result_id: *proposal.quote_result_id.as_uuid(),
            insurer_name: proposal.insurer_name,
            client_name: proposal.client_name,
            client_email: proposal.client_email,
            rctr_c_rate: proposal.rctr_c_rate.as_percentage(),
            rc_dc_rate: proposal.rc_dc_rate.as_percentage(),
            rctr_c_limit: proposal.rctr_c_limit.amount(),
            rc_dc_limit: proposal.rc_dc_limit.amount(),
            rctr_c_franchise: proposal.rctr_c_franchise,
            rc_dc_franchise: proposal.rc_dc_franchise,
            premium: proposal.premium.amount(),
            observations: proposal.observations,
            payment_frequency: proposal.payment_frequency,
            policy_duration_months: proposal.policy_duration_months,
            valid_until: proposal.valid_until,
            status: proposal.status.as_str().to_string(),
            job_id: proposal.job_id.map(|id| *id.as_uuid()),
            document_location: proposal.document.map(|d| d.location),
            rejection_reason: proposal.rejection_reason,
            created_at: proposal.created_at,
            updated_at: proposal.updated_at,
        }
    }
}
