//! Proposal aggregate and status lifecycle
//!
//! ```text
//!  PENDING ──approve──▶ APPROVED ──request document──▶ PROCESSING ──complete──▶ COMPLETED
//!     │  └───────────────request document──────────────────▲
//!     └──reject──▶ REJECTING ──confirm──▶ REJECTED
//!                      └──revert──▶ PENDING
//! ```
//!
//! Every status change goes through [`ProposalOperation::apply`]; stores
//! persist the result with a compare-and-set on the source statuses.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{
    InsurerId, JobId, Money, ProposalId, QuoteRequestId, QuoteResultId, Rate, UserId,
};
use domain_rating::{QuoteRequest, QuoteResult};

use crate::error::ProposalError;
use crate::terms::ProposalTerms;

/// Proposal status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProposalStatus {
    Pending,
    Approved,
    /// Document generation in flight
    Processing,
    Completed,
    /// Rejection email in flight
    Rejecting,
    Rejected,
}

impl ProposalStatus {
    pub const ALL: [ProposalStatus; 6] = [
        ProposalStatus::Pending,
        ProposalStatus::Approved,
        ProposalStatus::Processing,
        ProposalStatus::Completed,
        ProposalStatus::Rejecting,
        ProposalStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProposalStatus::Pending => "PENDING",
            ProposalStatus::Approved => "APPROVED",
            ProposalStatus::Processing => "PROCESSING",
            ProposalStatus::Completed => "COMPLETED",
            ProposalStatus::Rejecting => "REJECTING",
            ProposalStatus::Rejected => "REJECTED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ProposalStatus::Completed | ProposalStatus::Rejected)
    }

    /// Statuses that freeze the quote lineage against in-place edits
    pub fn locks_lineage(&self) -> bool {
        matches!(
            self,
            ProposalStatus::Approved | ProposalStatus::Processing | ProposalStatus::Completed
        )
    }
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProposalStatus {
    type Err = ProposalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProposalStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ProposalError::validation(format!("unknown proposal status '{}'", s)))
    }
}

/// Operations that change a proposal's status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalOperation {
    Approve,
    Reject,
    RequestDocument,
    CompleteDocument,
    ConfirmRejection,
    RevertRejection,
    /// Undo a document request whose job could not be enqueued
    RevertDocumentRequest(ProposalStatus),
}

impl ProposalOperation {
    /// Statuses the operation may start from
    pub fn allowed_from(&self) -> &'static [ProposalStatus] {
        use ProposalStatus::*;
        match self {
            ProposalOperation::Approve => &[Pending],
            ProposalOperation::Reject => &[Pending],
            ProposalOperation::RequestDocument => &[Pending, Approved],
            ProposalOperation::CompleteDocument => &[Processing],
            ProposalOperation::ConfirmRejection => &[Rejecting],
            ProposalOperation::RevertRejection => &[Rejecting],
            ProposalOperation::RevertDocumentRequest(_) => &[Processing],
        }
    }

    pub fn target(&self) -> ProposalStatus {
        match self {
            ProposalOperation::Approve => ProposalStatus::Approved,
            ProposalOperation::Reject => ProposalStatus::Rejecting,
            ProposalOperation::RequestDocument => ProposalStatus::Processing,
            ProposalOperation::CompleteDocument => ProposalStatus::Completed,
            ProposalOperation::ConfirmRejection => ProposalStatus::Rejected,
            ProposalOperation::RevertRejection => ProposalStatus::Pending,
            ProposalOperation::RevertDocumentRequest(restore) => *restore,
        }
    }

    /// Resulting status when applied from `from`
    pub fn apply(&self, from: ProposalStatus) -> Result<ProposalStatus, ProposalError> {
        if let ProposalOperation::RevertDocumentRequest(restore) = self {
            if !ProposalOperation::RequestDocument.allowed_from().contains(restore) {
                return Err(ProposalError::validation(format!(
                    "a document request cannot be reverted to {}",
                    restore
                )));
            }
        }
        if self.allowed_from().contains(&from) {
            Ok(self.target())
        } else {
            Err(ProposalError::InvalidTransition {
                operation: *self,
                from,
            })
        }
    }
}

impl fmt::Display for ProposalOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            ProposalOperation::Approve => "approve",
            ProposalOperation::Reject => "reject",
            ProposalOperation::RequestDocument => "generate document for",
            ProposalOperation::CompleteDocument => "complete document for",
            ProposalOperation::ConfirmRejection => "confirm rejection of",
            ProposalOperation::RevertRejection => "revert rejection of",
            ProposalOperation::RevertDocumentRequest(_) => "revert document request for",
        };
        f.write_str(verb)
    }
}

/// Where a generated proposal document lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    pub location: String,
    pub generated_at: DateTime<Utc>,
}

/// Fields written together with a status change
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProposalPatch {
    pub job_id: Option<JobId>,
    pub document: Option<DocumentRef>,
    pub rejection_reason: Option<String>,
    /// Drops a recorded rejection reason; wins over `rejection_reason`
    pub clear_rejection_reason: bool,
}

impl ProposalPatch {
    pub fn job(job_id: JobId) -> Self {
        Self {
            job_id: Some(job_id),
            ..Default::default()
        }
    }

    pub fn document(document: DocumentRef) -> Self {
        Self {
            document: Some(document),
            ..Default::default()
        }
    }

    /// Patch for a rejection rolled back to PENDING
    pub fn clear_rejection() -> Self {
        Self {
            clear_rejection_reason: true,
            ..Default::default()
        }
    }
}

/// A quote result promoted to a binding offer
///
/// Rates, limits and premium are copied from the result so later catalogue
/// changes never alter an issued proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub quote_request_id: QuoteRequestId,
    pub lineage_id: QuoteRequestId,
    pub quote_result_id: QuoteResultId,
    pub insurer_id: InsurerId,
    pub insurer_name: String,
    pub client_name: String,
    pub client_email: String,
    pub rctr_c_rate: Rate,
    pub rc_dc_rate: Rate,
    pub rctr_c_limit: Money,
    pub rc_dc_limit: Money,
    pub rctr_c_franchise: String,
    pub rc_dc_franchise: String,
    pub premium: Money,
    pub observations: String,
    pub payment_frequency: String,
    pub policy_duration_months: u32,
    pub valid_until: NaiveDate,
    pub status: ProposalStatus,
    pub job_id: Option<JobId>,
    pub document: Option<DocumentRef>,
    pub rejection_reason: Option<String>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Proposal {
    /// Promotes a result of the current request version into a pending proposal
    pub fn from_quote(
        request: &QuoteRequest,
        result: &QuoteResult,
        client_email: impl Into<String>,
        terms: &ProposalTerms,
        created_by: UserId,
        now: DateTime<Utc>,
    ) -> Result<Self, ProposalError> {
        if result.quote_request_id != request.id {
            return Err(ProposalError::validation(format!(
                "{} does not belong to {}",
                result.id, request.id
            )));
        }
        if !request.is_current {
            return Err(ProposalError::validation(format!(
                "{} is not the current version of its quote",
                request.id
            )));
        }
        let client_email = client_email.into();
        if !client_email.contains('@') {
            return Err(ProposalError::validation("client email is invalid"));
        }

        Ok(Self {
            id: ProposalId::new_v7(),
            quote_request_id: request.id,
            lineage_id: request.lineage_id,
            quote_result_id: result.id,
            insurer_id: result.insurer_id,
            insurer_name: result.insurer_name.clone(),
            client_name: request.details.client.name.clone(),
            client_email,
            rctr_c_rate: result.rctr_c_rate,
            rc_dc_rate: result.rc_dc_rate,
            rctr_c_limit: result.limits.rctr_c,
            rc_dc_limit: result.limits.rc_dc,
            rctr_c_franchise: result.rctr_c_franchise.clone(),
            rc_dc_franchise: result.rc_dc_franchise.clone(),
            premium: result.premium,
            observations: result.observations.clone(),
            payment_frequency: terms.payment_frequency.clone(),
            policy_duration_months: terms.policy_duration_months,
            valid_until: terms.valid_until(now)?,
            status: ProposalStatus::Pending,
            job_id: None,
            document: None,
            rejection_reason: None,
            created_by,
            created_at: now,
            updated_at: now,
        })
    }

    /// Applies an operation in memory; stores use the same check atomically
    pub fn transition(
        &mut self,
        operation: ProposalOperation,
        patch: ProposalPatch,
        now: DateTime<Utc>,
    ) -> Result<(), ProposalError> {
        self.status = operation.apply(self.status)?;
        if let Some(job_id) = patch.job_id {
            self.job_id = Some(job_id);
        }
        if let Some(document) = patch.document {
            self.document = Some(document);
        }
        if patch.clear_rejection_reason {
            self.rejection_reason = None;
        } else if let Some(reason) = patch.rejection_reason {
            self.rejection_reason = Some(reason);
        }
        self.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ProposalStatus::*;

    #[test]
    fn test_transition_table() {
        let cases = [
            (ProposalOperation::Approve, Pending, Some(Approved)),
            (ProposalOperation::Approve, Approved, None),
            (ProposalOperation::Reject, Pending, Some(Rejecting)),
            (ProposalOperation::Reject, Processing, None),
            (ProposalOperation::RequestDocument, Pending, Some(Processing)),
            (ProposalOperation::RequestDocument, Approved, Some(Processing)),
            (ProposalOperation::RequestDocument, Processing, None),
            (ProposalOperation::RequestDocument, Completed, None),
            (ProposalOperation::RequestDocument, Rejecting, None),
            (ProposalOperation::RequestDocument, Rejected, None),
            (ProposalOperation::CompleteDocument, Processing, Some(Completed)),
            (ProposalOperation::ConfirmRejection, Rejecting, Some(Rejected)),
            (ProposalOperation::RevertRejection, Rejecting, Some(Pending)),
            (ProposalOperation::RevertRejection, Rejected, None),
            (ProposalOperation::RevertDocumentRequest(Approved), Processing, Some(Approved)),
        ];
        for (operation, from, expected) in cases {
            assert_eq!(operation.apply(from).ok(), expected, "{:?} from {}", operation, from);
        }
    }

    #[test]
    fn test_terminal_states_accept_nothing() {
        let operations = [
            ProposalOperation::Approve,
            ProposalOperation::Reject,
            ProposalOperation::RequestDocument,
            ProposalOperation::CompleteDocument,
            ProposalOperation::ConfirmRejection,
            ProposalOperation::RevertRejection,
        ];
        for status in ProposalStatus::ALL.into_iter().filter(|s| s.is_terminal()) {
            for operation in operations {
                assert!(operation.apply(status).is_err());
            }
        }
    }

    #[test]
    fn test_revert_document_request_only_to_request_sources() {
        let err = ProposalOperation::RevertDocumentRequest(Completed)
            .apply(Processing)
            .unwrap_err();
        assert!(matches!(err, ProposalError::Validation(_)));
    }

    #[test]
    fn test_invalid_transition_message() {
        let err = ProposalOperation::Approve.apply(Rejected).unwrap_err();
        assert_eq!(err.to_string(), "cannot approve proposal in state REJECTED");
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("processing".parse::<ProposalStatus>().unwrap(), Processing);
        assert!("ARCHIVED".parse::<ProposalStatus>().is_err());
    }

    #[test]
    fn test_lineage_locking_statuses() {
        let locking: Vec<_> = ProposalStatus::ALL
            .into_iter()
            .filter(|s| s.locks_lineage())
            .collect();
        assert_eq!(locking, vec![Approved, Processing, Completed]);
    }
}
