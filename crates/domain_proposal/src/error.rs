//! Proposal domain errors

use core_kernel::{MoneyError, PortError};
use domain_rating::RatingError;
use thiserror::Error;

use crate::proposal::{ProposalOperation, ProposalStatus};

/// Errors that can occur in the proposal domain
#[derive(Debug, Error)]
pub enum ProposalError {
    #[error("Proposal not found: {0}")]
    NotFound(String),

    /// The operation is not allowed from the proposal's current status
    #[error("cannot {operation} proposal in state {from}")]
    InvalidTransition {
        operation: ProposalOperation,
        from: ProposalStatus,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    /// A collaborator (job runner, renderer, notification sink) failed
    #[error("{operation} failed for proposal {proposal_id}: {message}")]
    Dependency {
        operation: String,
        proposal_id: String,
        message: String,
    },

    /// An email template could not be rendered
    #[error("Template error: {0}")]
    Template(String),

    #[error("Financial error: {0}")]
    Financial(#[from] MoneyError),

    #[error(transparent)]
    Rating(#[from] RatingError),

    #[error("Store error: {0}")]
    Store(PortError),
}

impl ProposalError {
    pub fn validation(message: impl Into<String>) -> Self {
        ProposalError::Validation(message.into())
    }

    pub fn dependency(
        operation: impl Into<String>,
        proposal_id: impl ToString,
        source: &PortError,
    ) -> Self {
        ProposalError::Dependency {
            operation: operation.into(),
            proposal_id: proposal_id.to_string(),
            message: source.to_string(),
        }
    }

    pub fn is_invalid_transition(&self) -> bool {
        matches!(self, ProposalError::InvalidTransition { .. })
    }
}

impl From<PortError> for ProposalError {
    fn from(error: PortError) -> Self {
        match error {
            PortError::NotFound { entity_type, id } => {
                ProposalError::NotFound(format!("{} {}", entity_type, id))
            }
            PortError::Validation { message } => ProposalError::Validation(message),
            other => ProposalError::Store(other),
        }
    }
}
