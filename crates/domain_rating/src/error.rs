//! Rating domain errors
//!
//! Most of these are recovered inside the orchestrator: a NotFound-class
//! error for one insurer only removes that insurer from the comparison.

use core_kernel::{MoneyError, PortError};
use thiserror::Error;

/// Errors that can occur in the rating domain
#[derive(Debug, Error)]
pub enum RatingError {
    /// No business rule exists for the insurer and merchandise type
    #[error("No rule for insurer {insurer} and merchandise type {merchandise_type}")]
    RuleNotFound {
        insurer: String,
        merchandise_type: String,
    },

    /// The rule exists but is switched off or outside its validity window
    #[error("Rule for insurer {insurer} and merchandise type {merchandise_type} is not in force")]
    RuleInactive {
        insurer: String,
        merchandise_type: String,
    },

    /// The insurer explicitly excludes this merchandise type
    #[error("Insurer {insurer} excludes merchandise type {merchandise_type}")]
    RuleExcluded {
        insurer: String,
        merchandise_type: String,
    },

    /// Merchandise type is not in the catalogue
    #[error("Unknown merchandise type: {0}")]
    MerchandiseTypeNotFound(String),

    /// System parameter is not configured
    #[error("System parameter not found: {0}")]
    ParameterNotFound(String),

    /// System parameter holds a value that cannot be interpreted
    #[error("System parameter {key} has invalid value '{value}'")]
    InvalidParameter {
        key: String,
        value: String,
    },

    /// Special condition code is not configured
    #[error("Special condition not found: {0}")]
    ConditionNotFound(String),

    /// Two rules were registered for the same insurer and merchandise type
    #[error("Duplicate rule for insurer {insurer} and merchandise type {merchandise_type}")]
    DuplicateRule {
        insurer: String,
        merchandise_type: String,
    },

    /// Input rejected before rating
    #[error("Validation error: {0}")]
    Validation(String),

    /// The quote lineage is locked by an approved proposal
    #[error("Quote request {0} cannot be edited in place; create a new version")]
    VersionLocked(String),

    /// Only the current version of a lineage may be revised
    #[error("Quote request {0} is not the current version")]
    NotCurrentVersion(String),

    /// Decimal arithmetic failed
    #[error("Financial error: {0}")]
    Financial(#[from] MoneyError),

    /// Catalogue or quote store could not be reached
    #[error("Store error: {0}")]
    Store(#[from] PortError),
}

impl RatingError {
    pub fn validation(message: impl Into<String>) -> Self {
        RatingError::Validation(message.into())
    }

    /// True for missing reference data; callers skip the affected insurer or clause
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RatingError::RuleNotFound { .. }
                | RatingError::MerchandiseTypeNotFound(_)
                | RatingError::ParameterNotFound(_)
                | RatingError::ConditionNotFound(_)
        )
    }

    /// True when the insurer simply cannot rate this request
    pub fn is_ineligible(&self) -> bool {
        matches!(
            self,
            RatingError::RuleInactive { .. } | RatingError::RuleExcluded { .. }
        ) || self.is_not_found()
    }
}
