//! Commercial terms stamped onto every new proposal

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::Timezone;

use crate::error::ProposalError;

/// Upper bound on how long an offer may stay open (ten years)
pub const MAX_VALIDITY_DAYS: u32 = 3650;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalTerms {
    /// Days the offer stays valid, counted in local calendar days
    pub validity_days: u32,
    pub payment_frequency: String,
    pub policy_duration_months: u32,
    /// Timezone the validity date is computed in
    pub timezone: Timezone,
}

impl Default for ProposalTerms {
    fn default() -> Self {
        Self {
            validity_days: 30,
            payment_frequency: "Mensal".to_string(),
            policy_duration_months: 12,
            timezone: Timezone::default(),
        }
    }
}

impl ProposalTerms {
    pub fn validate(&self) -> Result<(), ProposalError> {
        if self.validity_days == 0 {
            return Err(ProposalError::validation("validity days must be positive"));
        }
        if self.validity_days > MAX_VALIDITY_DAYS {
            return Err(ProposalError::validation(format!(
                "validity days must not exceed {}",
                MAX_VALIDITY_DAYS
            )));
        }
        if self.policy_duration_months == 0 {
            return Err(ProposalError::validation("policy duration must be positive"));
        }
        if self.payment_frequency.trim().is_empty() {
            return Err(ProposalError::validation("payment frequency is required"));
        }
        Ok(())
    }

    /// Last local date on which a proposal created at `created_at` is valid
    pub fn valid_until(&self, created_at: DateTime<Utc>) -> Result<NaiveDate, ProposalError> {
        self.timezone
            .date_after_days(created_at, self.validity_days)
            .map_err(|e| ProposalError::validation(e.to_string()))
    }
}
