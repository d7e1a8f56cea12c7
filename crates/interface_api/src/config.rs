//! API configuration

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use core_kernel::{RetryPolicy, Timezone};
use domain_proposal::ProposalTerms;

/// API configuration
///
/// Every field can be set through an `API_`-prefixed environment variable
/// (`API_PORT`, `API_JWT_SECRET`, ...); unset fields keep their defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// JWT secret for authentication
    pub jwt_secret: String,
    /// JWT expiration in seconds
    pub jwt_expiration_secs: u64,
    /// Database URL
    pub database_url: String,
    /// Log level or `EnvFilter` directive
    pub log_level: String,
    /// Emit logs as JSON lines
    pub log_json: bool,
    /// Days a new proposal stays valid
    pub proposal_validity_days: u32,
    /// IANA timezone the validity date is computed in
    pub proposal_timezone: String,
    pub payment_frequency: String,
    pub policy_duration_months: u32,
    /// Company name used in client emails
    pub company_name: String,
    /// Directory rendered proposal documents are written to
    pub document_dir: PathBuf,
    /// Attempts per document render or email send
    pub document_retry_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    /// Capacity of the in-process job queue
    pub job_queue_capacity: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        let terms = ProposalTerms::default();
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            jwt_secret: "change-me-in-production".to_string(),
            jwt_expiration_secs: 3600,
            database_url: "postgres://localhost/cargo_quotes".to_string(),
            log_level: "info".to_string(),
            log_json: false,
            proposal_validity_days: terms.validity_days,
            proposal_timezone: terms.timezone.0.name().to_string(),
            payment_frequency: terms.payment_frequency,
            policy_duration_months: terms.policy_duration_months,
            company_name: "SHAMAH SEGUROS".to_string(),
            document_dir: PathBuf::from("documents"),
            document_retry_attempts: 3,
            retry_base_delay_ms: 500,
            retry_max_delay_ms: 30_000,
            job_queue_capacity: 256,
        }
    }
}

impl ApiConfig {
    /// Loads configuration from environment
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix("API").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Terms stamped onto new proposals
    pub fn proposal_terms(&self) -> Result<ProposalTerms, config::ConfigError> {
        let timezone = Timezone::parse(&self.proposal_timezone)
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        let terms = ProposalTerms {
            validity_days: self.proposal_validity_days,
            payment_frequency: self.payment_frequency.clone(),
            policy_duration_months: self.policy_duration_months,
            timezone,
        };
        terms
            .validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(terms)
    }

    /// Retry policy for document rendering and email delivery
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.document_retry_attempts.max(1),
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
            max_delay: Duration::from_millis(self.retry_max_delay_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ApiConfig::default();
        assert_eq!(config.server_addr(), "0.0.0.0:8080");
        assert!(!config.log_json);

        let terms = config.proposal_terms().unwrap();
        assert_eq!(terms, ProposalTerms::default());
    }

    #[test]
    fn test_invalid_timezone_rejected() {
        let config = ApiConfig {
            proposal_timezone: "Mars/Olympus_Mons".to_string(),
            ..Default::default()
        };
        assert!(config.proposal_terms().is_err());
    }

    #[test]
    fn test_zero_validity_rejected() {
        let config = ApiConfig {
            proposal_validity_days: 0,
            ..Default::default()
        };
        assert!(config.proposal_terms().is_err());

        let config = ApiConfig {
            proposal_validity_days: u32::MAX,
            ..Default::default()
        };
        assert!(config.proposal_terms().is_err());
    }

    #[test]
    fn test_retry_policy_from_config() {
        let config = ApiConfig {
            document_retry_attempts: 0,
            retry_base_delay_ms: 10,
            retry_max_delay_ms: 100,
            ..Default::default()
        };
        let policy = config.retry_policy();
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.base_delay, Duration::from_millis(10));
        assert_eq!(policy.max_delay, Duration::from_millis(100));
    }
}
