//! Ports and Adapters Infrastructure
//!
//! Shared types for the hexagonal boundary between the quoting domains and
//! the collaborators they do not own: the relational store, the job runner,
//! notification delivery and the audit trail.
//!
//! ```text
//!   domain_rating / domain_proposal
//!            │ (port traits)
//!            ▼
//!   ┌─────────────────┐   ┌──────────────────────┐
//!   │ infra_db (Pg)   │   │ in-memory / channel  │
//!   └─────────────────┘   └──────────────────────┘
//! ```
//!
//! Each domain defines its own port traits extending [`DomainPort`]; adapters
//! return [`PortError`] so callers can tell transient failures from permanent
//! ones.

use std::fmt;
use std::time::Duration;
use thiserror::Error;
use serde::{Deserialize, Serialize};

/// Error type for port operations
#[derive(Debug, Error)]
pub enum PortError {
    /// The requested entity was not found
    #[error("Not found: {entity_type} with id {id}")]
    NotFound {
        entity_type: String,
        id: String,
    },

    /// A validation error occurred
    #[error("Validation error: {message}")]
    Validation {
        message: String,
    },

    /// The operation conflicts with the stored state (e.g. a lost compare-and-swap)
    #[error("Conflict: {message}")]
    Conflict {
        message: String,
    },

    /// Connection to the underlying system failed
    #[error("Connection error: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The operation timed out
    #[error("Timeout after {duration_ms}ms: {operation}")]
    Timeout {
        operation: String,
        duration_ms: u64,
    },

    /// The external system is unavailable
    #[error("Service unavailable: {service}")]
    ServiceUnavailable {
        service: String,
    },

    /// An internal error occurred
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl PortError {
    pub fn not_found(entity_type: impl Into<String>, id: impl fmt::Display) -> Self {
        PortError::NotFound {
            entity_type: entity_type.into(),
            id: id.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        PortError::Validation {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        PortError::Conflict {
            message: message.into(),
        }
    }

    pub fn connection(message: impl Into<String>) -> Self {
        PortError::Connection {
            message: message.into(),
            source: None,
        }
    }

    pub fn unavailable(service: impl Into<String>) -> Self {
        PortError::ServiceUnavailable {
            service: service.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        PortError::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Returns true if this error indicates a transient failure that may succeed on retry
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PortError::Connection { .. }
                | PortError::Timeout { .. }
                | PortError::ServiceUnavailable { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, PortError::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, PortError::Conflict { .. })
    }
}

/// Marker trait for all domain ports
///
/// Ports are shared across request handlers and background workers, so they
/// must be thread-safe.
pub trait DomainPort: Send + Sync + 'static {}

/// Bounded retry schedule with exponential backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub base_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the given failed attempt (1-based)
    ///
    /// Doubles per attempt starting at `base_delay`, capped at `max_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let factor = 1u32 << exponent;
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// Health status for an adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterHealth {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Health check result for an adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub adapter_id: String,
    pub status: AdapterHealth,
    pub latency_ms: u64,
    pub message: Option<String>,
    pub checked_at: chrono::DateTime<chrono::Utc>,
}

/// Trait for adapters that support health checks
#[async_trait::async_trait]
pub trait HealthCheckable: Send + Sync {
    async fn health_check(&self) -> HealthCheckResult;
}
