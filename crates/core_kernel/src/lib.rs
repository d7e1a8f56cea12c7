//! Core Kernel - Foundational types for the cargo quoting platform
//!
//! This crate provides the building blocks shared by every domain crate:
//! - Money and percentage rates with exact decimal arithmetic
//! - Validity periods and the operating timezone
//! - Strongly typed identifiers
//! - Port infrastructure (errors, health checks, retry schedules)

pub mod money;
pub mod temporal;
pub mod identifiers;
pub mod error;
pub mod ports;

pub use money::{Money, Currency, MoneyError, Rate};
pub use temporal::{ValidPeriod, Timezone, TemporalError};
pub use identifiers::{
    InsurerId, MerchandiseTypeId, RuleId, QuoteRequestId, QuoteResultId,
    ProposalId, UserId, JobId, AuditEventId,
};
pub use error::CoreError;
pub use ports::{
    PortError, DomainPort, RetryPolicy, AdapterHealth, HealthCheckResult,
    HealthCheckable,
};
