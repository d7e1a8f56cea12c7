//! Request handlers
//!
//! Handlers authorize the caller through the [`AccessPolicy`](crate::auth::AccessPolicy),
//! validate the body and delegate to the domain services.

pub mod health;
pub mod quotes;
pub mod proposals;
pub mod audit;
