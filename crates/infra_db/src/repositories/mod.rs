//! PostgreSQL implementations of the domain ports
//!
//! Each repository owns its SQL and row types and implements the matching
//! port trait directly; errors cross the boundary through
//! `From<DatabaseError> for PortError`.

pub mod catalogue;
pub mod quotes;
pub mod proposals;
pub mod audit;

pub use catalogue::PgCatalogue;
pub use quotes::PgQuoteStore;
pub use proposals::PgProposalStore;
pub use audit::PgAuditLog;
