//! Infrastructure Database Layer
//!
//! PostgreSQL adapters for the quoting domains, using SQLx.
//!
//! # Architecture
//!
//! The crate follows the repository pattern: each repository implements a
//! domain port (`CataloguePort`, `QuoteStore`, `ProposalStore`,
//! `LineageLock`, `AuditSink`, `AuditLog`) and hides the schema from the
//! domain layer.
//!
//! # Consistency
//!
//! - The catalogue is read in one `REPEATABLE READ` transaction per rating run
//! - Proposal status changes are a single conditional `UPDATE ... RETURNING`
//! - At most one current version per quote lineage (partial unique index)
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, provision, DatabaseConfig, PgCatalogue};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/cargo_quotes")).await?;
//! run_migrations(&pool).await?;
//! provision(&pool).await?;
//! let catalogue = PgCatalogue::new(pool.clone());
//! ```

pub mod pool;
pub mod error;
pub mod provisioning;
pub mod repositories;

pub use pool::{create_pool, create_pool_from_url, run_migrations, DatabaseConfig, DatabasePool};
pub use error::DatabaseError;
pub use provisioning::{provision, ProvisioningReport, DEFAULT_ROLES};
pub use repositories::{PgAuditLog, PgCatalogue, PgProposalStore, PgQuoteStore};
