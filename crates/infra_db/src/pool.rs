//! Database connection pool management
//!
//! Connection pool configuration and creation for PostgreSQL using SQLx,
//! plus the embedded schema migrations.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::info;

use crate::error::DatabaseError;

/// Type alias for the PostgreSQL connection pool
pub type DatabasePool = PgPool;

/// Configuration options for the database connection pool
///
/// # Example
///
/// ```rust
/// use infra_db::DatabaseConfig;
/// use std::time::Duration;
///
/// let config = DatabaseConfig::new("postgres://localhost/cargo_quotes")
///     .max_connections(20)
///     .min_connections(5)
///     .connect_timeout(Duration::from_secs(10));
/// ```
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection string
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of connections to maintain
    pub min_connections: u32,
    /// Connection timeout duration
    pub connect_timeout: Duration,
    /// Maximum lifetime of a connection
    pub max_lifetime: Duration,
    /// Idle timeout before closing a connection
    pub idle_timeout: Duration,
}

impl DatabaseConfig {
    /// Creates a new database configuration with the given connection URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 10,
            min_connections: 2,
            connect_timeout: Duration::from_secs(30),
            max_lifetime: Duration::from_secs(30 * 60),
            idle_timeout: Duration::from_secs(10 * 60),
        }
    }

    /// Sets the maximum number of connections in the pool (default: 10)
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the minimum number of connections to maintain (default: 2)
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Sets the connection timeout duration (default: 30s)
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn max_lifetime(mut self, lifetime: Duration) -> Self {
        self.max_lifetime = lifetime;
        self
    }

    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::new("postgres://localhost/cargo_quotes")
    }
}

/// Creates a database connection pool with the given configuration
///
/// # Errors
///
/// Returns `DatabaseError::ConnectionFailed` if the pool cannot be created
pub async fn create_pool(config: DatabaseConfig) -> Result<DatabasePool, DatabaseError> {
    info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "creating database pool"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.connect_timeout)
        .max_lifetime(config.max_lifetime)
        .idle_timeout(config.idle_timeout)
        .connect(&config.url)
        .await
        .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;

    info!("database pool created");
    Ok(pool)
}

/// Creates a connection pool from a URL string with default settings
pub async fn create_pool_from_url(url: &str) -> Result<DatabasePool, DatabaseError> {
    create_pool(DatabaseConfig::new(url)).await
}

/// Applies the embedded migrations under `migrations/`
pub async fn run_migrations(pool: &DatabasePool) -> Result<(), DatabaseError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("database migrations applied");
    Ok(())
}
