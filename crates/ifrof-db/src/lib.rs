//! # ifrof-db
//!
//! PostgreSQL database layer for the IFROF factory search.
//!
//! This crate provides:
//! - Connection pool management
//! - Search and factory result persistence
//! - The atomic daily search quota
//! - Bearer token storage and verification
//! - Maintenance RPCs (search expiry, quota resets)
//!
//! ## Example
//!
//! ```rust,ignore
//! use ifrof_db::{Database, PoolConfig};
//! use ifrof_core::RateLimitStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/ifrof", &PoolConfig::default()).await?;
//!     let decision = db.rate_limits.check_and_consume(uuid::Uuid::nil()).await?;
//!     println!("allowed: {}", decision.allowed);
//!     Ok(())
//! }
//! ```

pub mod access_tokens;
pub mod maintenance;
pub mod pool;
pub mod rate_limit;
pub mod searches;

// Re-export core types
pub use ifrof_core::*;

pub use access_tokens::{IssuedToken, PgAccessTokenRepository, TOKEN_PREFIX};
pub use maintenance::{MaintenanceReport, PgMaintenanceRepository};
pub use pool::{create_pool, PoolConfig};
pub use rate_limit::PgRateLimitStore;
pub use searches::PgSearchRepository;

/// Combined database context with all repositories.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Searches and their accepted factory results.
    pub searches: PgSearchRepository,
    /// Daily search quota.
    pub rate_limits: PgRateLimitStore,
    /// Bearer tokens.
    pub access_tokens: PgAccessTokenRepository,
    /// Expiry and quota maintenance.
    pub maintenance: PgMaintenanceRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            searches: PgSearchRepository::new(pool.clone()),
            rate_limits: PgRateLimitStore::new(pool.clone()),
            access_tokens: PgAccessTokenRepository::new(pool.clone()),
            maintenance: PgMaintenanceRepository::new(pool.clone()),
            pool,
        }
    }

    /// Connect with the given pool configuration.
    pub async fn connect(url: &str, config: &PoolConfig) -> Result<Self> {
        let pool = create_pool(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Set the per-user daily search limit.
    pub fn with_daily_limit(mut self, daily_limit: i32) -> Self {
        self.rate_limits = self.rate_limits.with_daily_limit(daily_limit);
        self
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}
