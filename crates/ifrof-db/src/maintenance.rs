//! Scheduled maintenance RPCs: search expiry and quota resets.

use sqlx::{Pool, Postgres};
use tracing::info;

use ifrof_core::{Error, Result};

/// Counts reported by one maintenance pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
    pub expired_searches: i32,
    pub quotas_reset: i32,
}

/// Wrapper around the maintenance stored functions.
#[derive(Clone)]
pub struct PgMaintenanceRepository {
    pool: Pool<Postgres>,
}

impl PgMaintenanceRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Delete expired searches (results cascade). Returns the deleted count.
    pub async fn cleanup_expired_searches(&self) -> Result<i32> {
        sqlx::query_scalar::<_, i32>("SELECT cleanup_expired_searches()")
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)
    }

    /// Reset quotas whose window passed. Returns the number of rows touched.
    pub async fn reset_daily_quotas(&self) -> Result<i32> {
        sqlx::query_scalar::<_, i32>("SELECT reset_daily_quotas()")
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)
    }

    /// Run both maintenance functions.
    pub async fn run(&self) -> Result<MaintenanceReport> {
        let report = MaintenanceReport {
            expired_searches: self.cleanup_expired_searches().await?,
            quotas_reset: self.reset_daily_quotas().await?,
        };

        info!(
            subsystem = "db",
            component = "maintenance",
            op = "run",
            expired_searches = report.expired_searches,
            quotas_reset = report.quotas_reset,
            "Maintenance pass complete"
        );
        Ok(report)
    }
}
