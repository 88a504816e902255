//! Daily search quota backed by the `check_search_rate_limit` stored function.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use tracing::debug;
use uuid::Uuid;

use ifrof_core::defaults::SEARCH_DAILY_LIMIT;
use ifrof_core::{Error, RateLimitDecision, RateLimitStore, Result};

/// PostgreSQL daily quota store.
///
/// The check-and-decrement happens inside one stored function call under a
/// row lock, so concurrent requests of the same user cannot overspend.
#[derive(Clone)]
pub struct PgRateLimitStore {
    pool: Pool<Postgres>,
    daily_limit: i32,
}

impl PgRateLimitStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            pool,
            daily_limit: SEARCH_DAILY_LIMIT,
        }
    }

    /// Override the number of searches allowed per UTC day.
    pub fn with_daily_limit(mut self, daily_limit: i32) -> Self {
        self.daily_limit = daily_limit;
        self
    }

    pub fn daily_limit(&self) -> i32 {
        self.daily_limit
    }
}

#[async_trait]
impl RateLimitStore for PgRateLimitStore {
    async fn check_and_consume(&self, user_id: Uuid) -> Result<RateLimitDecision> {
        let row = sqlx::query(
            "SELECT allowed, remaining, reset_at FROM check_search_rate_limit($1, $2)",
        )
        .bind(user_id)
        .bind(self.daily_limit)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?
        .ok_or_else(|| Error::RateLimit("check_search_rate_limit returned no rows".to_string()))?;

        let decision = RateLimitDecision {
            allowed: row.get("allowed"),
            remaining: row.get("remaining"),
            reset_at: row.get("reset_at"),
        };

        debug!(
            subsystem = "db",
            component = "rate_limit",
            op = "check",
            user_id = %user_id,
            allowed = decision.allowed,
            remaining = decision.remaining,
            "Daily quota checked"
        );
        Ok(decision)
    }
}
