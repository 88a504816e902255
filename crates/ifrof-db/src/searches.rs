//! Search and factory result repository.
//!
//! Status updates are guarded with `WHERE status = 'processing'`, which makes
//! `completed` and `failed` terminal at the storage level. Accepted results
//! are written in the same transaction that completes the search, so a
//! failed search never keeps partial results.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::Value as JsonValue;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row, Transaction};
use tracing::debug;
use uuid::Uuid;

use ifrof_core::defaults::SEARCH_RETENTION_DAYS;
use ifrof_core::{
    Error, Evidence, FactoryCandidate, FactoryResult, NewSearch, NormalizedProduct,
    OptionalParams, Result, Search, SearchRepository, SearchStatus, SearchType, Verification,
};

const SEARCH_COLUMNS: &str = "id, search_type, input_value, optional_params, normalized_product,
     status, error_message, user_id, created_at, updated_at, expires_at";

const RESULT_COLUMNS: &str = "id, search_id, name, name_zh, location, website, links, score,
     why_factory, evidence, red_flags, verification_steps, is_excluded, created_at";

/// PostgreSQL search repository.
#[derive(Clone)]
pub struct PgSearchRepository {
    pool: Pool<Postgres>,
    retention_days: i64,
}

impl PgSearchRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            pool,
            retention_days: SEARCH_RETENTION_DAYS as i64,
        }
    }

    /// Override how long new searches are kept before cleanup.
    pub fn with_retention_days(mut self, days: i64) -> Self {
        self.retention_days = days;
        self
    }

    /// Flag a result as excluded (or restore it). Used by moderation tooling.
    pub async fn set_excluded(&self, result_id: Uuid, excluded: bool) -> Result<()> {
        let done = sqlx::query("UPDATE factory_result SET is_excluded = $1 WHERE id = $2")
            .bind(excluded)
            .bind(result_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if done.rows_affected() == 0 {
            return Err(Error::NotFound(format!("factory result {}", result_id)));
        }
        Ok(())
    }

    async fn transition(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        status: SearchStatus,
        message: Option<&str>,
    ) -> Result<()> {
        let done = sqlx::query(
            "UPDATE search SET status = $1, error_message = $2, updated_at = $3
             WHERE id = $4 AND status = 'processing'",
        )
        .bind(status.as_str())
        .bind(message)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;

        if done.rows_affected() == 0 {
            return Err(Error::NotFound(format!("processing search {}", id)));
        }

        debug!(
            subsystem = "db",
            component = "searches",
            op = "transition",
            search_id = %id,
            status = status.as_str(),
            "Search status updated"
        );
        Ok(())
    }

    async fn insert_result(
        tx: &mut Transaction<'_, Postgres>,
        search_id: Uuid,
        candidate: &FactoryCandidate,
        verification: &Verification,
    ) -> Result<Uuid> {
        let id = Uuid::now_v7();
        sqlx::query(
            "INSERT INTO factory_result (id, search_id, name, name_zh, location, website, links,
                                         score, why_factory, evidence, red_flags,
                                         verification_steps, is_excluded, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, false, $13)",
        )
        .bind(id)
        .bind(search_id)
        .bind(candidate.name.trim())
        .bind(&candidate.name_zh)
        .bind(candidate.location())
        .bind(candidate.website())
        .bind(&candidate.links)
        .bind(verification.score)
        .bind(&verification.why_factory)
        .bind(serde_json::to_value(&verification.evidence)?)
        .bind(&verification.red_flags)
        .bind(&verification.verification_steps)
        .bind(Utc::now())
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;

        Ok(id)
    }

    fn parse_search(row: &PgRow) -> Result<Search> {
        let search_type: String = row.get("search_type");
        let status: String = row.get("status");
        let optional_params: JsonValue = row.get("optional_params");
        let normalized_product: Option<JsonValue> = row.get("normalized_product");

        Ok(Search {
            id: row.get("id"),
            search_type: search_type
                .parse::<SearchType>()
                .map_err(Error::Serialization)?,
            input_value: row.get("input_value"),
            optional_params: serde_json::from_value::<OptionalParams>(optional_params)?,
            normalized_product: normalized_product
                .map(serde_json::from_value::<NormalizedProduct>)
                .transpose()?,
            status: status.parse::<SearchStatus>().map_err(Error::Serialization)?,
            error_message: row.get("error_message"),
            user_id: row.get("user_id"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
            expires_at: row.get("expires_at"),
        })
    }

    fn parse_result(row: &PgRow) -> Result<FactoryResult> {
        let evidence: JsonValue = row.get("evidence");
        Ok(FactoryResult {
            id: row.get("id"),
            search_id: row.get("search_id"),
            name: row.get("name"),
            name_zh: row.get("name_zh"),
            location: row.get("location"),
            website: row.get("website"),
            links: row.get("links"),
            score: row.get("score"),
            why_factory: row.get("why_factory"),
            evidence: serde_json::from_value::<Vec<Evidence>>(evidence)?,
            red_flags: row.get("red_flags"),
            verification_steps: row.get("verification_steps"),
            is_excluded: row.get("is_excluded"),
            created_at: row.get("created_at"),
        })
    }
}

#[async_trait]
impl SearchRepository for PgSearchRepository {
    async fn create(&self, req: NewSearch) -> Result<Uuid> {
        let id = Uuid::now_v7();
        let now = Utc::now();
        let expires_at = now + Duration::days(self.retention_days);

        sqlx::query(
            "INSERT INTO search (id, search_type, input_value, optional_params, status,
                                 user_id, created_at, updated_at, expires_at)
             VALUES ($1, $2, $3, $4, 'processing', $5, $6, $6, $7)",
        )
        .bind(id)
        .bind(req.search_type.as_str())
        .bind(&req.input_value)
        .bind(serde_json::to_value(&req.optional_params)?)
        .bind(req.user_id)
        .bind(now)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(id)
    }

    async fn set_normalized_product(&self, id: Uuid, product: &NormalizedProduct) -> Result<()> {
        let done = sqlx::query(
            "UPDATE search SET normalized_product = $1, updated_at = $2
             WHERE id = $3 AND status = 'processing'",
        )
        .bind(serde_json::to_value(product)?)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if done.rows_affected() == 0 {
            return Err(Error::NotFound(format!("processing search {}", id)));
        }
        Ok(())
    }

    async fn mark_completed(
        &self,
        id: Uuid,
        accepted: &[(FactoryCandidate, Verification)],
    ) -> Result<Vec<Uuid>> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let mut ids = Vec::with_capacity(accepted.len());
        for (candidate, verification) in accepted {
            ids.push(Self::insert_result(&mut tx, id, candidate, verification).await?);
        }
        Self::transition(&mut tx, id, SearchStatus::Completed, None).await?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(ids)
    }

    async fn mark_failed(&self, id: Uuid, message: &str) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        Self::transition(&mut tx, id, SearchStatus::Failed, Some(message)).await?;
        tx.commit().await.map_err(Error::Database)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Search>> {
        let sql = format!("SELECT {} FROM search WHERE id = $1", SEARCH_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        row.as_ref().map(Self::parse_search).transpose()
    }

    async fn list_results(&self, search_id: Uuid) -> Result<Vec<FactoryResult>> {
        let sql = format!(
            "SELECT {} FROM factory_result
             WHERE search_id = $1 AND is_excluded = false
             ORDER BY score DESC, created_at ASC",
            RESULT_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(search_id)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        rows.iter().map(Self::parse_result).collect()
    }
}
