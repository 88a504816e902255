//! Bearer token repository.
//!
//! Tokens are only ever stored as SHA-256 digests; the plaintext is returned
//! once at issue time.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use ifrof_core::{AuthPrincipal, Error, Result, TokenVerifier};

/// Prefix of every issued token.
pub const TOKEN_PREFIX: &str = "ifr_";

/// Length of the random part of a token.
const TOKEN_SECRET_LEN: usize = 48;

/// Freshly issued token. `token` is not recoverable afterwards.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub id: Uuid,
    pub token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

/// PostgreSQL bearer token repository.
#[derive(Clone)]
pub struct PgAccessTokenRepository {
    pool: Pool<Postgres>,
}

impl PgAccessTokenRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn generate_secret(length: usize) -> String {
        const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
        let mut rng = rand::thread_rng();
        (0..length)
            .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
            .collect()
    }

    /// SHA-256 hex digest of a token.
    pub fn hash_token(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Issue a token for `user_id`. `ttl = None` never expires.
    pub async fn issue(
        &self,
        user_id: Uuid,
        label: Option<&str>,
        ttl: Option<Duration>,
    ) -> Result<IssuedToken> {
        let id = Uuid::now_v7();
        let token = format!("{}{}", TOKEN_PREFIX, Self::generate_secret(TOKEN_SECRET_LEN));
        let now = Utc::now();
        let expires_at = ttl.map(|d| now + d);

        sqlx::query(
            "INSERT INTO access_token (id, user_id, token_hash, label, expires_at, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(id)
        .bind(user_id)
        .bind(Self::hash_token(&token))
        .bind(label)
        .bind(expires_at)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(IssuedToken {
            id,
            token,
            expires_at,
        })
    }

    /// Revoke a token by id.
    pub async fn revoke(&self, id: Uuid) -> Result<()> {
        let done = sqlx::query(
            "UPDATE access_token SET revoked_at = $1 WHERE id = $2 AND revoked_at IS NULL",
        )
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if done.rows_affected() == 0 {
            return Err(Error::NotFound(format!("active access token {}", id)));
        }
        Ok(())
    }
}

#[async_trait]
impl TokenVerifier for PgAccessTokenRepository {
    async fn verify(&self, token: &str) -> Result<Option<AuthPrincipal>> {
        if !token.starts_with(TOKEN_PREFIX) {
            return Ok(None);
        }

        let now = Utc::now();
        let row = sqlx::query(
            "UPDATE access_token SET last_used_at = $2
             WHERE token_hash = $1
               AND revoked_at IS NULL
               AND (expires_at IS NULL OR expires_at > $2)
             RETURNING id, user_id",
        )
        .bind(Self::hash_token(token))
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(|r| AuthPrincipal {
            token_id: r.get("id"),
            user_id: r.get("user_id"),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_token_is_stable_hex() {
        let a = PgAccessTokenRepository::hash_token("ifr_abc");
        let b = PgAccessTokenRepository::hash_token("ifr_abc");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, PgAccessTokenRepository::hash_token("ifr_abd"));
    }

    #[test]
    fn test_generate_secret_alphanumeric() {
        let secret = PgAccessTokenRepository::generate_secret(TOKEN_SECRET_LEN);
        assert_eq!(secret.len(), TOKEN_SECRET_LEN);
        assert!(secret.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
