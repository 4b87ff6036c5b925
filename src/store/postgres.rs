//! PostgreSQL-backed Key Store and Provider Registry.
//!
//! The quota consume is a single conditional `UPDATE ... RETURNING`; the
//! database serializes concurrent updates to the same row, so no two requests
//! can both decrement from a remaining count of 1 and no decrement is lost.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::db::DbPool;
use crate::models::key_record::{KeyRecord, NewKeyRecord};
use crate::models::provider::ProviderRecord;
use crate::store::{KeyStore, ProviderRegistry, QuotaOutcome, StoreError};

/// Key Store over the `api_keys` table.
#[derive(Clone)]
pub struct PgKeyStore {
    pool: DbPool,
}

impl PgKeyStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl KeyStore for PgKeyStore {
    async fn insert_key(&self, record: NewKeyRecord) -> Result<(), StoreError> {
        // ON CONFLICT DO NOTHING turns a hash collision into rows_affected = 0
        // instead of a unique-violation error.
        let inserted = sqlx::query(
            r#"
            INSERT INTO api_keys (id, key_hash, owner, enabled, quota_limit, quota_remaining, window_start)
            VALUES ($1, $2, $3, true, $4, $4, $5)
            ON CONFLICT (key_hash) DO NOTHING
            "#,
        )
        .bind(record.id)
        .bind(&record.key_hash)
        .bind(&record.owner)
        .bind(record.quota_limit)
        .bind(record.window_start)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if inserted == 0 {
            return Err(StoreError::Conflict);
        }
        Ok(())
    }

    async fn get_key(&self, key_hash: &str) -> Result<Option<KeyRecord>, StoreError> {
        let record = sqlx::query_as::<_, KeyRecord>(
            "SELECT id, key_hash, owner, enabled, quota_limit, quota_remaining, window_start, created_at
             FROM api_keys
             WHERE key_hash = $1",
        )
        .bind(key_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// One conditional update covers both the rollover reset and the
    /// decrement:
    ///
    /// - rolled over: remaining becomes `quota_limit - 1`, window restarts
    /// - not rolled over: remaining decrements, but only while positive
    ///
    /// A row that matches neither arm is left untouched, and a follow-up
    /// read-only select classifies why (missing, disabled, or exhausted).
    async fn consume_quota(
        &self,
        key_hash: &str,
        window: Duration,
        now: DateTime<Utc>,
    ) -> Result<QuotaOutcome, StoreError> {
        let window_secs = window.num_seconds();

        let row = sqlx::query_as::<_, (uuid::Uuid, String, i64)>(
            r#"
            UPDATE api_keys
            SET quota_remaining = CASE
                    WHEN window_start + make_interval(secs => $2) <= $3 THEN quota_limit - 1
                    ELSE quota_remaining - 1
                END,
                window_start = CASE
                    WHEN window_start + make_interval(secs => $2) <= $3 THEN $3
                    ELSE window_start
                END
            WHERE key_hash = $1
              AND enabled = true
              AND (quota_remaining > 0 OR window_start + make_interval(secs => $2) <= $3)
            RETURNING id, owner, quota_remaining
            "#,
        )
        .bind(key_hash)
        .bind(window_secs as f64)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        if let Some((tenant_id, owner, remaining)) = row {
            return Ok(QuotaOutcome::Consumed {
                tenant_id,
                owner,
                remaining,
            });
        }

        // No row matched the conditional update; classify without mutating.
        let state = sqlx::query_as::<_, (bool,)>(
            "SELECT enabled FROM api_keys WHERE key_hash = $1",
        )
        .bind(key_hash)
        .fetch_optional(&self.pool)
        .await?;

        match state {
            None => Ok(QuotaOutcome::NotFound),
            Some((false,)) => Ok(QuotaOutcome::Disabled),
            Some((true,)) => Ok(QuotaOutcome::Exhausted),
        }
    }
}

/// Provider Registry over the `providers` table.
#[derive(Clone)]
pub struct PgProviderRegistry {
    pool: DbPool,
}

impl PgProviderRegistry {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProviderRegistry for PgProviderRegistry {
    async fn get(&self, provider_id: &str) -> Result<Option<ProviderRecord>, StoreError> {
        let record = sqlx::query_as::<_, ProviderRecord>(
            "SELECT provider_id, endpoint, secret, created_at, updated_at
             FROM providers
             WHERE provider_id = $1",
        )
        .bind(provider_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn upsert(
        &self,
        provider_id: &str,
        endpoint: &str,
        secret: &str,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO providers (provider_id, endpoint, secret)
            VALUES ($1, $2, $3)
            ON CONFLICT (provider_id) DO UPDATE
            SET endpoint = EXCLUDED.endpoint,
                secret = EXCLUDED.secret,
                updated_at = NOW()
            "#,
        )
        .bind(provider_id)
        .bind(endpoint)
        .bind(secret)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
