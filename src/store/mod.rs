//! Store interfaces: the Key Store and the Provider Registry.
//!
//! Invocations handling concurrent requests share no in-memory state; the
//! store is the only shared mutable resource. Correctness therefore rests on
//! the store exposing *conditional* single-item writes rather than on any
//! in-process lock:
//!
//! - `insert_key` writes only if the key hash is absent (issuance collisions)
//! - `consume_quota` folds window rollover and decrement-if-positive into one
//!   atomic operation, so concurrent requests against the same key can never
//!   both decrement from a remaining count of 1 and no decrement is lost
//!
//! All operations are single-item; no multi-item transactions are required.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::models::key_record::{KeyRecord, NewKeyRecord};
use crate::models::provider::ProviderRecord;

/// In-memory implementations, used by tests
pub mod memory;
/// PostgreSQL implementations
pub mod postgres;

pub use memory::{MemoryKeyStore, MemoryProviderRegistry};
pub use postgres::{PgKeyStore, PgProviderRegistry};

/// Errors surfaced by store implementations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A conditional insert lost to an existing record.
    #[error("record already exists")]
    Conflict,

    /// Underlying database failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result of one atomic quota-consume attempt.
///
/// `Exhausted`, `Disabled` and `NotFound` all mean the store performed no
/// mutation; only `Consumed` decrements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuotaOutcome {
    /// One unit was consumed; carries what the authorizer needs for context.
    Consumed {
        tenant_id: Uuid,
        owner: String,
        remaining: i64,
    },

    /// Quota for the current window is already zero; nothing was written.
    Exhausted,

    /// The key exists but is disabled.
    Disabled,

    /// No record matches the hash.
    NotFound,
}

/// Durable mapping from hashed API key to tenant record.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Insert a fresh record, failing with [`StoreError::Conflict`] if a
    /// record with the same hash already exists.
    async fn insert_key(&self, record: NewKeyRecord) -> Result<(), StoreError>;

    /// Fetch a record by hash. Read-only; used for diagnostics and tests.
    async fn get_key(&self, key_hash: &str) -> Result<Option<KeyRecord>, StoreError>;

    /// Atomically consume one unit of quota.
    ///
    /// If the window has rolled over (`now >= window_start + window`), the
    /// remaining count is reset to `quota_limit` and the same operation's own
    /// decrement is applied on top, leaving `quota_limit - 1`. The reset and
    /// the decrement must not be observable separately.
    async fn consume_quota(
        &self,
        key_hash: &str,
        window: Duration,
        now: DateTime<Utc>,
    ) -> Result<QuotaOutcome, StoreError>;
}

/// Durable mapping from provider id to backend endpoint and secret.
#[async_trait]
pub trait ProviderRegistry: Send + Sync {
    /// Fetch a provider entry. The request path only ever calls this.
    async fn get(&self, provider_id: &str) -> Result<Option<ProviderRecord>, StoreError>;

    /// Create or replace a provider entry. Administrative seed path only.
    async fn upsert(
        &self,
        provider_id: &str,
        endpoint: &str,
        secret: &str,
    ) -> Result<(), StoreError>;
}
