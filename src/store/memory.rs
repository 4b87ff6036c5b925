//! In-memory Key Store and Provider Registry.
//!
//! Used by the integration tests, which exercise the authorizer's concurrency
//! properties without a database. Each operation takes the lock exactly once,
//! so the consume is atomic the same way the SQL conditional update is: the
//! check and the decrement happen under one acquisition.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::models::key_record::{KeyRecord, NewKeyRecord};
use crate::models::provider::ProviderRecord;
use crate::store::{KeyStore, ProviderRegistry, QuotaOutcome, StoreError};

/// HashMap-backed Key Store.
#[derive(Default)]
pub struct MemoryKeyStore {
    records: Mutex<HashMap<String, KeyRecord>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip a key's enabled flag, standing in for the administrative
    /// revocation path. Returns false if no record matches.
    pub fn set_enabled(&self, key_hash: &str, enabled: bool) -> bool {
        let mut records = self.records.lock().expect("key store lock poisoned");
        match records.get_mut(key_hash) {
            Some(record) => {
                record.enabled = enabled;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl KeyStore for MemoryKeyStore {
    async fn insert_key(&self, record: NewKeyRecord) -> Result<(), StoreError> {
        let mut records = self.records.lock().expect("key store lock poisoned");

        if records.contains_key(&record.key_hash) {
            return Err(StoreError::Conflict);
        }

        records.insert(
            record.key_hash.clone(),
            KeyRecord {
                id: record.id,
                key_hash: record.key_hash,
                owner: record.owner,
                enabled: true,
                quota_limit: record.quota_limit,
                quota_remaining: record.quota_limit,
                window_start: record.window_start,
                created_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn get_key(&self, key_hash: &str) -> Result<Option<KeyRecord>, StoreError> {
        let records = self.records.lock().expect("key store lock poisoned");
        Ok(records.get(key_hash).cloned())
    }

    async fn consume_quota(
        &self,
        key_hash: &str,
        window: Duration,
        now: DateTime<Utc>,
    ) -> Result<QuotaOutcome, StoreError> {
        let mut records = self.records.lock().expect("key store lock poisoned");

        let Some(record) = records.get_mut(key_hash) else {
            return Ok(QuotaOutcome::NotFound);
        };

        if !record.enabled {
            return Ok(QuotaOutcome::Disabled);
        }

        // Rollover reset and decrement compose under the same lock hold.
        if now >= record.window_start + window {
            record.quota_remaining = record.quota_limit - 1;
            record.window_start = now;
        } else if record.quota_remaining > 0 {
            record.quota_remaining -= 1;
        } else {
            return Ok(QuotaOutcome::Exhausted);
        }

        Ok(QuotaOutcome::Consumed {
            tenant_id: record.id,
            owner: record.owner.clone(),
            remaining: record.quota_remaining,
        })
    }
}

/// HashMap-backed Provider Registry.
#[derive(Default)]
pub struct MemoryProviderRegistry {
    records: Mutex<HashMap<String, ProviderRecord>>,
}

impl MemoryProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProviderRegistry for MemoryProviderRegistry {
    async fn get(&self, provider_id: &str) -> Result<Option<ProviderRecord>, StoreError> {
        let records = self.records.lock().expect("registry lock poisoned");
        Ok(records.get(provider_id).cloned())
    }

    async fn upsert(
        &self,
        provider_id: &str,
        endpoint: &str,
        secret: &str,
    ) -> Result<(), StoreError> {
        let mut records = self.records.lock().expect("registry lock poisoned");
        let now = Utc::now();

        records
            .entry(provider_id.to_string())
            .and_modify(|record| {
                record.endpoint = endpoint.to_string();
                record.secret = secret.to_string();
                record.updated_at = now;
            })
            .or_insert_with(|| ProviderRecord {
                provider_id: provider_id.to_string(),
                endpoint: endpoint.to_string(),
                secret: secret.to_string(),
                created_at: now,
                updated_at: now,
            });

        Ok(())
    }
}
