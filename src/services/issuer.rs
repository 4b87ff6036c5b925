//! Key issuance service.
//!
//! Generates fresh API keys and writes their records to the Key Store.
//! The plaintext key leaves this module exactly once, inside [`IssuedKey`];
//! only its SHA-256 hash is persisted.

use chrono::Utc;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::GatewayError;
use crate::models::key_record::NewKeyRecord;
use crate::store::{KeyStore, StoreError};

/// Bounded retries for the (vanishingly unlikely) case that a freshly
/// generated key collides with an existing record.
const MAX_GENERATION_ATTEMPTS: u32 = 3;

/// A freshly issued key, plaintext included.
#[derive(Debug)]
pub struct IssuedKey {
    /// Plaintext key material; shown to the caller once, never stored
    pub api_key: String,

    /// Tenant id assigned to the new record
    pub tenant_id: Uuid,

    pub owner: String,
    pub quota_limit: i64,
}

/// Issue a new API key.
///
/// # Process
///
/// 1. Validate input (`owner` non-empty, `quota_limit` positive)
/// 2. Generate 32 random bytes, hex-encoded, as the key material
/// 3. Insert a record keyed by the SHA-256 hash of the material, conditional
///    on the hash being absent; retry generation on collision
/// 4. Return the plaintext key with a full quota window
///
/// # Errors
///
/// - `InvalidRequest`: empty owner or non-positive quota
/// - `StorageConflict`: generation kept colliding after bounded attempts
/// - `Store`: database error occurred
pub async fn issue(
    store: &dyn KeyStore,
    owner: &str,
    quota_limit: i64,
) -> Result<IssuedKey, GatewayError> {
    if owner.trim().is_empty() {
        return Err(GatewayError::InvalidRequest(
            "Owner must be non-empty".to_string(),
        ));
    }
    if quota_limit <= 0 {
        return Err(GatewayError::InvalidRequest(
            "Quota limit must be positive".to_string(),
        ));
    }

    for _ in 0..MAX_GENERATION_ATTEMPTS {
        let api_key = generate_key();
        let tenant_id = Uuid::new_v4();

        let record = NewKeyRecord {
            id: tenant_id,
            key_hash: hash_key(&api_key),
            owner: owner.to_string(),
            quota_limit,
            window_start: Utc::now(),
        };

        match store.insert_key(record).await {
            Ok(()) => {
                tracing::info!(%tenant_id, owner, quota_limit, "issued new API key");
                return Ok(IssuedKey {
                    api_key,
                    tenant_id,
                    owner: owner.to_string(),
                    quota_limit,
                });
            }
            // Collision with an existing hash: regenerate and try again.
            Err(StoreError::Conflict) => continue,
            Err(err) => return Err(err.into()),
        }
    }

    Err(GatewayError::StorageConflict)
}

/// Generate cryptographically secure key material.
///
/// # Output
///
/// 64 hex characters (32 random bytes)
fn generate_key() -> String {
    let bytes: [u8; 32] = rand::random();
    hex::encode(bytes)
}

/// SHA-256 hex digest of the key material, the store's lookup key.
pub fn hash_key(api_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(api_key.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_are_distinct_hex() {
        let a = generate_key();
        let b = generate_key();
        assert_ne!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn hash_is_stable_and_distinct_from_key() {
        let key = generate_key();
        assert_eq!(hash_key(&key), hash_key(&key));
        assert_ne!(hash_key(&key), key);
    }
}
