//! API key records and key-issuance request/response types.
//!
//! Keys are stored in the database as SHA-256 hashes. The plaintext key is returned exactly once, in the issuance response, and cannot be recovered afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A key record as held by the Key Store.
///
/// # Database Table
///
/// Maps to the `api_keys` table with columns:
/// - `id`: Unique identifier (UUID), used as the tenant identifier in logs
/// - `key_hash`: SHA-256 hash of the actual API key
/// - `owner`: Opaque name of the key holder
/// - `enabled`: Whether the key is currently valid
/// - `quota_limit`: Requests allowed per window
/// - `quota_remaining`: Requests left in the current window
/// - `window_start`: When the current window began
///
/// # Invariant
///
/// `0 <= quota_remaining <= quota_limit` at all times. The only mutations are
/// the authorizer's atomic consume and the window-rollover reset folded into it.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct KeyRecord {
    /// Unique identifier for this key; doubles as the tenant id
    pub id: Uuid,

    /// SHA-256 hash of the actual API key (64 hex characters)
    ///
    /// When a request comes in with "Bearer abc123", we:
    /// 1. Hash "abc123" with SHA-256
    /// 2. Look up this hash in the store
    /// 3. If found and enabled, proceed to the quota check
    pub key_hash: String,

    /// Opaque name of the tenant this key belongs to
    pub owner: String,

    /// Whether this key is currently active
    ///
    /// Disabled keys are rejected during authorization. This provides a way to revoke access without deleting the record.
    pub enabled: bool,

    /// Requests allowed per fixed window
    pub quota_limit: i64,

    /// Requests left in the current window, never observable negative
    pub quota_remaining: i64,

    /// Start of the current quota window
    pub window_start: DateTime<Utc>,

    /// Timestamp when this key was created
    pub created_at: DateTime<Utc>,
}

/// Fields needed to insert a fresh key record.
///
/// The store fills `created_at`; a new key always starts with a full window
/// (`quota_remaining = quota_limit`, `window_start = now`).
#[derive(Debug, Clone)]
pub struct NewKeyRecord {
    pub id: Uuid,
    pub key_hash: String,
    pub owner: String,
    pub quota_limit: i64,
    pub window_start: DateTime<Utc>,
}

/// Request body for `POST /create-key`.
#[derive(Debug, Deserialize)]
pub struct IssueKeyRequest {
    /// Name of the key holder (non-empty)
    pub owner: String,

    /// Requests allowed per window (positive)
    pub quota_limit: i64,
}

/// Response body for `POST /create-key`.
///
/// The only place the plaintext key ever appears.
#[derive(Debug, Serialize)]
pub struct IssueKeyResponse {
    /// The plaintext API key; shown once, stored only as a hash
    pub api_key: String,

    /// Echo of the owner the key was issued to
    pub owner: String,

    /// Echo of the per-window quota
    pub quota_limit: i64,
}
