//! Data models representing database entities and per-request values.

/// Authorization decisions and router context
pub mod decision;
/// API key record and issuance DTOs
pub mod key_record;
/// Provider registry record
pub mod provider;
