//! Multi-tenant authorizing gateway.
//!
//! An admission-controlled reverse proxy with per-tenant credential
//! injection. Every protected request is authorized fresh — bearer credential
//! validated, per-key quota consumed through a single conditional store
//! write — and then forwarded to the resolved provider backend with the
//! provider's secret injected, never the caller's.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Key Store / Provider Registry**: PostgreSQL with sqlx, behind traits
//!   so tests run the same router over in-memory implementations
//! - **Authentication**: bearer API keys, stored as SHA-256 hashes
//! - **Forwarding**: reqwest with a configured upstream timeout

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
