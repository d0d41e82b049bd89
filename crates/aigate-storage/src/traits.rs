//! Shared store abstraction trait
//!
//! This module defines the `EphemeralStore` trait that all shared key-value
//! backends must implement. Records are JSON strings with a time-to-live.

use aigate_core::AppError;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Added to every store TTL so a record outlives its own `expires_at` in the
/// store and its expiry check can run.
pub const EXPIRY_GRACE: Duration = Duration::from_secs(30);

/// Store TTL for a record valid for `ttl`
pub fn store_ttl(ttl: Duration) -> Duration {
    ttl.saturating_add(EXPIRY_GRACE)
}

/// Store operation errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Key not found: {0}")]
    NotFound(String),

    #[error("Store backend error: {0}")]
    Backend(String),

    #[error("Store connection error: {0}")]
    Connection(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Store(err.to_string())
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Shared ephemeral key-value store
///
/// Implementations must expire keys on their own once the TTL elapses. Callers
/// write the TTL with `EXPIRY_GRACE` added and treat the expiry recorded inside
/// each value as authoritative.
#[async_trait]
pub trait EphemeralStore: Send + Sync {
    /// Store `value` under `key`, replacing any previous value.
    ///
    /// A zero `ttl` stores the key without expiry.
    async fn set(&self, key: &str, value: String, ttl: Duration) -> StoreResult<()>;

    /// Fetch the value under `key`. Missing or expired keys yield `StoreError::NotFound`.
    async fn get(&self, key: &str) -> StoreResult<String>;

    /// Remove `key` and report whether it existed. Removing a missing key is not an error.
    ///
    /// At most one of several concurrent deletes of the same key returns `true`.
    async fn del(&self, key: &str) -> StoreResult<bool>;
}
