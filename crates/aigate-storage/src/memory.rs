//! In-process store implementation
//!
//! Entries carry their own expiry and are dropped lazily on access or eagerly
//! by `purge_expired`. Suitable for single-node deployments and tests.

use crate::traits::{EphemeralStore, StoreError, StoreResult};
use aigate_core::clock::{duration_secs, Clock, SystemClock};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<i64>,
}

impl Entry {
    fn is_expired(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|at| now > at)
    }
}

/// In-memory `EphemeralStore` with TTL support
#[derive(Debug)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Drop every expired entry and return how many were removed.
    pub fn purge_expired(&self) -> StoreResult<usize> {
        let now = self.clock.now_secs();
        let mut entries = self
            .entries
            .write()
            .map_err(|e| StoreError::Backend(format!("lock poisoned: {}", e)))?;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        Ok(before - entries.len())
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        let now = self.clock.now_secs();
        self.entries
            .read()
            .map(|entries| entries.values().filter(|e| !e.is_expired(now)).count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EphemeralStore for MemoryStore {
    async fn set(&self, key: &str, value: String, ttl: Duration) -> StoreResult<()> {
        let expires_at = if ttl.is_zero() {
            None
        } else {
            Some(self.clock.now_secs().saturating_add(duration_secs(ttl)))
        };

        let mut entries = self
            .entries
            .write()
            .map_err(|e| StoreError::Backend(format!("lock poisoned: {}", e)))?;
        entries.insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<String> {
        let now = self.clock.now_secs();
        {
            let entries = self
                .entries
                .read()
                .map_err(|e| StoreError::Backend(format!("lock poisoned: {}", e)))?;
            match entries.get(key) {
                Some(entry) if !entry.is_expired(now) => return Ok(entry.value.clone()),
                Some(_) => {}
                None => return Err(StoreError::NotFound(key.to_string())),
            }
        }

        // Expired: evict so the key reads as absent from now on
        let mut entries = self
            .entries
            .write()
            .map_err(|e| StoreError::Backend(format!("lock poisoned: {}", e)))?;
        if entries.get(key).is_some_and(|e| e.is_expired(now)) {
            entries.remove(key);
        }
        tracing::trace!(key = %key, "Evicted expired store entry");
        Err(StoreError::NotFound(key.to_string()))
    }

    async fn del(&self, key: &str) -> StoreResult<bool> {
        let now = self.clock.now_secs();
        let mut entries = self
            .entries
            .write()
            .map_err(|e| StoreError::Backend(format!("lock poisoned: {}", e)))?;
        Ok(entries
            .remove(key)
            .is_some_and(|entry| !entry.is_expired(now)))
    }
}
