//! Test helpers: build the gating services over an in-process store.
//!
//! Run from workspace root: `cargo test -p aigate-services`.

#![allow(dead_code)]

use aigate_core::clock::ManualClock;
use aigate_core::config::{ConfirmationConfig, FileConfig};
use aigate_services::{ConfirmationManager, FileManager};
use aigate_storage::{EphemeralStore, KeyLayout, MemoryStore, StoreError, StoreResult};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Notify;

/// Services sharing one store and one manually driven clock.
pub struct TestGate {
    pub confirmations: ConfirmationManager,
    pub files: FileManager,
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub _temp_dir: TempDir,
}

pub async fn setup_gate() -> TestGate {
    setup_gate_with(FileConfig::default().max_size).await
}

pub async fn setup_gate_with(max_size: u64) -> TestGate {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let clock = Arc::new(ManualClock::starting_now());
    let store = Arc::new(MemoryStore::with_clock(clock.clone()));

    let confirmations =
        ConfirmationManager::with_clock(store.clone(), &ConfirmationConfig::default(), clock.clone());

    let file_config = FileConfig {
        max_size,
        storage_path: temp_dir.path().to_path_buf(),
        stale_upload_grace: Duration::ZERO,
        ..FileConfig::default()
    };
    let files = FileManager::with_clock(store.clone(), KeyLayout::default(), file_config, clock.clone())
        .await
        .expect("Failed to create file manager");

    TestGate {
        confirmations,
        files,
        store,
        clock,
        _temp_dir: temp_dir,
    }
}

/// Names of the entries currently in the storage directory
pub fn storage_entries(gate: &TestGate) -> Vec<String> {
    std::fs::read_dir(gate._temp_dir.path())
        .expect("Failed to read storage dir")
        .map(|e| e.expect("dir entry").file_name().to_string_lossy().into_owned())
        .collect()
}

/// Store whose writes always fail; reads see nothing.
#[derive(Debug, Default)]
pub struct UnavailableStore;

#[async_trait]
impl EphemeralStore for UnavailableStore {
    async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> StoreResult<()> {
        Err(StoreError::Connection("connection refused".to_string()))
    }

    async fn get(&self, key: &str) -> StoreResult<String> {
        Err(StoreError::NotFound(key.to_string()))
    }

    async fn del(&self, _key: &str) -> StoreResult<bool> {
        Ok(false)
    }
}

/// In-process store that holds file metadata writes until released.
///
/// `entered` fires when a file metadata `set` starts waiting; `release` lets it finish.
#[derive(Debug, Default)]
pub struct HeldMetadataStore {
    inner: MemoryStore,
    pub entered: Notify,
    pub release: Notify,
}

#[async_trait]
impl EphemeralStore for HeldMetadataStore {
    async fn set(&self, key: &str, value: String, ttl: Duration) -> StoreResult<()> {
        if key.contains(":file:") {
            self.entered.notify_one();
            self.release.notified().await;
        }
        self.inner.set(key, value, ttl).await
    }

    async fn get(&self, key: &str) -> StoreResult<String> {
        self.inner.get(key).await
    }

    async fn del(&self, key: &str) -> StoreResult<bool> {
        self.inner.del(key).await
    }
}
