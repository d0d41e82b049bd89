use crate::files::FileManager;
use aigate_core::error::AppError;
use aigate_storage::MemoryStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;

/// Outcome of a single sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub files_removed: usize,
    pub store_entries_purged: usize,
}

#[derive(Clone)]
pub struct CleanupService {
    files: Arc<FileManager>,
    /// Purged on every run when the shared store is in-process
    memory_store: Option<Arc<MemoryStore>>,
    interval: Duration,
}

impl CleanupService {
    pub fn new(files: Arc<FileManager>, interval: Duration) -> Self {
        Self {
            files,
            memory_store: None,
            interval,
        }
    }

    pub fn with_memory_store(mut self, store: Arc<MemoryStore>) -> Self {
        self.memory_store = Some(store);
        self
    }

    /// Start the background sweeper on a single task.
    /// Returns a JoinHandle for graceful shutdown
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut cleanup_interval = interval(self.interval);

            loop {
                cleanup_interval.tick().await;

                tracing::debug!("Starting scheduled sweep of expired files");

                match self.run_once().await {
                    Ok(report) => {
                        tracing::debug!(
                            files_removed = report.files_removed,
                            store_entries_purged = report.store_entries_purged,
                            "Sweep completed"
                        );
                    }
                    Err(e) => tracing::error!(error = %e, "Sweep failed"),
                }
            }
        })
    }

    /// Run one sweep. A partial sweep is completed by the next run.
    #[tracing::instrument(skip(self), fields(cleanup.operation = "sweep"))]
    pub async fn run_once(&self) -> Result<CleanupReport, AppError> {
        let files_removed = self.files.cleanup_expired_files().await?;

        let store_entries_purged = match self.memory_store {
            Some(ref store) => match store.purge_expired() {
                Ok(count) => count,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to purge expired store entries");
                    0
                }
            },
            None => 0,
        };

        if files_removed > 0 || store_entries_purged > 0 {
            tracing::info!(files_removed, store_entries_purged, "Cleanup completed");
        }

        Ok(CleanupReport {
            files_removed,
            store_entries_purged,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aigate_core::clock::ManualClock;
    use aigate_core::config::FileConfig;
    use aigate_storage::{EphemeralStore, KeyLayout};

    #[tokio::test]
    async fn test_run_once_sweeps_files_and_store() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::starting_now());
        let store = Arc::new(MemoryStore::with_clock(clock.clone()));
        let config = FileConfig {
            storage_path: dir.path().to_path_buf(),
            stale_upload_grace: Duration::ZERO,
            ..FileConfig::default()
        };
        let files = Arc::new(
            FileManager::with_clock(store.clone(), KeyLayout::default(), config, clock.clone())
                .await
                .unwrap(),
        );

        files.upload(1, "a.txt", "text/plain", &b"abc"[..]).await.unwrap();
        store
            .set("ai_assistant:confirm:stale", "{}".to_string(), Duration::from_secs(5))
            .await
            .unwrap();

        let service = CleanupService::new(files, Duration::from_secs(60))
            .with_memory_store(store.clone());

        let report = service.run_once().await.unwrap();
        assert_eq!(report, CleanupReport::default());

        clock.advance(Duration::from_secs(2 * 86_400));
        let report = service.run_once().await.unwrap();
        assert_eq!(report.files_removed, 1);
        // File metadata already went with the blob; only the confirmation is left to purge
        assert_eq!(report.store_entries_purged, 1);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_start_runs_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let config = FileConfig {
            storage_path: dir.path().to_path_buf(),
            stale_upload_grace: Duration::ZERO,
            ..FileConfig::default()
        };
        let files = Arc::new(
            FileManager::new(Arc::new(MemoryStore::new()), KeyLayout::default(), config)
                .await
                .unwrap(),
        );
        std::fs::write(dir.path().join("file_stranded.tmp"), b"x").unwrap();

        let handle = Arc::new(CleanupService::new(files, Duration::from_secs(3600))).start();
        for _ in 0..50 {
            if !dir.path().join("file_stranded.tmp").exists() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        handle.abort();

        assert!(!dir.path().join("file_stranded.tmp").exists());
    }
}
