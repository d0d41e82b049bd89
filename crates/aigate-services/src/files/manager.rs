//! File manager
//!
//! Blobs live directly under the storage directory, named by `file_id`.
//! Uploads stream into `<file_id>.tmp` and are renamed into place before their
//! metadata is written, so any reader that finds metadata finds a complete blob.

use aigate_core::clock::{duration_secs, Clock, SystemClock};
use aigate_core::config::FileConfig;
use aigate_core::error::AppError;
use aigate_core::models::{DownloadToken, FileInfo};
use aigate_core::validation::{validate_file_id, FILE_ID_PREFIX};
use aigate_storage::{store_ttl, EphemeralStore, KeyLayout, StoreError};
use bytes::Bytes;
use futures::Stream;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::fs;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio_util::io::ReaderStream;
use uuid::Uuid;

const TMP_SUFFIX: &str = ".tmp";
const TOKEN_PREFIX: &str = "dl_";
const COPY_BUF_SIZE: usize = 64 * 1024;

/// Stream of blob bytes handed to the download handler
pub type ByteStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send>>;

/// Trim, lower-case and drop any `;`-parameters from a declared MIME type.
pub fn normalize_mime_type(raw: &str) -> String {
    raw.split(';').next().unwrap_or("").trim().to_lowercase()
}

pub struct FileManager {
    store: Arc<dyn EphemeralStore>,
    keys: KeyLayout,
    config: FileConfig,
    clock: Arc<dyn Clock>,
}

impl FileManager {
    /// Create a file manager, creating the storage directory if needed.
    pub async fn new(
        store: Arc<dyn EphemeralStore>,
        keys: KeyLayout,
        config: FileConfig,
    ) -> Result<Self, AppError> {
        Self::with_clock(store, keys, config, Arc::new(SystemClock)).await
    }

    pub async fn with_clock(
        store: Arc<dyn EphemeralStore>,
        keys: KeyLayout,
        config: FileConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AppError> {
        fs::create_dir_all(&config.storage_path).await.map_err(|e| {
            AppError::Internal(format!(
                "Failed to create storage directory {}: {}",
                config.storage_path.display(),
                e
            ))
        })?;

        Ok(Self {
            store,
            keys,
            config,
            clock,
        })
    }

    pub fn config(&self) -> &FileConfig {
        &self.config
    }

    fn blob_path(&self, file_id: &str) -> PathBuf {
        self.config.storage_path.join(file_id)
    }

    /// Stream `reader` into a new blob and publish its metadata.
    ///
    /// Rejects disallowed MIME types before touching the disk. Reads at most
    /// `max_size + 1` bytes; anything beyond `max_size` fails with
    /// `FileTooLarge` and leaves neither blob nor metadata.
    #[tracing::instrument(skip(self, reader), fields(file_id))]
    pub async fn upload<R>(
        &self,
        user_id: i64,
        file_name: &str,
        mime_type: &str,
        reader: R,
    ) -> Result<FileInfo, AppError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let mime_type = normalize_mime_type(mime_type);
        if !self.config.is_allowed_type(&mime_type) {
            return Err(AppError::InvalidFileType(mime_type));
        }

        let file_id = format!("{}{}", FILE_ID_PREFIX, Uuid::new_v4());
        tracing::Span::current().record("file_id", file_id.as_str());
        let final_path = self.blob_path(&file_id);
        let start = std::time::Instant::now();

        // Removed on drop until persisted
        let tmp = tempfile::Builder::new()
            .prefix(&file_id)
            .suffix(TMP_SUFFIX)
            .rand_bytes(0)
            .tempfile_in(&self.config.storage_path)
            .map_err(|e| AppError::Internal(format!("Failed to create upload file: {}", e)))?;
        let (std_file, tmp_path) = tmp.into_parts();
        let mut file = fs::File::from_std(std_file);

        let limit = self.config.max_size;
        let mut limited = reader.take(limit.saturating_add(1));
        let mut hasher = Sha256::new();
        let mut buf = vec![0u8; COPY_BUF_SIZE];
        let mut size: u64 = 0;

        loop {
            let n = limited
                .read(&mut buf)
                .await
                .map_err(|e| AppError::Internal(format!("Failed to read upload stream: {}", e)))?;
            if n == 0 {
                break;
            }
            size += n as u64;
            if size > limit {
                tracing::debug!(file_id = %file_id, limit, "Upload exceeds size limit");
                return Err(AppError::FileTooLarge { size, limit });
            }
            hasher.update(&buf[..n]);
            file.write_all(&buf[..n]).await.map_err(|e| {
                AppError::Internal(format!("Failed to write upload file: {}", e))
            })?;
        }

        file.flush().await?;
        file.sync_all()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to sync upload file: {}", e)))?;
        drop(file);

        tmp_path.persist(&final_path).map_err(|e| {
            AppError::Internal(format!(
                "Failed to publish {}: {}",
                final_path.display(),
                e.error
            ))
        })?;

        let now = self.clock.now_secs();
        let info = FileInfo {
            file_id: file_id.clone(),
            file_name: file_name.to_string(),
            mime_type,
            size,
            sha256: hex::encode(hasher.finalize()),
            user_id,
            created_at: now,
            expires_at: now.saturating_add(duration_secs(self.config.ttl)),
        };

        if let Err(e) = self.write_info(&info).await {
            if let Err(rm) = fs::remove_file(&final_path).await {
                tracing::error!(error = %rm, file_id = %file_id, "Failed to remove blob after metadata failure");
            }
            return Err(e);
        }

        tracing::info!(
            file_id = %file_id,
            user_id,
            mime_type = %info.mime_type,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "File uploaded"
        );

        Ok(info)
    }

    async fn write_info(&self, info: &FileInfo) -> Result<(), AppError> {
        let payload = serde_json::to_string(info)?;
        self.store
            .set(
                &self.keys.file_info(&info.file_id),
                payload,
                store_ttl(self.config.ttl),
            )
            .await
            .map_err(|e| AppError::Store(format!("failed to store file metadata: {}", e)))
    }

    /// Metadata of a live file. Missing or expired files are `FileNotFound`.
    pub async fn get_file_info(&self, file_id: &str) -> Result<FileInfo, AppError> {
        validate_file_id(file_id)?;

        let payload = match self.store.get(&self.keys.file_info(file_id)).await {
            Ok(payload) => payload,
            Err(StoreError::NotFound(_)) => return Err(AppError::FileNotFound(file_id.to_string())),
            Err(e) => return Err(e.into()),
        };

        let info: FileInfo = serde_json::from_str(&payload)?;
        if info.is_expired_at(self.clock.now_secs()) {
            return Err(AppError::FileNotFound(file_id.to_string()));
        }

        Ok(info)
    }

    /// Filesystem path of a live file, after re-checking metadata and blob.
    pub async fn get_file_path(&self, file_id: &str) -> Result<PathBuf, AppError> {
        self.get_file_info(file_id).await?;

        let path = self.blob_path(file_id);
        if !fs::try_exists(&path).await.unwrap_or(false) {
            tracing::warn!(file_id = %file_id, "Metadata present but blob missing");
            return Err(AppError::FileNotFound(file_id.to_string()));
        }

        Ok(path)
    }

    /// Remove blob and metadata. Deleting a missing file succeeds.
    pub async fn delete_file(&self, file_id: &str) -> Result<(), AppError> {
        validate_file_id(file_id)?;

        match fs::remove_file(self.blob_path(file_id)).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        match self.store.del(&self.keys.file_info(file_id)).await {
            Ok(_) | Err(StoreError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }

        tracing::info!(file_id = %file_id, "File deleted");
        Ok(())
    }

    /// Mint a bearer token for a live file.
    pub async fn generate_download_token(&self, file_id: &str) -> Result<DownloadToken, AppError> {
        self.get_file_info(file_id).await?;

        let token = DownloadToken {
            token: format!("{}{}", TOKEN_PREFIX, Uuid::new_v4()),
            file_id: file_id.to_string(),
            expires_at: self
                .clock
                .now_secs()
                .saturating_add(duration_secs(self.config.token_ttl)),
        };

        let payload = serde_json::to_string(&token)?;
        self.store
            .set(
                &self.keys.download_token(&token.token),
                payload,
                store_ttl(self.config.token_ttl),
            )
            .await
            .map_err(|e| AppError::Store(format!("failed to store download token: {}", e)))?;

        tracing::debug!(file_id = %file_id, expires_at = token.expires_at, "Download token issued");
        Ok(token)
    }

    /// Resolve a token to its file. Unknown or expired tokens are `FileNotFound`.
    pub async fn validate_download_token(&self, token: &str) -> Result<FileInfo, AppError> {
        let key = self.keys.download_token(token);
        let payload = match self.store.get(&key).await {
            Ok(payload) => payload,
            Err(StoreError::NotFound(_)) => {
                return Err(AppError::FileNotFound("download token".to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        let record: DownloadToken = serde_json::from_str(&payload)?;
        if record.is_expired_at(self.clock.now_secs()) {
            if let Err(e) = self.store.del(&key).await {
                tracing::warn!(error = %e, "Failed to delete expired download token");
            }
            return Err(AppError::FileNotFound("download token".to_string()));
        }

        self.get_file_info(&record.file_id).await
    }

    /// Validate `token` and open the blob for reading.
    pub async fn open_download(&self, token: &str) -> Result<(FileInfo, fs::File), AppError> {
        let info = self.validate_download_token(token).await?;
        let path = self.get_file_path(&info.file_id).await?;

        let file = fs::File::open(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::FileNotFound(info.file_id.clone())
            } else {
                AppError::Internal(format!("Failed to open {}: {}", path.display(), e))
            }
        })?;

        Ok((info, file))
    }

    /// Validate `token` and stream the blob in chunks.
    pub async fn download_stream(&self, token: &str) -> Result<(FileInfo, ByteStream), AppError> {
        let (info, file) = self.open_download(token).await?;
        Ok((info, Box::pin(ReaderStream::new(file))))
    }

    /// Reconcile the storage directory with the metadata store.
    ///
    /// Removes stale `.tmp` files, stale blobs without metadata, and expired
    /// blobs together with their metadata. Returns the number of entries removed.
    ///
    /// Files younger than `stale_upload_grace` are never treated as orphans, so
    /// an upload between rename and metadata write keeps its blob.
    #[tracing::instrument(skip(self), fields(cleanup.operation = "expire_files"))]
    pub async fn cleanup_expired_files(&self) -> Result<usize, AppError> {
        let now = self.clock.now_secs();
        let mut entries = fs::read_dir(&self.config.storage_path).await?;
        let mut cleaned = 0usize;

        while let Some(entry) = entries.next_entry().await? {
            match entry.file_type().await {
                Ok(file_type) if file_type.is_file() => {}
                Ok(_) => continue,
                Err(e) => {
                    tracing::warn!(error = %e, path = %entry.path().display(), "Failed to stat entry");
                    continue;
                }
            }

            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };

            if name.ends_with(TMP_SUFFIX) {
                if self.is_past_grace(&entry).await {
                    match fs::remove_file(entry.path()).await {
                        Ok(()) => {
                            tracing::info!(file = %name, "Removed stranded upload");
                            cleaned += 1;
                        }
                        Err(e) => {
                            tracing::error!(error = %e, file = %name, "Failed to remove stranded upload");
                        }
                    }
                }
                continue;
            }

            match self.sweep_blob(&entry, &name, now).await {
                Ok(true) => cleaned += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::error!(error = %e, file_id = %name, "Failed to sweep blob, continuing");
                }
            }
        }

        tracing::info!(cleaned, "File sweep completed");
        Ok(cleaned)
    }

    async fn is_past_grace(&self, entry: &fs::DirEntry) -> bool {
        let modified = match entry.metadata().await.and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) => {
                tracing::warn!(error = %e, path = %entry.path().display(), "Failed to read file mtime");
                return false;
            }
        };
        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO);
        age >= self.config.stale_upload_grace
    }

    /// Remove one blob if it is expired, or orphaned for longer than the grace
    /// period. Store outages leave it alone.
    async fn sweep_blob(
        &self,
        entry: &fs::DirEntry,
        file_id: &str,
        now: i64,
    ) -> Result<bool, AppError> {
        let key = self.keys.file_info(file_id);
        let remove = match self.store.get(&key).await {
            Ok(payload) => match serde_json::from_str::<FileInfo>(&payload) {
                Ok(info) => info.expires_at < now,
                Err(e) => {
                    tracing::warn!(error = %e, file_id = %file_id, "Unreadable file metadata");
                    self.is_past_grace(entry).await
                }
            },
            Err(StoreError::NotFound(_)) => self.is_past_grace(entry).await,
            Err(e) => return Err(e.into()),
        };

        if !remove {
            return Ok(false);
        }

        match fs::remove_file(self.blob_path(file_id)).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        if let Err(e) = self.store.del(&key).await {
            tracing::warn!(error = %e, file_id = %file_id, "Failed to delete file metadata");
        }

        tracing::info!(file_id = %file_id, "Deleted expired or orphaned file");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aigate_core::clock::ManualClock;
    use aigate_core::error::{ErrorCode, ErrorMetadata};
    use aigate_storage::MemoryStore;
    use tempfile::TempDir;

    async fn manager(max_size: u64) -> (FileManager, TempDir, Arc<ManualClock>) {
        let dir = tempfile::tempdir().unwrap();
        let config = FileConfig {
            max_size,
            storage_path: dir.path().to_path_buf(),
            stale_upload_grace: Duration::ZERO,
            ..FileConfig::default()
        };
        let clock = Arc::new(ManualClock::starting_now());
        let manager = FileManager::with_clock(
            Arc::new(MemoryStore::new()),
            KeyLayout::default(),
            config,
            clock.clone(),
        )
        .await
        .unwrap();
        (manager, dir, clock)
    }

    fn dir_entries(dir: &TempDir) -> Vec<String> {
        std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect()
    }

    #[test]
    fn test_normalize_mime_type() {
        assert_eq!(normalize_mime_type(" Text/Plain; charset=utf-8"), "text/plain");
        assert_eq!(normalize_mime_type("IMAGE/PNG"), "image/png");
        assert_eq!(normalize_mime_type(""), "");
    }

    #[tokio::test]
    async fn test_disallowed_type_writes_nothing() {
        let (manager, dir, _) = manager(1024).await;
        let err = manager
            .upload(1, "setup.exe", "application/x-msdownload", &b"MZ"[..])
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::InvalidFileType);
        assert!(dir_entries(&dir).is_empty());
    }

    #[tokio::test]
    async fn test_exact_limit_succeeds() {
        let (manager, dir, _) = manager(16).await;
        let data = [7u8; 16];
        let info = manager.upload(1, "a.txt", "text/plain", &data[..]).await.unwrap();
        assert_eq!(info.size, 16);
        assert_eq!(dir_entries(&dir), vec![info.file_id.clone()]);
    }

    #[tokio::test]
    async fn test_over_limit_leaves_no_trace() {
        let (manager, dir, _) = manager(16).await;
        let data = [7u8; 17];
        let err = manager
            .upload(1, "a.txt", "text/plain", &data[..])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::FileTooLarge { limit: 16, .. }));
        assert!(dir_entries(&dir).is_empty());
    }

    #[tokio::test]
    async fn test_get_file_path_and_delete() {
        let (manager, dir, _) = manager(1024).await;
        let info = manager.upload(1, "a.csv", "text/csv", &b"x,y"[..]).await.unwrap();

        let path = manager.get_file_path(&info.file_id).await.unwrap();
        assert_eq!(path, dir.path().join(&info.file_id));

        manager.delete_file(&info.file_id).await.unwrap();
        manager.delete_file(&info.file_id).await.unwrap();
        assert!(dir_entries(&dir).is_empty());

        let err = manager.get_file_info(&info.file_id).await.unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::FileNotFound);
    }

    #[tokio::test]
    async fn test_rejects_malformed_file_id() {
        let (manager, _dir, _) = manager(1024).await;
        let err = manager.get_file_path("../etc/passwd").await.unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::InvalidRequest);
    }

    #[tokio::test]
    async fn test_expired_token_is_not_found() {
        let (manager, _dir, clock) = manager(1024).await;
        let info = manager.upload(1, "a.txt", "text/plain", &b"hi"[..]).await.unwrap();
        let token = manager.generate_download_token(&info.file_id).await.unwrap();
        assert!(token.token.starts_with("dl_"));

        clock.advance(manager.config().token_ttl + Duration::from_secs(1));
        let err = manager.validate_download_token(&token.token).await.unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::FileNotFound);
    }

    #[tokio::test]
    async fn test_sweep_removes_orphans_and_stale_uploads() {
        let (manager, dir, _) = manager(1024).await;
        let kept = manager.upload(1, "a.txt", "text/plain", &b"keep"[..]).await.unwrap();

        let orphan = format!("file_{}", Uuid::new_v4());
        std::fs::write(dir.path().join(&orphan), b"orphan").unwrap();
        std::fs::write(dir.path().join(format!("{}.tmp", orphan)), b"partial").unwrap();
        std::fs::create_dir(dir.path().join("subdir")).unwrap();

        let cleaned = manager.cleanup_expired_files().await.unwrap();
        assert_eq!(cleaned, 2);

        let mut remaining = dir_entries(&dir);
        remaining.sort();
        let mut expected = vec![kept.file_id.clone(), "subdir".to_string()];
        expected.sort();
        assert_eq!(remaining, expected);
    }

    #[tokio::test]
    async fn test_sweep_removes_expired_blob_and_metadata() {
        let (manager, dir, clock) = manager(1024).await;
        let info = manager.upload(1, "a.txt", "text/plain", &b"old"[..]).await.unwrap();

        clock.advance(manager.config().ttl + Duration::from_secs(1));
        assert_eq!(manager.cleanup_expired_files().await.unwrap(), 1);
        assert!(dir_entries(&dir).is_empty());
        assert!(manager.get_file_info(&info.file_id).await.is_err());
    }

    #[tokio::test]
    async fn test_sweep_spares_fresh_uploads_within_grace() {
        let dir = tempfile::tempdir().unwrap();
        let config = FileConfig {
            storage_path: dir.path().to_path_buf(),
            ..FileConfig::default()
        };
        let manager = FileManager::new(Arc::new(MemoryStore::new()), KeyLayout::default(), config)
            .await
            .unwrap();

        let fresh_blob = format!("file_{}", Uuid::new_v4());
        std::fs::write(dir.path().join("file_inflight.tmp"), b"partial").unwrap();
        std::fs::write(dir.path().join(&fresh_blob), b"published").unwrap();
        assert_eq!(manager.cleanup_expired_files().await.unwrap(), 0);

        let mut remaining = dir_entries(&dir);
        remaining.sort();
        let mut expected = vec!["file_inflight.tmp".to_string(), fresh_blob];
        expected.sort();
        assert_eq!(remaining, expected);
    }
}
