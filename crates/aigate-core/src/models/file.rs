use serde::{Deserialize, Serialize};

/// Metadata of an uploaded artifact.
///
/// The blob lives at `<storage_path>/<file_id>`; `file_name` is client-supplied
/// and never used to build paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub file_id: String,
    pub file_name: String,
    pub mime_type: String,
    pub size: u64,
    /// Lower-case hex SHA-256 of the stored bytes
    pub sha256: String,
    pub user_id: i64,
    pub created_at: i64,
    pub expires_at: i64,
}

impl FileInfo {
    pub fn is_expired_at(&self, now: i64) -> bool {
        now > self.expires_at
    }
}

/// Short-lived bearer credential resolving to a file id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadToken {
    pub token: String,
    pub file_id: String,
    pub expires_at: i64,
}

impl DownloadToken {
    pub fn is_expired_at(&self, now: i64) -> bool {
        now > self.expires_at
    }
}
