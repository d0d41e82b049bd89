//! Configuration module
//!
//! This module provides configuration structures for the confirmation manager
//! and the file manager. Defaults match the documented deployment defaults;
//! `GateConfig::from_env` overlays environment variables (and `.env`).

use std::env;
use std::path::PathBuf;
use std::time::Duration;

// Common constants
const CONFIRMATION_TTL_SECS: u64 = 5 * 60;
const CLEANUP_INTERVAL_SECS: u64 = 60;
const FILE_MAX_SIZE_MB: u64 = 10;
const FILE_TTL_SECS: u64 = 24 * 60 * 60;
const FILE_TOKEN_TTL_SECS: u64 = 60 * 60;
const STALE_UPLOAD_GRACE_SECS: u64 = 10 * 60;

pub const DEFAULT_REDIS_PREFIX: &str = "ai_assistant:";
pub const DEFAULT_STORAGE_PATH: &str = "./data/ai_files";
pub const DEFAULT_ALLOWED_TYPES: [&str; 8] = [
    "image/png",
    "image/jpeg",
    "image/gif",
    "image/webp",
    "text/plain",
    "text/csv",
    "application/json",
    "application/pdf",
];

/// Confirmation manager configuration
#[derive(Clone, Debug)]
pub struct ConfirmationConfig {
    /// Lifetime of a pending confirmation record
    pub ttl: Duration,
    /// Interval between sweeper runs
    pub cleanup_interval: Duration,
    /// Prefix for every shared-store key
    pub redis_prefix: String,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(CONFIRMATION_TTL_SECS),
            cleanup_interval: Duration::from_secs(CLEANUP_INTERVAL_SECS),
            redis_prefix: DEFAULT_REDIS_PREFIX.to_string(),
        }
    }
}

/// File manager configuration
#[derive(Clone, Debug)]
pub struct FileConfig {
    /// Maximum accepted upload size in bytes
    pub max_size: u64,
    /// Directory holding blobs, named by file id
    pub storage_path: PathBuf,
    /// Lifetime of an uploaded file
    pub ttl: Duration,
    /// Accepted MIME types, lower-cased
    pub allowed_types: Vec<String>,
    /// Lifetime of a download token
    pub token_ttl: Duration,
    /// `.tmp` files younger than this are left alone by the sweeper
    pub stale_upload_grace: Duration,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            max_size: FILE_MAX_SIZE_MB * 1024 * 1024,
            storage_path: PathBuf::from(DEFAULT_STORAGE_PATH),
            ttl: Duration::from_secs(FILE_TTL_SECS),
            allowed_types: DEFAULT_ALLOWED_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            token_ttl: Duration::from_secs(FILE_TOKEN_TTL_SECS),
            stale_upload_grace: Duration::from_secs(STALE_UPLOAD_GRACE_SECS),
        }
    }
}

impl FileConfig {
    /// Whether `mime_type` (already normalized) is accepted
    pub fn is_allowed_type(&self, mime_type: &str) -> bool {
        self.allowed_types.iter().any(|t| t == mime_type)
    }
}

/// Gating core configuration
#[derive(Clone, Debug, Default)]
pub struct GateConfig {
    pub confirmation: ConfirmationConfig,
    pub file: FileConfig,
    pub environment: String,
}

impl GateConfig {
    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let confirmation = ConfirmationConfig {
            ttl: Duration::from_secs(
                env::var("CONFIRMATION_TTL_SECS")
                    .unwrap_or_else(|_| CONFIRMATION_TTL_SECS.to_string())
                    .parse()
                    .unwrap_or(CONFIRMATION_TTL_SECS),
            ),
            cleanup_interval: Duration::from_secs(
                env::var("CONFIRMATION_CLEANUP_INTERVAL_SECS")
                    .unwrap_or_else(|_| CLEANUP_INTERVAL_SECS.to_string())
                    .parse()
                    .unwrap_or(CLEANUP_INTERVAL_SECS),
            ),
            redis_prefix: env::var("REDIS_PREFIX")
                .unwrap_or_else(|_| DEFAULT_REDIS_PREFIX.to_string()),
        };

        let max_size_mb = env::var("FILE_MAX_SIZE_MB")
            .unwrap_or_else(|_| FILE_MAX_SIZE_MB.to_string())
            .parse::<u64>()
            .unwrap_or(FILE_MAX_SIZE_MB);

        let allowed_types = env::var("FILE_ALLOWED_TYPES")
            .unwrap_or_else(|_| DEFAULT_ALLOWED_TYPES.join(","))
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        let file = FileConfig {
            max_size: max_size_mb * 1024 * 1024,
            storage_path: PathBuf::from(
                env::var("FILE_STORAGE_PATH").unwrap_or_else(|_| DEFAULT_STORAGE_PATH.to_string()),
            ),
            ttl: Duration::from_secs(
                env::var("FILE_TTL_SECS")
                    .unwrap_or_else(|_| FILE_TTL_SECS.to_string())
                    .parse()
                    .unwrap_or(FILE_TTL_SECS),
            ),
            allowed_types,
            token_ttl: Duration::from_secs(
                env::var("FILE_TOKEN_TTL_SECS")
                    .unwrap_or_else(|_| FILE_TOKEN_TTL_SECS.to_string())
                    .parse()
                    .unwrap_or(FILE_TOKEN_TTL_SECS),
            ),
            stale_upload_grace: Duration::from_secs(
                env::var("FILE_STALE_UPLOAD_GRACE_SECS")
                    .unwrap_or_else(|_| STALE_UPLOAD_GRACE_SECS.to_string())
                    .parse()
                    .unwrap_or(STALE_UPLOAD_GRACE_SECS),
            ),
        };

        let config = GateConfig {
            confirmation,
            file,
            environment,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.confirmation.ttl.is_zero() {
            return Err(anyhow::anyhow!("CONFIRMATION_TTL_SECS must be greater than zero"));
        }

        if self.confirmation.cleanup_interval.is_zero() {
            return Err(anyhow::anyhow!(
                "CONFIRMATION_CLEANUP_INTERVAL_SECS must be greater than zero"
            ));
        }

        let prefix = &self.confirmation.redis_prefix;
        if !prefix.is_empty() && !prefix.ends_with(':') {
            return Err(anyhow::anyhow!("REDIS_PREFIX must end with ':'"));
        }

        if self.file.max_size == 0 {
            return Err(anyhow::anyhow!("FILE_MAX_SIZE_MB must be greater than zero"));
        }

        if self.file.storage_path.as_os_str().is_empty() {
            return Err(anyhow::anyhow!("FILE_STORAGE_PATH must not be empty"));
        }

        if self.file.ttl.is_zero() || self.file.token_ttl.is_zero() {
            return Err(anyhow::anyhow!(
                "FILE_TTL_SECS and FILE_TOKEN_TTL_SECS must be greater than zero"
            ));
        }

        if self.file.allowed_types.is_empty() {
            return Err(anyhow::anyhow!("FILE_ALLOWED_TYPES must list at least one type"));
        }

        Ok(())
    }
}
