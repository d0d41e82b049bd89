//! AI Gate Services Layer
//!
//! Behaviour of the gating core: the confirmation manager that turns risky
//! operations into single-use, owner-bound confirmation records, the file
//! manager that publishes uploads atomically and hands out download tokens,
//! and the background sweeper that reconciles blobs with their metadata.

pub mod cleanup;
pub mod confirmation;
pub mod files;

pub use cleanup::{CleanupReport, CleanupService};
pub use confirmation::{
    build_alert_mute, build_k8s, build_mcp, build_sql, ConfirmationManager, AUDIT_TARGET,
};
pub use files::{normalize_mime_type, ByteStream, FileManager};
