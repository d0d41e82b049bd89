//! AI Gate Core Library
//!
//! This crate provides the value layer shared by every component that gates
//! side-effecting assistant operations: the error taxonomy, configuration,
//! domain models (confirmations, operations, uploaded files), the path
//! validator, the role predicate and the clock abstraction.

pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod validation;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfirmationConfig, FileConfig, GateConfig};
pub use error::{
    AppError, ErrorCode, ErrorMetadata, LogLevel, StructuredError, ToolBlock, ToolErrorEnvelope,
};
pub use models::{
    is_privileged, role_gate_status, Caller, ConfirmAction, ConfirmationResult, ConfirmationView,
    DownloadToken, FileInfo, Operation, OperationType, PendingConfirmation, RequestMap, RiskLevel,
    ADMIN_ROLE,
};
pub use validation::{validate_file_id, validate_path};
