//! Error types module
//!
//! This module provides the closed error code taxonomy surfaced to callers, the
//! structured error value carried in response bodies and tool-error envelopes,
//! and the `AppError` enum used throughout the gating core.
//!
//! Error codes are a stable wire contract. Messages are user-facing and may
//! change; raw backend text never goes into `message`, only into `details`.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::io;
use std::str::FromStr;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected protocol outcomes like expired confirmations
    Debug,
    /// Warning level - for rejected or suspicious requests
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Stable error codes, grouped by range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // General
    InternalError,
    InvalidRequest,
    // Session
    SessionNotFound,
    SessionExpired,
    SessionLimitExceeded,
    // Tool
    ToolNotFound,
    ToolCallFailed,
    ToolTimeout,
    UpstreamError,
    // Permission
    PermissionDenied,
    EnvNotAllowed,
    IpNotAllowed,
    // Confirmation
    ConfirmationExpired,
    ConfirmationNotFound,
    RiskRejected,
    // File
    FileNotFound,
    FileTooLarge,
    InvalidFileType,
    // MCP
    McpServerNotFound,
    McpConnectionFailed,
    McpHealthCheckFailed,
}

impl ErrorCode {
    pub const ALL: [ErrorCode; 21] = [
        ErrorCode::InternalError,
        ErrorCode::InvalidRequest,
        ErrorCode::SessionNotFound,
        ErrorCode::SessionExpired,
        ErrorCode::SessionLimitExceeded,
        ErrorCode::ToolNotFound,
        ErrorCode::ToolCallFailed,
        ErrorCode::ToolTimeout,
        ErrorCode::UpstreamError,
        ErrorCode::PermissionDenied,
        ErrorCode::EnvNotAllowed,
        ErrorCode::IpNotAllowed,
        ErrorCode::ConfirmationExpired,
        ErrorCode::ConfirmationNotFound,
        ErrorCode::RiskRejected,
        ErrorCode::FileNotFound,
        ErrorCode::FileTooLarge,
        ErrorCode::InvalidFileType,
        ErrorCode::McpServerNotFound,
        ErrorCode::McpConnectionFailed,
        ErrorCode::McpHealthCheckFailed,
    ];

    /// Wire value of the code
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InternalError => "INTERNAL_ERROR",
            ErrorCode::InvalidRequest => "INVALID_REQUEST",
            ErrorCode::SessionNotFound => "SESSION_NOT_FOUND",
            ErrorCode::SessionExpired => "SESSION_EXPIRED",
            ErrorCode::SessionLimitExceeded => "SESSION_LIMIT_EXCEEDED",
            ErrorCode::ToolNotFound => "TOOL_NOT_FOUND",
            ErrorCode::ToolCallFailed => "TOOL_CALL_FAILED",
            ErrorCode::ToolTimeout => "TOOL_TIMEOUT",
            ErrorCode::UpstreamError => "UPSTREAM_ERROR",
            ErrorCode::PermissionDenied => "PERMISSION_DENIED",
            ErrorCode::EnvNotAllowed => "ENV_NOT_ALLOWED",
            ErrorCode::IpNotAllowed => "IP_NOT_ALLOWED",
            ErrorCode::ConfirmationExpired => "CONFIRMATION_EXPIRED",
            ErrorCode::ConfirmationNotFound => "CONFIRMATION_NOT_FOUND",
            ErrorCode::RiskRejected => "RISK_REJECTED",
            ErrorCode::FileNotFound => "FILE_NOT_FOUND",
            ErrorCode::FileTooLarge => "FILE_TOO_LARGE",
            ErrorCode::InvalidFileType => "INVALID_FILE_TYPE",
            ErrorCode::McpServerNotFound => "MCP_SERVER_NOT_FOUND",
            ErrorCode::McpConnectionFailed => "MCP_CONNECTION_FAILED",
            ErrorCode::McpHealthCheckFailed => "MCP_HEALTH_CHECK_FAILED",
        }
    }

    /// Range the code belongs to
    pub fn group(&self) -> &'static str {
        match self {
            ErrorCode::InternalError | ErrorCode::InvalidRequest => "general",
            ErrorCode::SessionNotFound
            | ErrorCode::SessionExpired
            | ErrorCode::SessionLimitExceeded => "session",
            ErrorCode::ToolNotFound
            | ErrorCode::ToolCallFailed
            | ErrorCode::ToolTimeout
            | ErrorCode::UpstreamError => "tool",
            ErrorCode::PermissionDenied | ErrorCode::EnvNotAllowed | ErrorCode::IpNotAllowed => {
                "permission"
            }
            ErrorCode::ConfirmationExpired
            | ErrorCode::ConfirmationNotFound
            | ErrorCode::RiskRejected => "confirmation",
            ErrorCode::FileNotFound | ErrorCode::FileTooLarge | ErrorCode::InvalidFileType => {
                "file"
            }
            ErrorCode::McpServerNotFound
            | ErrorCode::McpConnectionFailed
            | ErrorCode::McpHealthCheckFailed => "mcp",
        }
    }

    /// Whether errors with this code are shaped as tool-error envelopes.
    pub fn is_tool_error(&self) -> bool {
        matches!(
            self,
            ErrorCode::ToolNotFound
                | ErrorCode::ToolCallFailed
                | ErrorCode::ToolTimeout
                | ErrorCode::UpstreamError
        )
    }

    /// HTTP status used when the error is rendered on its own
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorCode::InternalError => 500,
            ErrorCode::InvalidRequest => 400,
            ErrorCode::SessionNotFound => 404,
            ErrorCode::SessionExpired => 410,
            ErrorCode::SessionLimitExceeded => 429,
            ErrorCode::ToolNotFound => 404,
            ErrorCode::ToolCallFailed => 502,
            ErrorCode::ToolTimeout => 504,
            ErrorCode::UpstreamError => 502,
            ErrorCode::PermissionDenied | ErrorCode::EnvNotAllowed | ErrorCode::IpNotAllowed => {
                403
            }
            ErrorCode::ConfirmationExpired => 410,
            ErrorCode::ConfirmationNotFound => 404,
            ErrorCode::RiskRejected => 409,
            ErrorCode::FileNotFound => 404,
            ErrorCode::FileTooLarge => 413,
            ErrorCode::InvalidFileType => 415,
            ErrorCode::McpServerNotFound => 404,
            ErrorCode::McpConnectionFailed => 502,
            ErrorCode::McpHealthCheckFailed => 503,
        }
    }

    /// Default user-facing message for the code
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::SessionNotFound => "Session not found",
            ErrorCode::SessionExpired => "Session has expired",
            ErrorCode::SessionLimitExceeded => "Too many active sessions",
            ErrorCode::ToolNotFound => "Tool not found",
            ErrorCode::ToolCallFailed => "Tool call failed",
            ErrorCode::ToolTimeout => "Tool call timed out",
            ErrorCode::UpstreamError => "Upstream service error",
            ErrorCode::PermissionDenied => "Permission denied",
            ErrorCode::EnvNotAllowed => "Operation is not allowed in this environment",
            ErrorCode::IpNotAllowed => "Request origin is not allowed",
            ErrorCode::ConfirmationExpired => {
                "Confirmation has expired, please initiate the operation again"
            }
            ErrorCode::ConfirmationNotFound => "Confirmation not found or already processed",
            ErrorCode::RiskRejected => "Operation was rejected by the user",
            ErrorCode::FileNotFound => "File not found or expired",
            ErrorCode::FileTooLarge => "File is too large",
            ErrorCode::InvalidFileType => "File type is not allowed",
            ErrorCode::McpServerNotFound => "MCP server not found",
            ErrorCode::McpConnectionFailed => "Failed to connect to MCP server",
            ErrorCode::McpHealthCheckFailed => "MCP server health check failed",
        }
    }
}

impl Display for ErrorCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorCode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ErrorCode::ALL
            .iter()
            .copied()
            .find(|code| code.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("Unknown error code: {}", s))
    }
}

/// Structured error carried in response bodies and tool-error envelopes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{code}: {message}")]
pub struct StructuredError {
    pub code: ErrorCode,
    /// User-facing message
    pub message: String,
    /// Developer-facing details (backend error text, causes)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl StructuredError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Structured error with the code's default message
    pub fn from_code(code: ErrorCode) -> Self {
        Self::new(code, code.default_message())
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Wrap a tool-layer failure, keeping the cause's text out of the message.
    pub fn wrap_tool_error(code: ErrorCode, message: impl Into<String>, cause: impl Display) -> Self {
        Self::new(code, message).with_details(cause.to_string())
    }

    pub fn is_tool_error(&self) -> bool {
        self.code.is_tool_error()
    }
}

pub const ENVELOPE_STATUS_ERROR: &str = "error";

/// Tool block of a tool-error envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolBlock {
    pub called: bool,
    pub name: String,
    pub error: StructuredError,
}

/// Envelope returned to the client when a tool invocation fails
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolErrorEnvelope {
    pub trace_id: String,
    pub session_id: String,
    pub status: String,
    pub tool: ToolBlock,
}

impl ToolErrorEnvelope {
    pub fn new(
        trace_id: impl Into<String>,
        session_id: impl Into<String>,
        tool_name: impl Into<String>,
        error: StructuredError,
    ) -> Self {
        Self {
            trace_id: trace_id.into(),
            session_id: session_id.into(),
            status: ENVELOPE_STATUS_ERROR.to_string(),
            tool: ToolBlock {
                called: true,
                name: tool_name.into(),
                error,
            },
        }
    }

    /// Build an envelope only when `error` is a tool-layer error.
    pub fn for_error(
        trace_id: impl Into<String>,
        session_id: impl Into<String>,
        tool_name: impl Into<String>,
        error: StructuredError,
    ) -> Option<Self> {
        if error.is_tool_error() {
            Some(Self::new(trace_id, session_id, tool_name, error))
        } else {
            None
        }
    }
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code
    fn error_code(&self) -> ErrorCode;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden in production
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Confirmation not found: {0}")]
    ConfirmationNotFound(String),

    #[error("Confirmation expired: {0}")]
    ConfirmationExpired(String),

    #[error("Operation rejected: {0}")]
    RiskRejected(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Path traversal attempt: {0}")]
    PathTraversal(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("File too large: {size} bytes exceeds limit of {limit} bytes")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("Invalid file type: {0}")]
    InvalidFileType(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },

    /// Codes raised by collaborators (sessions, tools, MCP, environment checks)
    #[error(transparent)]
    Structured(StructuredError),
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(format!("JSON error: {}", err))
    }
}

impl From<StructuredError> for AppError {
    fn from(err: StructuredError) -> Self {
        AppError::Structured(err)
    }
}

/// Static metadata for each variant: (error_code, recoverable, suggested_action, sensitive, log_level).
fn app_error_static_metadata(
    err: &AppError,
) -> (ErrorCode, bool, Option<&'static str>, bool, LogLevel) {
    match err {
        AppError::ConfirmationNotFound(_) => (
            ErrorCode::ConfirmationNotFound,
            false,
            Some("Initiate the operation again"),
            false,
            LogLevel::Debug,
        ),
        AppError::ConfirmationExpired(_) => (
            ErrorCode::ConfirmationExpired,
            false,
            Some("Initiate the operation again"),
            false,
            LogLevel::Debug,
        ),
        AppError::RiskRejected(_) => (ErrorCode::RiskRejected, false, None, false, LogLevel::Debug),
        AppError::PermissionDenied(_) => (
            ErrorCode::PermissionDenied,
            false,
            Some("Contact an administrator for access"),
            false,
            LogLevel::Warn,
        ),
        AppError::InvalidRequest(_) => (
            ErrorCode::InvalidRequest,
            false,
            Some("Check request parameters and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::PathTraversal(_) => (
            ErrorCode::InvalidRequest,
            false,
            Some("Use a relative path inside the allowed directory"),
            false,
            LogLevel::Warn,
        ),
        AppError::FileNotFound(_) => (
            ErrorCode::FileNotFound,
            false,
            Some("Upload the file again"),
            false,
            LogLevel::Debug,
        ),
        AppError::FileTooLarge { .. } => (
            ErrorCode::FileTooLarge,
            false,
            Some("Reduce file size and retry"),
            false,
            LogLevel::Debug,
        ),
        AppError::InvalidFileType(_) => (
            ErrorCode::InvalidFileType,
            false,
            Some("Upload one of the allowed file types"),
            false,
            LogLevel::Debug,
        ),
        AppError::Store(_) | AppError::Internal(_) | AppError::InternalWithSource { .. } => (
            ErrorCode::InternalError,
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::Structured(e) => {
            let recoverable = matches!(
                e.code,
                ErrorCode::ToolTimeout
                    | ErrorCode::UpstreamError
                    | ErrorCode::McpConnectionFailed
                    | ErrorCode::McpHealthCheckFailed
            );
            let level = if e.code == ErrorCode::InternalError {
                LogLevel::Error
            } else if recoverable {
                LogLevel::Warn
            } else {
                LogLevel::Debug
            };
            (e.code, recoverable, None, false, level)
        }
    }
}

impl AppError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &str {
        match self {
            AppError::ConfirmationNotFound(_) => "ConfirmationNotFound",
            AppError::ConfirmationExpired(_) => "ConfirmationExpired",
            AppError::RiskRejected(_) => "RiskRejected",
            AppError::PermissionDenied(_) => "PermissionDenied",
            AppError::InvalidRequest(_) => "InvalidRequest",
            AppError::PathTraversal(_) => "PathTraversal",
            AppError::FileNotFound(_) => "FileNotFound",
            AppError::FileTooLarge { .. } => "FileTooLarge",
            AppError::InvalidFileType(_) => "InvalidFileType",
            AppError::Store(_) => "Store",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "Internal",
            AppError::Structured(_) => "Structured",
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }

    /// Convert into the wire shape. Backend text for sensitive errors goes to `details`.
    pub fn to_structured(&self) -> StructuredError {
        if let AppError::Structured(e) = self {
            return e.clone();
        }
        let structured = StructuredError::new(self.error_code(), self.client_message());
        if self.is_sensitive() {
            structured.with_details(self.detailed_message())
        } else {
            structured
        }
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        self.error_code().http_status()
    }

    fn error_code(&self) -> ErrorCode {
        app_error_static_metadata(self).0
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).1
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).2
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).3
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).4
    }

    fn client_message(&self) -> String {
        match self {
            AppError::ConfirmationNotFound(_) => {
                ErrorCode::ConfirmationNotFound.default_message().to_string()
            }
            AppError::ConfirmationExpired(_) => {
                ErrorCode::ConfirmationExpired.default_message().to_string()
            }
            AppError::RiskRejected(_) => ErrorCode::RiskRejected.default_message().to_string(),
            AppError::PermissionDenied(ref msg) => msg.clone(),
            AppError::InvalidRequest(ref msg) => msg.clone(),
            AppError::PathTraversal(_) => {
                "Invalid path: path traversal attempt detected".to_string()
            }
            AppError::FileNotFound(_) => ErrorCode::FileNotFound.default_message().to_string(),
            AppError::FileTooLarge { limit, .. } => {
                format!("File exceeds the maximum size of {} bytes", limit)
            }
            AppError::InvalidFileType(ref mime) => {
                format!("File type '{}' is not allowed", mime)
            }
            AppError::Store(_) | AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                ErrorCode::InternalError.default_message().to_string()
            }
            AppError::Structured(ref e) => e.message.clone(),
        }
    }
}
