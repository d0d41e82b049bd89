//! HTTP error response conversion
//!
//! **Preferred handler pattern:** Return `Result<impl IntoResponse, HttpAppError>`.
//! Tool invocations return `HttpToolError` so tool-layer failures render as a
//! tool-error envelope and everything else as a plain `ErrorResponse`.

use aigate_core::{
    AppError, ConfirmationResult, ErrorMetadata, LogLevel, StructuredError, ToolErrorEnvelope,
};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Standard error response format for HTTP APIs
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: StructuredError,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    /// Whether this error is recoverable (can be retried)
    pub recoverable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
}

/// Wrapper type for AppError to implement IntoResponse
/// (orphan rule: axum's trait, aigate-core's type)
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<StructuredError> for HttpAppError {
    fn from(err: StructuredError) -> Self {
        HttpAppError(AppError::Structured(err))
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError(AppError::from(err))
    }
}

fn log_error(error: &AppError) {
    let error_type = error.error_type();
    let code = error.error_code();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type = error_type, code = %code, "Error occurred");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type = error_type, code = %code, "Error occurred");
        }
        LogLevel::Error => {
            tracing::error!(error = %error, error_type = error_type, code = %code, "Error occurred");
        }
    }
}

fn is_production_env() -> bool {
    std::env::var("ENVIRONMENT")
        .or_else(|_| std::env::var("APP_ENV"))
        .map(|env| env.to_lowercase() == "production" || env.to_lowercase() == "prod")
        .unwrap_or(false)
}

fn status_of(error: &AppError) -> StatusCode {
    StatusCode::from_u16(error.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Wire shape of `error`; developer details only outside production and never for sensitive errors.
fn client_structured(error: &AppError, is_production: bool) -> StructuredError {
    let mut structured = error.to_structured();
    if is_production || error.is_sensitive() {
        structured.details = None;
    } else if structured.details.is_none() {
        structured.details = Some(error.detailed_message());
    }
    structured
}

fn error_body(error: &AppError, is_production: bool) -> ErrorResponse {
    ErrorResponse {
        success: false,
        error: client_structured(error, is_production),
        error_type: (!is_production && !error.is_sensitive())
            .then(|| error.error_type().to_string()),
        recoverable: error.is_recoverable(),
        suggested_action: error.suggested_action().map(String::from),
    }
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let app_error = &self.0;
        log_error(app_error);

        let body = error_body(app_error, is_production_env());
        (status_of(app_error), Json(body)).into_response()
    }
}

/// Failure of a tool invocation inside a session
#[derive(Debug)]
pub struct HttpToolError {
    pub trace_id: String,
    pub session_id: String,
    pub tool_name: String,
    pub error: AppError,
}

impl HttpToolError {
    pub fn new(
        trace_id: impl Into<String>,
        session_id: impl Into<String>,
        tool_name: impl Into<String>,
        error: impl Into<AppError>,
    ) -> Self {
        Self {
            trace_id: trace_id.into(),
            session_id: session_id.into(),
            tool_name: tool_name.into(),
            error: error.into(),
        }
    }
}

impl IntoResponse for HttpToolError {
    fn into_response(self) -> Response {
        log_error(&self.error);

        let is_production = is_production_env();
        let structured = client_structured(&self.error, is_production);

        match ToolErrorEnvelope::for_error(self.trace_id, self.session_id, self.tool_name, structured)
        {
            Some(envelope) => (status_of(&self.error), Json(envelope)).into_response(),
            None => {
                let body = error_body(&self.error, is_production);
                (status_of(&self.error), Json(body)).into_response()
            }
        }
    }
}

/// Confirmation outcomes are protocol results and always answer 200.
pub fn confirmation_response(result: ConfirmationResult) -> Response {
    (StatusCode::OK, Json(result)).into_response()
}
