//! AI Gate Infrastructure Layer
//!
//! HTTP-facing glue for the gating core: the role gate middleware guarding
//! knowledge management endpoints, response rendering for `AppError` and
//! tool-error envelopes, and tracing initialization.

pub mod error;
pub mod middleware;
pub mod telemetry;

pub use error::{confirmation_response, ErrorResponse, HttpAppError, HttpToolError};
pub use middleware::{gate_knowledge_routes, role_gate_middleware, KNOWLEDGE_ADMIN_ROUTES};
pub use telemetry::init_telemetry;
