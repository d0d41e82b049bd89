pub mod manager;
pub mod operations;

pub use manager::{ConfirmationManager, AUDIT_TARGET};
pub use operations::{build_alert_mute, build_k8s, build_mcp, build_sql};
