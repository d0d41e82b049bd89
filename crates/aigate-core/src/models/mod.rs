pub mod caller;
pub mod confirmation;
pub mod file;
pub mod operation;

pub use caller::{is_privileged, role_gate_status, Caller, ADMIN_ROLE};
pub use confirmation::{
    ConfirmAction, ConfirmationResult, ConfirmationView, PendingConfirmation, RiskLevel,
};
pub use file::{DownloadToken, FileInfo};
pub use operation::{Operation, OperationType, RequestMap};
