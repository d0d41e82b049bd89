use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ErrorCode, StructuredError};
use crate::models::operation::{Operation, OperationType};

/// Risk classification of a pending operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    High,
    Medium,
}

/// Ephemeral, single-use authorization capsule binding a pending operation to its owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingConfirmation {
    pub confirm_id: String,
    pub session_id: String,
    pub user_id: i64,
    pub risk_level: RiskLevel,
    /// Display text shown to the user
    pub summary: String,
    pub operation: Operation,
    /// Auxiliary payload stored verbatim, never interpreted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_result: Option<Value>,
    pub created_at: i64,
    pub expires_at: i64,
}

impl PendingConfirmation {
    pub fn is_expired_at(&self, now: i64) -> bool {
        now > self.expires_at
    }

    pub fn is_owned_by(&self, user_id: i64) -> bool {
        self.user_id == user_id
    }

    /// Client-facing subset of the record
    pub fn view(&self) -> ConfirmationView {
        ConfirmationView {
            confirm_id: self.confirm_id.clone(),
            risk_level: self.risk_level,
            summary: self.summary.clone(),
            operation_type: self.operation.op_type,
            operation_name: self.operation.name.clone(),
            expires_at: self.expires_at,
        }
    }
}

/// What the client is shown when a confirmation is requested
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationView {
    pub confirm_id: String,
    pub risk_level: RiskLevel,
    pub summary: String,
    pub operation_type: OperationType,
    pub operation_name: String,
    pub expires_at: i64,
}

/// Terminal user decision on a confirmation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfirmAction {
    Approve,
    Reject,
}

impl ConfirmAction {
    /// Parse the action string posted by the client; anything else is `None`.
    pub fn parse(action: &str) -> Option<Self> {
        match action {
            "approve" => Some(ConfirmAction::Approve),
            "reject" => Some(ConfirmAction::Reject),
            _ => None,
        }
    }
}

/// Outcome of validating and consuming a confirmation.
///
/// Protocol outcomes (not found, expired, denied, rejected) are carried here
/// rather than as errors so handlers can return them in a 200 body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmationResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<StructuredError>,
}

impl ConfirmationResult {
    pub fn approved(operation: Operation) -> Self {
        Self {
            success: true,
            operation: Some(operation),
            error: None,
        }
    }

    pub fn failed(code: ErrorCode) -> Self {
        Self::failed_with(StructuredError::from_code(code))
    }

    pub fn failed_with(error: StructuredError) -> Self {
        Self {
            success: false,
            operation: None,
            error: Some(error),
        }
    }

    /// Error code of a non-success result
    pub fn error_code(&self) -> Option<ErrorCode> {
        self.error.as_ref().map(|e| e.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::operation::RequestMap;
    use serde_json::json;

    fn sample() -> PendingConfirmation {
        let mut request = RequestMap::new();
        request.insert("sql".to_string(), json!("DROP TABLE audit"));
        request.insert("instance_id".to_string(), json!(3));
        request.insert("database".to_string(), json!("ops"));
        PendingConfirmation {
            confirm_id: "confirm_abc".to_string(),
            session_id: "sess-1".to_string(),
            user_id: 7,
            risk_level: RiskLevel::High,
            summary: "Drop table audit".to_string(),
            operation: Operation::new(OperationType::Sql, "SQL", request, "dbm.sql_query"),
            check_result: Some(json!({"affected_rows_estimate": 1200})),
            created_at: 1_000,
            expires_at: 1_300,
        }
    }

    #[test]
    fn test_expiry_boundary() {
        let record = sample();
        assert!(!record.is_expired_at(1_299));
        assert!(!record.is_expired_at(1_300));
        assert!(record.is_expired_at(1_301));
    }

    #[test]
    fn test_json_round_trip_preserves_check_result() {
        let record = sample();
        let json = serde_json::to_string(&record).unwrap();
        let back: PendingConfirmation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
        assert!(json.contains("\"risk_level\":\"high\""));
    }

    #[test]
    fn test_absent_check_result_is_omitted() {
        let mut record = sample();
        record.check_result = None;
        let value = serde_json::to_value(&record).unwrap();
        assert!(value.get("check_result").is_none());
    }

    #[test]
    fn test_view_exposes_display_fields_only() {
        let view = sample().view();
        let value = serde_json::to_value(&view).unwrap();
        assert_eq!(value["confirm_id"], "confirm_abc");
        assert_eq!(value["operation_type"], "sql");
        assert!(value.get("user_id").is_none());
        assert!(value.get("check_result").is_none());
    }

    #[test]
    fn test_confirm_action_parse() {
        assert_eq!(ConfirmAction::parse("approve"), Some(ConfirmAction::Approve));
        assert_eq!(ConfirmAction::parse("reject"), Some(ConfirmAction::Reject));
        assert_eq!(ConfirmAction::parse("APPROVE"), None);
        assert_eq!(ConfirmAction::parse(""), None);
    }

    #[test]
    fn test_failed_result_carries_code() {
        let result = ConfirmationResult::failed(ErrorCode::RiskRejected);
        assert!(!result.success);
        assert_eq!(result.error_code(), Some(ErrorCode::RiskRejected));
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["error"]["code"], "RISK_REJECTED");
        assert!(value.get("operation").is_none());
    }
}
