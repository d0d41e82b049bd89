use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use crate::error::AppError;

/// Heterogeneous request payload. Values stay unschematized; executors know their shapes.
pub type RequestMap = Map<String, Value>;

pub const SQL_TOOL_NAME: &str = "dbm.sql_query";

/// Kind of side-effecting operation awaiting confirmation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    Sql,
    K8s,
    AlertMute,
    Mcp,
}

impl OperationType {
    /// Keys every request of this type must carry
    pub fn required_keys(&self) -> &'static [&'static str] {
        match self {
            OperationType::Sql => &["sql", "instance_id", "database"],
            OperationType::K8s => &["action", "cluster", "namespace", "resource", "name"],
            OperationType::AlertMute => &["action", "busi_group_id", "config"],
            OperationType::Mcp => &["server", "tool", "arguments"],
        }
    }

    /// Downstream routing token for this type and action.
    ///
    /// SQL ignores the action. MCP uses the tool name as the action.
    pub fn tool_name(&self, action: &str) -> String {
        match self {
            OperationType::Sql => SQL_TOOL_NAME.to_string(),
            OperationType::K8s => format!("k8s_{}", action),
            OperationType::AlertMute => format!("alert_mute_{}", action),
            OperationType::Mcp => format!("mcp_{}", action),
        }
    }
}

impl Display for OperationType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            OperationType::Sql => write!(f, "sql"),
            OperationType::K8s => write!(f, "k8s"),
            OperationType::AlertMute => write!(f, "alert_mute"),
            OperationType::Mcp => write!(f, "mcp"),
        }
    }
}

impl FromStr for OperationType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sql" => Ok(OperationType::Sql),
            "k8s" => Ok(OperationType::K8s),
            "alert_mute" => Ok(OperationType::AlertMute),
            "mcp" => Ok(OperationType::Mcp),
            _ => Err(anyhow::anyhow!("Invalid operation type: {}", s)),
        }
    }
}

/// Canonicalized description of a side-effecting action to run downstream.
///
/// Immutable once embedded in a confirmation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    #[serde(rename = "type")]
    pub op_type: OperationType,
    /// Display name
    pub name: String,
    pub request: RequestMap,
    pub tool_name: String,
}

impl Operation {
    pub fn new(
        op_type: OperationType,
        name: impl Into<String>,
        request: RequestMap,
        tool_name: impl Into<String>,
    ) -> Self {
        Self {
            op_type,
            name: name.into(),
            request,
            tool_name: tool_name.into(),
        }
    }

    /// Check that the request carries every key required for its type.
    pub fn validate(&self) -> Result<(), AppError> {
        let missing: Vec<&str> = self
            .op_type
            .required_keys()
            .iter()
            .copied()
            .filter(|key| !self.request.contains_key(*key))
            .collect();

        if !missing.is_empty() {
            return Err(AppError::InvalidRequest(format!(
                "{} operation is missing required keys: {}",
                self.op_type,
                missing.join(", ")
            )));
        }

        if self.tool_name.is_empty() {
            return Err(AppError::InvalidRequest(
                "operation tool_name must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// String value of a request key, if present and a string
    pub fn request_str(&self, key: &str) -> Option<&str> {
        self.request.get(key).and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_operation_type_wire_names() {
        assert_eq!(serde_json::to_string(&OperationType::K8s).unwrap(), "\"k8s\"");
        assert_eq!(
            serde_json::to_string(&OperationType::AlertMute).unwrap(),
            "\"alert_mute\""
        );
        assert_eq!("MCP".parse::<OperationType>().unwrap(), OperationType::Mcp);
        assert!("shell".parse::<OperationType>().is_err());
    }

    #[test]
    fn test_tool_name_derivation() {
        assert_eq!(OperationType::Sql.tool_name("anything"), "dbm.sql_query");
        assert_eq!(OperationType::K8s.tool_name("delete"), "k8s_delete");
        assert_eq!(OperationType::AlertMute.tool_name("create"), "alert_mute_create");
        assert_eq!(OperationType::Mcp.tool_name("restart"), "mcp_restart");
    }

    #[test]
    fn test_validate_reports_missing_keys() {
        let mut request = RequestMap::new();
        request.insert("sql".to_string(), json!("DELETE FROM t"));
        let op = Operation::new(OperationType::Sql, "SQL", request, SQL_TOOL_NAME);

        let err = op.validate().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("instance_id"));
        assert!(msg.contains("database"));
    }

    #[test]
    fn test_serialized_shape_uses_type_key() {
        let mut request = RequestMap::new();
        request.insert("sql".to_string(), json!("SELECT 1"));
        request.insert("instance_id".to_string(), json!(42));
        request.insert("database".to_string(), json!("prod"));
        let op = Operation::new(OperationType::Sql, "SQL", request, SQL_TOOL_NAME);
        assert!(op.validate().is_ok());

        let value = serde_json::to_value(&op).unwrap();
        assert_eq!(value["type"], "sql");
        assert_eq!(value["tool_name"], "dbm.sql_query");
        assert_eq!(value["request"]["instance_id"], 42);
        assert_eq!(op.request_str("database"), Some("prod"));
    }
}
