//! Operation constructors
//!
//! Pure builders producing an `Operation` with the canonical required keys
//! and a `tool_name` derived from the type and action.

use aigate_core::models::{Operation, OperationType, RequestMap};
use serde_json::{json, Value};

pub fn build_sql(sql: &str, instance_id: i64, database: &str) -> Operation {
    let mut request = RequestMap::new();
    request.insert("sql".to_string(), json!(sql));
    request.insert("instance_id".to_string(), json!(instance_id));
    request.insert("database".to_string(), json!(database));

    Operation::new(
        OperationType::Sql,
        "SQL Query",
        request,
        OperationType::Sql.tool_name(""),
    )
}

/// Build a Kubernetes operation.
///
/// `extra_params` are merged after the required keys and overwrite them on collision.
pub fn build_k8s(
    action: &str,
    cluster: &str,
    namespace: &str,
    resource: &str,
    name: &str,
    extra_params: Option<RequestMap>,
) -> Operation {
    let mut request = RequestMap::new();
    request.insert("action".to_string(), json!(action));
    request.insert("cluster".to_string(), json!(cluster));
    request.insert("namespace".to_string(), json!(namespace));
    request.insert("resource".to_string(), json!(resource));
    request.insert("name".to_string(), json!(name));
    if let Some(extra) = extra_params {
        request.extend(extra);
    }

    Operation::new(
        OperationType::K8s,
        format!("K8s {} {}/{}", action, resource, name),
        request,
        OperationType::K8s.tool_name(action),
    )
}

pub fn build_alert_mute(action: &str, busi_group_id: i64, config: Value) -> Operation {
    let mut request = RequestMap::new();
    request.insert("action".to_string(), json!(action));
    request.insert("busi_group_id".to_string(), json!(busi_group_id));
    request.insert("config".to_string(), config);

    Operation::new(
        OperationType::AlertMute,
        format!("Alert mute {}", action),
        request,
        OperationType::AlertMute.tool_name(action),
    )
}

/// Build an MCP tool invocation; the tool name doubles as the action.
pub fn build_mcp(server: &str, tool: &str, arguments: Value) -> Operation {
    let mut request = RequestMap::new();
    request.insert("server".to_string(), json!(server));
    request.insert("tool".to_string(), json!(tool));
    request.insert("arguments".to_string(), arguments);

    Operation::new(
        OperationType::Mcp,
        format!("MCP {}/{}", server, tool),
        request,
        OperationType::Mcp.tool_name(tool),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_sql() {
        let op = build_sql("SELECT 1", 42, "prod");
        assert_eq!(op.op_type, OperationType::Sql);
        assert_eq!(op.tool_name, "dbm.sql_query");
        assert_eq!(op.request["sql"], "SELECT 1");
        assert_eq!(op.request["instance_id"], 42);
        assert_eq!(op.request["database"], "prod");
        assert!(op.validate().is_ok());
    }

    #[test]
    fn test_build_k8s_merges_extra_params_last() {
        let mut extra = RequestMap::new();
        extra.insert("replicas".to_string(), json!(0));
        extra.insert("namespace".to_string(), json!("override"));

        let op = build_k8s("scale", "prod-1", "default", "deployment", "api", Some(extra));
        assert_eq!(op.tool_name, "k8s_scale");
        assert_eq!(op.request["replicas"], 0);
        assert_eq!(op.request["namespace"], "override");
        assert_eq!(op.request["cluster"], "prod-1");
        assert!(op.validate().is_ok());
    }

    #[test]
    fn test_build_k8s_without_extra() {
        let op = build_k8s("delete", "c", "ns", "pod", "web-0", None);
        assert_eq!(op.tool_name, "k8s_delete");
        assert_eq!(op.request.len(), 5);
    }

    #[test]
    fn test_build_alert_mute() {
        let op = build_alert_mute("create", 9, json!({"duration": 3600}));
        assert_eq!(op.op_type, OperationType::AlertMute);
        assert_eq!(op.tool_name, "alert_mute_create");
        assert_eq!(op.request["config"]["duration"], 3600);
        assert!(op.validate().is_ok());
    }

    #[test]
    fn test_build_mcp() {
        let op = build_mcp("ops", "restart", json!({"service": "nginx"}));
        assert_eq!(op.tool_name, "mcp_restart");
        assert_eq!(op.request["server"], "ops");
        assert!(op.validate().is_ok());
    }
}
