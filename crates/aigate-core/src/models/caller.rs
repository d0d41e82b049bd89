use serde::{Deserialize, Serialize};

/// Role that admits a caller to knowledge management endpoints
pub const ADMIN_ROLE: &str = "Admin";

/// Authenticated identity of the caller, resolved upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub user_id: i64,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl Caller {
    pub fn new(user_id: i64, roles: Vec<String>) -> Self {
        Self {
            user_id,
            username: String::new(),
            roles,
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// A caller is privileged iff present and holding the admin role.
pub fn is_privileged(caller: Option<&Caller>) -> bool {
    caller.is_some_and(|c| c.has_role(ADMIN_ROLE))
}

/// HTTP status the role gate yields: 200 when admitted, 403 otherwise.
pub fn role_gate_status(caller: Option<&Caller>) -> u16 {
    if is_privileged(caller) {
        200
    } else {
        403
    }
}
