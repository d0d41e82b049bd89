//! Shared key generation for the ephemeral store.

use aigate_core::config::DEFAULT_REDIS_PREFIX;

/// Key namespaces under a common prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyLayout {
    prefix: String,
}

impl KeyLayout {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn confirmation(&self, confirm_id: &str) -> String {
        format!("{}confirm:{}", self.prefix, confirm_id)
    }

    pub fn file_info(&self, file_id: &str) -> String {
        format!("{}file:{}:info", self.prefix, file_id)
    }

    pub fn download_token(&self, token: &str) -> String {
        format!("{}download_token:{}", self.prefix, token)
    }
}

impl Default for KeyLayout {
    fn default() -> Self {
        Self::new(DEFAULT_REDIS_PREFIX)
    }
}
