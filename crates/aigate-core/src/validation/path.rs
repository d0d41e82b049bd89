//! Path validation
//!
//! Every client-supplied path goes through [`validate_path`] before it touches
//! the filesystem. Server-minted file ids go through [`validate_file_id`]
//! before being joined onto the storage directory.

use crate::error::AppError;
use uuid::Uuid;

pub const FILE_ID_PREFIX: &str = "file_";

/// Reject paths that could escape a base directory.
///
/// Rejected: any `..` sequence, absolute paths (`/x`, `\x`), drive-letter
/// prefixes (`C:`), and paths whose cleaned form starts with `..`.
pub fn validate_path(path: &str) -> Result<(), AppError> {
    if path.contains("..") {
        return Err(traversal(path));
    }

    if path.starts_with('/') || path.starts_with('\\') || std::path::Path::new(path).is_absolute()
    {
        return Err(traversal(path));
    }

    if has_drive_prefix(path) {
        return Err(traversal(path));
    }

    let cleaned = clean_path(path);
    if cleaned == ".." || cleaned.starts_with("../") {
        return Err(traversal(path));
    }

    Ok(())
}

/// Lexically normalize `path`: collapse separators, drop `.`, resolve `..`
/// against preceding components. Leading `..` components are kept.
pub fn clean_path(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for component in path.split(['/', '\\']) {
        match component {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ => parts.push(".."),
            },
            other => parts.push(other),
        }
    }

    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}

/// Check that `file_id` has the server-minted `file_<uuid>` shape.
pub fn validate_file_id(file_id: &str) -> Result<(), AppError> {
    let valid = file_id
        .strip_prefix(FILE_ID_PREFIX)
        .filter(|rest| rest.len() == 36)
        .is_some_and(|rest| Uuid::parse_str(rest).is_ok());

    if valid {
        Ok(())
    } else {
        Err(AppError::InvalidRequest(format!("Invalid file id: {}", file_id)))
    }
}

fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

fn traversal(path: &str) -> AppError {
    AppError::PathTraversal(path.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorCode, ErrorMetadata};

    #[test]
    fn test_rejects_parent_escapes() {
        for path in ["../../etc/passwd", "..", "sub/../../x", "a/..", "..\\windows"] {
            let err = validate_path(path).unwrap_err();
            assert_eq!(err.error_code(), ErrorCode::InvalidRequest, "{}", path);
            assert!(err.client_message().contains("traversal"));
        }
    }

    #[test]
    fn test_rejects_absolute_paths() {
        assert!(validate_path("/etc/passwd").is_err());
        assert!(validate_path("\\\\server\\share").is_err());
    }

    #[test]
    fn test_rejects_drive_letters() {
        assert!(validate_path("C:/x").is_err());
        assert!(validate_path("c:x").is_err());
        assert!(validate_path("Z:\\temp\\a.txt").is_err());
    }

    #[test]
    fn test_accepts_relative_paths() {
        assert!(validate_path("sub/a.txt").is_ok());
        assert!(validate_path("a.txt").is_ok());
        assert!(validate_path("./sub/./b.csv").is_ok());
    }

    #[test]
    fn test_clean_path() {
        assert_eq!(clean_path("a//b/./c"), "a/b/c");
        assert_eq!(clean_path("a/b/../c"), "a/c");
        assert_eq!(clean_path("../a"), "../a");
        assert_eq!(clean_path("a/../../b"), "../b");
        assert_eq!(clean_path(""), ".");
    }

    #[test]
    fn test_validate_file_id() {
        let id = format!("file_{}", Uuid::new_v4());
        assert!(validate_file_id(&id).is_ok());
        assert!(validate_file_id("file_../../etc/passwd").is_err());
        assert!(validate_file_id("file_").is_err());
        assert!(validate_file_id(&Uuid::new_v4().to_string()).is_err());
        assert!(validate_file_id(&format!("{}.tmp", id)).is_err());
    }
}
