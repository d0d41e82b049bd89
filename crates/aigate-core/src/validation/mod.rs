//! Validation modules

pub mod path;

pub use path::{clean_path, validate_file_id, validate_path, FILE_ID_PREFIX};
