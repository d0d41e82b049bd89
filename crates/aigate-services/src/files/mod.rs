pub mod manager;

pub use manager::{normalize_mime_type, ByteStream, FileManager};
