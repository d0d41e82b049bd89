//! AI Gate Storage Library
//!
//! This crate defines the shared ephemeral store contract consumed by the
//! gating core, an in-process implementation of it, and the key layout.
//!
//! # Key layout
//!
//! All keys live under a configurable prefix (default `ai_assistant:`):
//!
//! - `<prefix>confirm:<confirm_id>` - pending confirmation JSON
//! - `<prefix>file:<file_id>:info` - uploaded file metadata JSON
//! - `<prefix>download_token:<token>` - download token JSON
//!
//! Key generation is centralized in the `keys` module so every consumer stays consistent.

pub mod keys;
#[cfg(feature = "store-memory")]
pub mod memory;
pub mod traits;

// Re-export commonly used types
pub use keys::KeyLayout;
#[cfg(feature = "store-memory")]
pub use memory::MemoryStore;
pub use traits::{store_ttl, EphemeralStore, StoreError, StoreResult, EXPIRY_GRACE};
