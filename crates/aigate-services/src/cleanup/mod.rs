pub mod service;

pub use service::{CleanupReport, CleanupService};
