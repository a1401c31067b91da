//! wc-core: shared error type, worker configuration, and notification
//! messages.
//!
//! This crate is the foundational dependency for all other wc-* crates.

pub mod config;
pub mod error;
pub mod events;

// Re-export the most commonly used items at the crate root.
pub use config::WorkerConfig;
pub use error::{Error, FailureKind, Result};
pub use events::ProgressEvent;
