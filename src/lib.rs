//! Wavecast - upload-triggered media transcoding worker
//!
//! This library crate exposes the event decoding and job handler for the
//! binary and for integration testing.

pub mod event;
pub mod worker;

pub use event::{EventError, TriggerEvent};
pub use worker::{Worker, SENTINEL};
