//! # wc-pipeline
//!
//! Per-job orchestration for the wavecast worker.
//!
//! This crate provides:
//!
//! - **[`Job`]** / **[`JobState`]** -- the unit of work and its lifecycle.
//! - **[`JobScope`]** -- owns the working directory, downloaded input, and
//!   source object; released exactly once.
//! - **[`NotificationThrottle`]** and **[`Notifier`]** -- rate-limited,
//!   fire-and-forget job notifications.
//! - **[`Stage`]** trait and the built-in [`stages`].
//! - **[`create_stages`]** -- the standard stage list for a config.
//! - **[`PipelineRunner`]** -- sequential execution with per-stage timeout,
//!   abort notification, and unconditional teardown.

pub mod context;
pub mod factory;
pub mod job;
pub mod lifecycle;
pub mod notifier;
pub mod runner;
pub mod stage;
pub mod stages;
pub mod throttle;

pub use context::{StageContext, WorkerContext};
pub use factory::create_stages;
pub use job::{Job, JobState};
pub use lifecycle::{JobScope, TeardownReport};
pub use notifier::Notifier;
pub use runner::{JobReport, Outcome, PipelineRunner};
pub use stage::Stage;
pub use throttle::NotificationThrottle;
