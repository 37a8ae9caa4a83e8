//! Core infrastructure for the copy scheduler.
//!
//! This crate provides shared functionality used by the scheduler crate and
//! by callers that want to observe it:
//! - Event system for observability (admission, completion, shutdown events)

pub mod events;

pub use events::{EventListener, SchedulerEvent};
