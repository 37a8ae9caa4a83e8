//! A prioritized admission-and-dispatch scheduler for outbound content
//! copies between cache peers.
//!
//! The scheduler accepts copy requests ([`schedule_outbound_pull`](CopyScheduler::schedule_outbound_pull)
//! / [`schedule_outbound_push`](CopyScheduler::schedule_outbound_push)),
//! classifies each into a priority class from its [`CopyReason`] and retry
//! attempt, holds it in a per-class FIFO queue, and admits a bounded number
//! per cycle according to a reserved-floor-plus-weighted-residual quota. A
//! single cooperative dispatcher loop is the sole mutator of queue and
//! in-flight state; callbacks run off of a pluggable [`CopyExecutor`] so a
//! slow or hung copy can never block admission of the next one.
//!
//! # Example
//!
//! ```rust,no_run
//! use copy_scheduler::{
//!     CopyContext, CopyOutcome, CopyReason, CopyScheduler, SchedulerConfig, SchedulerContext,
//! };
//! use copy_scheduler::cancellation::CancelToken;
//! use copy_scheduler_executor::CurrentRuntime;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let config = SchedulerConfig::builder().name("example").build();
//! let scheduler = CopyScheduler::new(config, CurrentRuntime::new());
//! scheduler.startup(SchedulerContext::default()).await.unwrap();
//!
//! let handle = scheduler.schedule_outbound_pull(
//!     CopyReason::Place,
//!     0,
//!     CopyContext::default(),
//!     CancelToken::new(),
//!     |_args| async move { Ok(CopyOutcome::Copied { bytes: 1024 }) },
//! );
//!
//! let outcome = handle.await.unwrap();
//! assert_eq!(outcome, CopyOutcome::Copied { bytes: 1024 });
//!
//! scheduler.shutdown(SchedulerContext::default()).await.unwrap();
//! # }
//! ```

mod admission;
pub mod cancellation;
pub mod config;
mod dispatcher;
pub mod error;
pub mod events;
mod lifecycle;
pub mod priority;
mod queue;
pub mod request;
pub mod scheduler;

pub use config::{SchedulerConfig, SchedulerConfigBuilder};
pub use dispatcher::CycleReport;
pub use error::{CallbackError, Result, SchedulerError};
pub use events::CopySchedulerEvent;
pub use priority::{classify, CopyDirection, CopyReason, ProactiveCopyLocationSource, PRIORITY_CLASS_COUNT};
pub use request::{CompletionHandle, CopyContext, CopyOutcome, ExecutionArgs, Summary};
pub use scheduler::{CopyScheduler, SchedulerContext};
