//! Spawn-strategy abstraction for copy scheduler callbacks.
//!
//! The dispatcher never awaits a caller-supplied copy callback directly; it
//! hands the callback's future to a [`CopyExecutor`] and returns to its next
//! cycle. This crate is that abstraction, decoupled from any particular
//! runtime topology so a scheduler can be pointed at a dedicated runtime or
//! thread pool without touching the dispatch loop.
//!
//! # Example
//!
//! ```rust
//! use copy_scheduler_executor::{CopyExecutor, CurrentRuntime};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let executor = CurrentRuntime::new();
//! let handle = executor.spawn(async { 1 + 1 });
//! assert_eq!(handle.await.unwrap(), 2);
//! # }
//! ```

mod executor;

pub use executor::{BlockingExecutor, CopyExecutor, CurrentRuntime};
