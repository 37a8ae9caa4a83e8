//! Error types for the copy scheduler.

/// The error type a copy callback resolves with when it fails. Boxed so the
/// scheduler doesn't need a generic parameter per callback error type.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors the scheduler can report back through a [`crate::request::CompletionHandle`].
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// The request was not admitted before its configured timeout elapsed.
    ///
    /// This only ever covers time spent waiting for admission. A callback
    /// that is already running is never interrupted on the basis of this
    /// timeout alone.
    #[error("copy request timed out waiting for admission")]
    Timeout,
    /// The scheduler was shutting down or has already shut down.
    #[error("scheduler is shutting down or has shut down")]
    Shutdown,
    /// The copy callback itself returned an error or panicked.
    #[error("copy callback failed: {0}")]
    CallbackFailed(CallbackError),
}

/// Result type for scheduler operations.
pub type Result<T> = std::result::Result<T, SchedulerError>;
