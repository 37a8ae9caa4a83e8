//! The request record and the types a running callback observes.

use crate::cancellation::CancelToken;
use crate::error::{CallbackError, SchedulerError};
use crate::priority::{classify, CopyDirection, CopyReason, ProactiveCopyLocationSource};
use futures::future::BoxFuture;
use pin_project_lite::pin_project;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;

/// Monotonic identifier assigned to every request the scheduler accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(pub(crate) u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

/// Caller-supplied context threaded through to the callback, alongside the
/// content address or peer identity a real build system would attach.
#[derive(Debug, Clone, Default)]
pub struct CopyContext {
    /// Opaque correlation id a caller can use to tie a copy back to its own
    /// bookkeeping (a pip id, a build session, etc).
    pub correlation_id: Option<String>,
    /// Where a push should land, when known ahead of admission.
    pub proactive_location_source: Option<ProactiveCopyLocationSource>,
}

/// The outcome a successful copy callback reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyOutcome {
    /// The copy completed and moved the given number of bytes.
    Copied { bytes: u64 },
    /// The copy was unnecessary (content already present at the destination).
    Skipped,
}

/// Per-request timing and queue-depth information handed to the callback.
#[derive(Debug, Clone, Copy)]
pub struct Summary {
    /// How long the request waited in its priority queue before admission.
    pub queue_wait: Duration,
    /// Number of other requests still queued in the same priority class at
    /// the moment this one was admitted.
    pub priority_queue_length: usize,
}

/// Arguments passed to a copy callback once its request has been admitted.
pub struct ExecutionArgs {
    /// The context the request was submitted with.
    pub context: CopyContext,
    /// Cancellation token linking the caller's own cancellation (if any)
    /// with the scheduler's shutdown signal. The callback should treat
    /// either source the same way: stop promptly and return an error (or a
    /// best-effort partial outcome).
    pub cancellation: CancelToken,
    /// Queue timing and depth observed at admission time.
    pub summary: Summary,
    /// The priority class this request was classified into.
    pub priority_class: u32,
}

pub(crate) type BoxedCallback =
    Box<dyn FnOnce(ExecutionArgs) -> BoxFuture<'static, std::result::Result<CopyOutcome, CallbackError>> + Send>;

/// A single admitted-or-queued copy request.
pub(crate) struct Request {
    pub(crate) id: RequestId,
    pub(crate) direction: CopyDirection,
    pub(crate) reason: CopyReason,
    pub(crate) attempt: u32,
    pub(crate) context: CopyContext,
    pub(crate) callback: BoxedCallback,
    pub(crate) enqueued_at: Instant,
    pub(crate) deadline: Option<Instant>,
    pub(crate) caller_token: CancelToken,
    pub(crate) completion: oneshot::Sender<std::result::Result<CopyOutcome, SchedulerError>>,
}

impl Request {
    pub(crate) fn priority_class(&self) -> u32 {
        classify(self.direction, self.reason, self.attempt, self.context.proactive_location_source)
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("id", &self.id)
            .field("direction", &self.direction)
            .field("reason", &self.reason)
            .field("attempt", &self.attempt)
            .field("enqueued_at", &self.enqueued_at)
            .finish_non_exhaustive()
    }
}

pin_project! {
    /// A handle to a request's eventual outcome.
    ///
    /// Resolves once the request either completes (successfully or not),
    /// times out waiting for admission, or is cancelled by scheduler
    /// shutdown.
    pub struct CompletionHandle {
        #[pin]
        receiver: oneshot::Receiver<std::result::Result<CopyOutcome, SchedulerError>>,
    }
}

impl CompletionHandle {
    pub(crate) fn new(
        receiver: oneshot::Receiver<std::result::Result<CopyOutcome, SchedulerError>>,
    ) -> Self {
        Self { receiver }
    }
}

impl Future for CompletionHandle {
    type Output = std::result::Result<CopyOutcome, SchedulerError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        match this.receiver.poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            // The sender side is dropped only if the dispatcher itself is
            // torn down without resolving the request, which should never
            // happen given the shutdown sequence, but report it as shutdown
            // rather than panicking a caller awaiting this handle.
            Poll::Ready(Err(_)) => Poll::Ready(Err(SchedulerError::Shutdown)),
            Poll::Pending => Poll::Pending,
        }
    }
}
