//! Public entry point: [`CopyScheduler`].

use crate::cancellation::CancelToken;
use crate::config::SchedulerConfig;
use crate::dispatcher::{ControlMsg, CycleReport, Dispatcher};
use crate::error::{CallbackError, SchedulerError};
use crate::lifecycle::{Lifecycle, SchedulerState};
use crate::priority::{CopyDirection, CopyReason};
use crate::request::{CompletionHandle, CopyContext, CopyOutcome, ExecutionArgs, Request, RequestId};
use copy_scheduler_executor::CopyExecutor;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};

/// Caller-supplied context for the lifecycle calls. Carried through for
/// correlation with a build system's own logging; the scheduler does not
/// interpret its contents.
#[derive(Debug, Clone, Default)]
pub struct SchedulerContext {
    /// Opaque correlation id for this startup/shutdown call.
    pub correlation_id: Option<String>,
}

/// A prioritized admission-and-dispatch scheduler for outbound content
/// copies.
///
/// A `CopyScheduler` is constructed once with a [`SchedulerConfig`] and an
/// [`CopyExecutor`], started with [`CopyScheduler::startup`], used via
/// [`CopyScheduler::schedule_outbound_pull`] / [`CopyScheduler::schedule_outbound_push`],
/// and torn down with [`CopyScheduler::shutdown`]. It cannot be restarted
/// after shutdown.
pub struct CopyScheduler<E: CopyExecutor> {
    scheduler_timeout: Option<Duration>,
    pending: Mutex<Option<(SchedulerConfig, E)>>,
    lifecycle: Arc<Lifecycle>,
    shutdown_token: CancelToken,
    control_tx: OnceLock<mpsc::UnboundedSender<ControlMsg>>,
    dispatcher_handle: Mutex<Option<tokio::task::JoinHandle<()>>>,
    next_id: AtomicU64,
}

impl<E: CopyExecutor> CopyScheduler<E> {
    /// Creates a new scheduler. Call [`CopyScheduler::startup`] before
    /// submitting any copies.
    pub fn new(config: SchedulerConfig, executor: E) -> Self {
        Self {
            scheduler_timeout: config.scheduler_timeout,
            pending: Mutex::new(Some((config, executor))),
            lifecycle: Arc::new(Lifecycle::new()),
            shutdown_token: CancelToken::new(),
            control_tx: OnceLock::new(),
            dispatcher_handle: Mutex::new(None),
            next_id: AtomicU64::new(0),
        }
    }

    /// Starts the dispatcher loop. Idempotent: calling this more than once,
    /// or after shutdown, is a no-op.
    pub async fn startup(&self, _context: SchedulerContext) -> crate::error::Result<()> {
        if !self.lifecycle.try_start() {
            return Ok(());
        }

        let (config, executor) = self
            .pending
            .lock()
            .unwrap()
            .take()
            .expect("config/executor are only taken once, guarded by try_start");

        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let _ = self.control_tx.set(control_tx.clone());

        let dispatcher = Dispatcher::new(
            config,
            control_rx,
            control_tx,
            executor,
            self.shutdown_token.clone(),
            Arc::clone(&self.lifecycle),
        );
        let handle = tokio::spawn(dispatcher.run());
        *self.dispatcher_handle.lock().unwrap() = Some(handle);
        Ok(())
    }

    /// Runs the shutdown sequence: stop admitting new cycles, fail every
    /// queued request with [`SchedulerError::Shutdown`], fire the shared
    /// shutdown token, and wait for in-flight callbacks to drain. Idempotent:
    /// concurrent or repeated calls all observe the same completion.
    pub async fn shutdown(&self, _context: SchedulerContext) -> crate::error::Result<()> {
        match self.lifecycle.state() {
            SchedulerState::NotStarted | SchedulerState::Stopped => return Ok(()),
            _ => {}
        }

        if self.lifecycle.try_begin_shutdown() {
            let Some(control_tx) = self.control_tx.get() else {
                self.lifecycle.finish_shutdown();
                return Ok(());
            };
            let (ack_tx, ack_rx) = oneshot::channel();
            if control_tx.send(ControlMsg::Shutdown { ack: ack_tx }).is_ok() {
                let _ = ack_rx.await;
            } else {
                self.lifecycle.finish_shutdown();
            }
        } else {
            self.lifecycle.wait_for_stopped().await;
        }
        Ok(())
    }

    /// Schedules an outbound pull: content is fetched from a remote peer
    /// into the local cache.
    ///
    /// `cancellation` is the caller's own cancellation token, if any; it is
    /// linked with the scheduler's shutdown signal so the callback observes
    /// either source through a single token. Returns immediately; the
    /// returned [`CompletionHandle`] resolves once the request is admitted
    /// and run, times out waiting for admission, or is cancelled by
    /// shutdown.
    pub fn schedule_outbound_pull<F, Fut>(
        &self,
        reason: CopyReason,
        attempt: u32,
        context: CopyContext,
        cancellation: CancelToken,
        callback: F,
    ) -> CompletionHandle
    where
        F: FnOnce(ExecutionArgs) -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<CopyOutcome, CallbackError>> + Send + 'static,
    {
        self.submit(
            CopyDirection::OutboundPull,
            reason,
            attempt,
            context,
            cancellation,
            callback,
        )
    }

    /// Schedules an outbound push: content is sent from the local cache to
    /// a remote peer. See [`CopyScheduler::schedule_outbound_pull`] for the
    /// admission and cancellation semantics shared by both directions.
    pub fn schedule_outbound_push<F, Fut>(
        &self,
        reason: CopyReason,
        attempt: u32,
        context: CopyContext,
        cancellation: CancelToken,
        callback: F,
    ) -> CompletionHandle
    where
        F: FnOnce(ExecutionArgs) -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<CopyOutcome, CallbackError>> + Send + 'static,
    {
        self.submit(
            CopyDirection::OutboundPush,
            reason,
            attempt,
            context,
            cancellation,
            callback,
        )
    }

    fn submit<F, Fut>(
        &self,
        direction: CopyDirection,
        reason: CopyReason,
        attempt: u32,
        context: CopyContext,
        caller_token: CancelToken,
        callback: F,
    ) -> CompletionHandle
    where
        F: FnOnce(ExecutionArgs) -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<CopyOutcome, CallbackError>> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let handle = CompletionHandle::new(rx);

        if self.lifecycle.state() != SchedulerState::Running {
            let _ = tx.send(Err(SchedulerError::Shutdown));
            return handle;
        }
        let Some(control_tx) = self.control_tx.get() else {
            let _ = tx.send(Err(SchedulerError::Shutdown));
            return handle;
        };

        let id = RequestId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let now = Instant::now();
        let deadline = self.scheduler_timeout.map(|timeout| now + timeout);
        let request = Request {
            id,
            direction,
            reason,
            attempt,
            context,
            callback: Box::new(
                move |args: ExecutionArgs| -> futures::future::BoxFuture<'static, std::result::Result<CopyOutcome, CallbackError>> {
                    Box::pin(callback(args))
                },
            ),
            enqueued_at: now,
            deadline,
            caller_token,
            completion: tx,
        };

        if let Err(mpsc::error::SendError(ControlMsg::Submit(request))) =
            control_tx.send(ControlMsg::Submit(request))
        {
            let _ = request.completion.send(Err(SchedulerError::Shutdown));
        }

        handle
    }

    /// Runs exactly one admission cycle with the given budget and reports
    /// what it did, bypassing the normal activity-triggered and
    /// interval-triggered cycle paths. Test-only: production callers should
    /// rely on the dispatcher's own cycle cadence.
    #[cfg(feature = "test-util")]
    pub async fn run_one_cycle_with_budget(&self, budget: usize) -> crate::error::Result<CycleReport> {
        let control_tx = self.control_tx.get().ok_or(SchedulerError::Shutdown)?;
        let (ack_tx, ack_rx) = oneshot::channel();
        control_tx
            .send(ControlMsg::RunCycle {
                budget: Some(budget),
                ack: ack_tx,
            })
            .map_err(|_| SchedulerError::Shutdown)?;
        ack_rx.await.map_err(|_| SchedulerError::Shutdown)
    }
}
