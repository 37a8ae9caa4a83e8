//! The cooperative dispatcher loop.
//!
//! The dispatcher is the sole mutator of queue and in-flight state. Every
//! other actor — submitters, completing callbacks, the public shutdown call
//! — communicates with it exclusively through [`ControlMsg`] on an unbounded
//! channel, so there is never a second writer racing the dispatcher's own
//! bookkeeping.

use crate::admission::plan_admission;
use crate::cancellation::{CancelReason, CancelToken};
use crate::config::SchedulerConfig;
use crate::error::SchedulerError;
use crate::events::CopySchedulerEvent;
use crate::priority::PRIORITY_CLASS_COUNT;
use crate::queue::PriorityQueues;
use crate::request::{ExecutionArgs, Request, Summary};
use copy_scheduler_core::events::EventListeners;
use copy_scheduler_executor::CopyExecutor;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};

use crate::lifecycle::Lifecycle;

/// Messages the dispatcher reacts to. The dispatcher never initiates work on
/// its own besides periodic cycles; everything else flows in through here.
pub(crate) enum ControlMsg {
    Submit(Request),
    Completed { class: usize },
    RunCycle {
        budget: Option<usize>,
        ack: oneshot::Sender<CycleReport>,
    },
    Shutdown {
        ack: oneshot::Sender<()>,
    },
}

/// Summary of a single admission cycle, returned to test callers that drive
/// cycles explicitly.
#[derive(Debug, Clone, Copy, Default)]
pub struct CycleReport {
    /// Number of requests admitted this cycle.
    pub admitted: usize,
    /// Number of queued requests that expired this cycle.
    pub expired: usize,
}

pub(crate) struct Dispatcher<E> {
    queues: PriorityQueues,
    inflight: [usize; PRIORITY_CLASS_COUNT],
    total_inflight: usize,
    config: SchedulerConfig,
    control_rx: mpsc::UnboundedReceiver<ControlMsg>,
    control_tx: mpsc::UnboundedSender<ControlMsg>,
    events: EventListeners<CopySchedulerEvent>,
    executor: E,
    shutdown_token: CancelToken,
    lifecycle: Arc<Lifecycle>,
}

impl<E: CopyExecutor> Dispatcher<E> {
    pub(crate) fn new(
        config: SchedulerConfig,
        control_rx: mpsc::UnboundedReceiver<ControlMsg>,
        control_tx: mpsc::UnboundedSender<ControlMsg>,
        executor: E,
        shutdown_token: CancelToken,
        lifecycle: Arc<Lifecycle>,
    ) -> Self {
        let events = config.event_listeners.clone();
        Self {
            queues: PriorityQueues::new(),
            inflight: [0; PRIORITY_CLASS_COUNT],
            total_inflight: 0,
            config,
            control_rx,
            control_tx,
            events,
            executor,
            shutdown_token,
            lifecycle,
        }
    }

    pub(crate) async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.config.cycle_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick fires immediately; consume it so startup doesn't
        // run two cycles back to back.
        ticker.tick().await;

        loop {
            tokio::select! {
                biased;
                msg = self.control_rx.recv() => {
                    match msg {
                        Some(ControlMsg::Shutdown { ack }) => {
                            self.handle_shutdown().await;
                            let _ = ack.send(());
                            return;
                        }
                        Some(ControlMsg::Submit(request)) => {
                            self.handle_submit(request);
                            self.run_cycle(None);
                        }
                        Some(ControlMsg::Completed { class }) => {
                            self.handle_completed(class);
                            self.run_cycle(None);
                        }
                        Some(ControlMsg::RunCycle { budget, ack }) => {
                            let report = self.run_cycle(budget);
                            let _ = ack.send(report);
                        }
                        None => return,
                    }
                }
                _ = ticker.tick() => {
                    self.run_cycle(None);
                }
            }
        }
    }

    fn handle_submit(&mut self, request: Request) {
        self.events.emit(&CopySchedulerEvent::RequestSubmitted {
            pattern_name: self.config.name.clone(),
            timestamp: Instant::now(),
            direction: request.direction,
            reason: request.reason,
            priority_class: request.priority_class(),
        });
        self.queues.push(request);
    }

    fn handle_completed(&mut self, class: usize) {
        self.inflight[class] = self.inflight[class].saturating_sub(1);
        self.total_inflight = self.total_inflight.saturating_sub(1);
    }

    fn run_cycle(&mut self, explicit_budget: Option<usize>) -> CycleReport {
        let quota = explicit_budget.unwrap_or(self.config.cycle_quota);
        let headroom = self.config.max_inflight_global.saturating_sub(self.total_inflight);
        let budget = quota.min(headroom);

        let queue_lengths = self.queues.queue_lengths();
        let reserved: Vec<usize> = (0..PRIORITY_CLASS_COUNT)
            .map(|c| self.config.reserved_for_class(c))
            .collect();
        let weights: Vec<u32> = (0..PRIORITY_CLASS_COUNT)
            .map(|c| self.config.weight_for_class(c))
            .collect();
        let plan = plan_admission(&queue_lengths, &reserved, &weights, budget);

        let mut admitted = 0;
        for class in 0..PRIORITY_CLASS_COUNT {
            for _ in 0..plan[class] {
                if let Some(request) = self.queues.pop_front(class) {
                    self.dispatch(request, class);
                    admitted += 1;
                }
            }
        }

        let expired = self.expire_overdue();

        self.events.emit(&CopySchedulerEvent::CycleCompleted {
            pattern_name: self.config.name.clone(),
            timestamp: Instant::now(),
            admitted,
            expired,
        });

        CycleReport { admitted, expired }
    }

    fn expire_overdue(&mut self) -> usize {
        let now = Instant::now();
        let mut expired_count = 0;
        let classes: Vec<usize> = self.queues.nonempty_classes().collect();
        for class in classes {
            let removed = self.queues.retain_class(class, |req| match req.deadline {
                Some(deadline) => deadline > now,
                None => true,
            });
            for request in removed {
                expired_count += 1;
                let queue_wait = now.saturating_duration_since(request.enqueued_at);
                self.events.emit(&CopySchedulerEvent::RequestTimedOut {
                    pattern_name: self.config.name.clone(),
                    timestamp: now,
                    priority_class: class as u32,
                    queue_wait,
                });
                let _ = request.completion.send(Err(SchedulerError::Timeout));
            }
        }
        expired_count
    }

    fn dispatch(&mut self, request: Request, class: usize) {
        let now = Instant::now();
        let queue_wait = now.saturating_duration_since(request.enqueued_at);
        self.inflight[class] += 1;
        self.total_inflight += 1;

        let cancellation = CancelToken::linked(&[&request.caller_token, &self.shutdown_token]);
        let args = ExecutionArgs {
            context: request.context,
            cancellation,
            summary: Summary {
                queue_wait,
                priority_queue_length: self.queues.len_class(class),
            },
            priority_class: class as u32,
        };

        self.events.emit(&CopySchedulerEvent::RequestAdmitted {
            pattern_name: self.config.name.clone(),
            timestamp: now,
            priority_class: class as u32,
            queue_wait,
        });

        let future = (request.callback)(args);
        let handle = self.executor.spawn(future);
        let completion = request.completion;
        let control_tx = self.control_tx.clone();
        let events = self.events.clone();
        let pattern_name = self.config.name.clone();

        // This supervising task is deliberately not routed through the
        // configurable executor: it only awaits a join handle and reports
        // back, so a hung or panicking callback can never block the
        // dispatcher loop regardless of which executor is configured.
        tokio::spawn(async move {
            let outcome = match handle.await {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(callback_err)) => Err(SchedulerError::CallbackFailed(callback_err)),
                Err(join_err) => Err(SchedulerError::CallbackFailed(Box::new(join_err))),
            };
            let succeeded = outcome.is_ok();
            events.emit(&CopySchedulerEvent::RequestCompleted {
                pattern_name,
                timestamp: Instant::now(),
                priority_class: class as u32,
                succeeded,
                run_duration: now.elapsed(),
            });
            let _ = completion.send(outcome);
            let _ = control_tx.send(ControlMsg::Completed { class });
        });
    }

    async fn handle_shutdown(&mut self) {
        let now = Instant::now();
        let queued = self.queues.drain_all();
        let queued_failed = queued.len();
        for request in queued {
            let _ = request.completion.send(Err(SchedulerError::Shutdown));
        }

        self.events.emit(&CopySchedulerEvent::ShutdownStarted {
            pattern_name: self.config.name.clone(),
            timestamp: now,
            queued_failed,
        });

        self.shutdown_token.cancel(CancelReason::Shutdown);

        while self.total_inflight > 0 {
            match self.control_rx.recv().await {
                Some(ControlMsg::Completed { class }) => self.handle_completed(class),
                Some(ControlMsg::Submit(request)) => {
                    let _ = request.completion.send(Err(SchedulerError::Shutdown));
                }
                Some(ControlMsg::RunCycle { ack, .. }) => {
                    let _ = ack.send(CycleReport::default());
                }
                Some(ControlMsg::Shutdown { ack }) => {
                    let _ = ack.send(());
                }
                None => break,
            }
        }

        self.lifecycle.finish_shutdown();

        self.events.emit(&CopySchedulerEvent::ShutdownCompleted {
            pattern_name: self.config.name.clone(),
            timestamp: Instant::now(),
        });
    }
}
