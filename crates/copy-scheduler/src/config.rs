//! Configuration for the copy scheduler.

use crate::events::CopySchedulerEvent;
use crate::priority::CopyReason;
use copy_scheduler_core::events::{EventListeners, FnListener};
use std::time::Duration;

const REASONS: [CopyReason; 7] = [
    CopyReason::Pin,
    CopyReason::Place,
    CopyReason::CentralStorage,
    CopyReason::AsyncCopyOnPin,
    CopyReason::ProactiveBackground,
    CopyReason::ProactiveCopyOnPut,
    CopyReason::None,
];

fn reason_index(reason: CopyReason) -> usize {
    REASONS.iter().position(|&r| r == reason).unwrap()
}

/// Configuration for a [`crate::scheduler::CopyScheduler`].
#[derive(Clone)]
pub struct SchedulerConfig {
    pub(crate) cycle_interval: Duration,
    pub(crate) cycle_quota: usize,
    pub(crate) max_inflight_global: usize,
    pub(crate) reserved_per_reason: [usize; 7],
    pub(crate) weight_per_reason: [u32; 7],
    pub(crate) scheduler_timeout: Option<Duration>,
    pub(crate) name: String,
    pub(crate) event_listeners: EventListeners<CopySchedulerEvent>,
}

impl SchedulerConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> SchedulerConfigBuilder {
        SchedulerConfigBuilder::new()
    }

    pub(crate) fn reserved_for_class(&self, class: usize) -> usize {
        self.reserved_per_reason[crate::priority::class_reason_rank(class)]
    }

    pub(crate) fn weight_for_class(&self, class: usize) -> u32 {
        self.weight_per_reason[crate::priority::class_reason_rank(class)]
    }
}

/// Builder for [`SchedulerConfig`].
pub struct SchedulerConfigBuilder {
    cycle_interval: Duration,
    cycle_quota: usize,
    max_inflight_global: usize,
    reserved_per_reason: [usize; 7],
    weight_per_reason: [u32; 7],
    scheduler_timeout: Option<Duration>,
    name: String,
    event_listeners: EventListeners<CopySchedulerEvent>,
}

impl SchedulerConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            cycle_interval: Duration::from_millis(5),
            cycle_quota: 16,
            max_inflight_global: 64,
            // Pin and Place get a guaranteed floor every cycle; everything
            // else competes for the weighted residual.
            reserved_per_reason: [2, 2, 1, 0, 0, 0, 0],
            weight_per_reason: [4, 3, 2, 2, 1, 1, 1],
            scheduler_timeout: Some(Duration::from_secs(30)),
            name: "copy-scheduler".to_string(),
            event_listeners: EventListeners::new(),
        }
    }

    /// Sets how often the dispatcher runs an admission cycle on its own,
    /// independent of activity-triggered cycles.
    ///
    /// Default: 5ms
    pub fn cycle_interval(mut self, interval: Duration) -> Self {
        self.cycle_interval = interval;
        self
    }

    /// Sets the maximum number of requests admitted in a single cycle.
    ///
    /// Default: 16
    pub fn cycle_quota(mut self, quota: usize) -> Self {
        self.cycle_quota = quota;
        self
    }

    /// Sets the maximum number of copies the scheduler will run
    /// concurrently, across all priority classes.
    ///
    /// Default: 64
    pub fn max_inflight_global(mut self, max: usize) -> Self {
        self.max_inflight_global = max;
        self
    }

    /// Sets the guaranteed per-cycle admission floor for requests with the
    /// given reason, bounded by actual queued demand.
    ///
    /// Default: 2 for `Pin` and `Place`, 1 for `CentralStorage`, 0 otherwise.
    pub fn reserved_for_reason(mut self, reason: CopyReason, reserved: usize) -> Self {
        self.reserved_per_reason[reason_index(reason)] = reserved;
        self
    }

    /// Sets the weight used to distribute residual per-cycle budget to
    /// requests with the given reason, after reserved floors are honored.
    ///
    /// Default: 4/3/2/2/1/1/1 for Pin/Place/CentralStorage/AsyncCopyOnPin/
    /// ProactiveBackground/ProactiveCopyOnPut/None respectively.
    pub fn weight_for_reason(mut self, reason: CopyReason, weight: u32) -> Self {
        self.weight_per_reason[reason_index(reason)] = weight;
        self
    }

    /// Sets the maximum time a request may wait for admission before it is
    /// failed with [`crate::error::SchedulerError::Timeout`].
    ///
    /// `Some(Duration::ZERO)` means a request must be admitted in the very
    /// first cycle observed after submission or it fails immediately.
    /// `None` means requests wait for admission indefinitely.
    ///
    /// Default: 30 seconds
    pub fn scheduler_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.scheduler_timeout = timeout;
        self
    }

    /// Sets the name of this scheduler instance, used to label emitted
    /// events.
    ///
    /// Default: "copy-scheduler"
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback invoked whenever a request is submitted.
    pub fn on_request_submitted<F>(mut self, f: F) -> Self
    where
        F: Fn(&CopySchedulerEvent) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event: &CopySchedulerEvent| {
            if matches!(event, CopySchedulerEvent::RequestSubmitted { .. }) {
                f(event);
            }
        }));
        self
    }

    /// Registers a callback invoked whenever a request is admitted.
    pub fn on_request_admitted<F>(mut self, f: F) -> Self
    where
        F: Fn(&CopySchedulerEvent) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event: &CopySchedulerEvent| {
            if matches!(event, CopySchedulerEvent::RequestAdmitted { .. }) {
                f(event);
            }
        }));
        self
    }

    /// Registers a callback invoked whenever a request completes, times out,
    /// or is dropped by shutdown.
    pub fn on_request_completed<F>(mut self, f: F) -> Self
    where
        F: Fn(&CopySchedulerEvent) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event: &CopySchedulerEvent| {
            if matches!(
                event,
                CopySchedulerEvent::RequestCompleted { .. } | CopySchedulerEvent::RequestTimedOut { .. }
            ) {
                f(event);
            }
        }));
        self
    }

    /// Builds the final configuration.
    pub fn build(self) -> SchedulerConfig {
        SchedulerConfig {
            cycle_interval: self.cycle_interval,
            cycle_quota: self.cycle_quota,
            max_inflight_global: self.max_inflight_global,
            reserved_per_reason: self.reserved_per_reason,
            weight_per_reason: self.weight_per_reason,
            scheduler_timeout: self.scheduler_timeout,
            name: self.name,
            event_listeners: self.event_listeners,
        }
    }
}

impl Default for SchedulerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
