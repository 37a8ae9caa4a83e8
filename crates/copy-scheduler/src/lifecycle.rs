//! Scheduler lifecycle state machine.
//!
//! `NotStarted -> Running -> ShuttingDown -> Stopped`, encoded as a single
//! atomic so every caller observes a consistent state without locking.

use std::sync::atomic::{AtomicU8, Ordering};
use tokio::sync::Notify;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum SchedulerState {
    NotStarted = 0,
    Running = 1,
    ShuttingDown = 2,
    Stopped = 3,
}

impl SchedulerState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::NotStarted,
            1 => Self::Running,
            2 => Self::ShuttingDown,
            _ => Self::Stopped,
        }
    }
}

pub(crate) struct Lifecycle {
    state: AtomicU8,
    stopped: Notify,
}

impl Lifecycle {
    pub(crate) fn new() -> Self {
        Self {
            state: AtomicU8::new(SchedulerState::NotStarted as u8),
            stopped: Notify::new(),
        }
    }

    pub(crate) fn state(&self) -> SchedulerState {
        SchedulerState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Transitions `NotStarted -> Running`. Returns false if already started.
    pub(crate) fn try_start(&self) -> bool {
        self.state
            .compare_exchange(
                SchedulerState::NotStarted as u8,
                SchedulerState::Running as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Transitions `Running -> ShuttingDown`. Returns false if some other
    /// caller already won the race (or the scheduler was never started).
    pub(crate) fn try_begin_shutdown(&self) -> bool {
        self.state
            .compare_exchange(
                SchedulerState::Running as u8,
                SchedulerState::ShuttingDown as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    pub(crate) fn finish_shutdown(&self) {
        self.state.store(SchedulerState::Stopped as u8, Ordering::Release);
        self.stopped.notify_waiters();
    }

    /// Waits for a shutdown started by another caller to finish.
    pub(crate) async fn wait_for_stopped(&self) {
        loop {
            if self.state() == SchedulerState::Stopped {
                return;
            }
            let notified = self.stopped.notified();
            if self.state() == SchedulerState::Stopped {
                return;
            }
            notified.await;
        }
    }
}
