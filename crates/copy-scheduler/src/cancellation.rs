//! Hand-rolled cooperative cancellation tokens.
//!
//! The scheduler links two independent cancellation sources into the token a
//! running callback observes: the caller's own cancellation token (if any)
//! and the scheduler's shared shutdown token. Firing either one must cancel
//! the linked token, and a caller that inspects `reason()` needs to be able
//! to tell which source actually fired so it can decide whether to surface
//! [`crate::error::SchedulerError::Shutdown`] or its own cancellation outcome.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::Notify;

/// Distinguishes who cancelled a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The caller of the copy operation cancelled it.
    Caller,
    /// The scheduler is shutting down.
    Shutdown,
}

impl CancelReason {
    fn to_u8(self) -> u8 {
        match self {
            CancelReason::Caller => 1,
            CancelReason::Shutdown => 2,
        }
    }

    fn from_u8(v: u8) -> Option<Self> {
        match v {
            1 => Some(CancelReason::Caller),
            2 => Some(CancelReason::Shutdown),
            _ => None,
        }
    }
}

struct Shared {
    reason: AtomicU8,
    notify: Notify,
    children: Mutex<Vec<Weak<Shared>>>,
}

impl Shared {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            reason: AtomicU8::new(0),
            notify: Notify::new(),
            children: Mutex::new(Vec::new()),
        })
    }

    fn fire(self: &Arc<Self>, reason: CancelReason) {
        if self
            .reason
            .compare_exchange(0, reason.to_u8(), Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            // Already cancelled; the first reason to land wins and children
            // were already notified when that happened.
            return;
        }
        self.notify.notify_waiters();
        let children = self.children.lock().unwrap();
        for weak in children.iter() {
            if let Some(child) = weak.upgrade() {
                child.fire(reason);
            }
        }
    }

    fn reason(&self) -> Option<CancelReason> {
        CancelReason::from_u8(self.reason.load(Ordering::Acquire))
    }
}

/// A cooperative cancellation token.
///
/// Cloning shares the same underlying cancellation state; [`CancelToken::child_token`]
/// and [`CancelToken::linked`] create new, independent tokens that are wired
/// to fire when their parent(s) do.
#[derive(Clone)]
pub struct CancelToken(Arc<Shared>);

impl CancelToken {
    /// Creates a new, unlinked token.
    pub fn new() -> Self {
        Self(Shared::new())
    }

    /// Creates a token that fires whenever `self` fires.
    pub fn child_token(&self) -> CancelToken {
        let child = Shared::new();
        self.0.children.lock().unwrap().push(Arc::downgrade(&child));
        if let Some(reason) = self.0.reason() {
            child.fire(reason);
        }
        CancelToken(child)
    }

    /// Creates a new token that fires as soon as any of `parents` fires,
    /// carrying whichever reason fired first.
    pub fn linked(parents: &[&CancelToken]) -> CancelToken {
        let child = Shared::new();
        for parent in parents {
            parent.0.children.lock().unwrap().push(Arc::downgrade(&child));
            if let Some(reason) = parent.0.reason() {
                child.fire(reason);
            }
        }
        CancelToken(child)
    }

    /// Cancels this token, propagating to every live descendant.
    pub fn cancel(&self, reason: CancelReason) {
        self.0.fire(reason);
    }

    /// Returns true once this token has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.0.reason().is_some()
    }

    /// Returns the reason this token was cancelled for, if any.
    pub fn reason(&self) -> Option<CancelReason> {
        self.0.reason()
    }

    /// Resolves once this token is cancelled.
    pub async fn cancelled(&self) {
        loop {
            if self.is_cancelled() {
                return;
            }
            let notified = self.0.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}
