//! Per-priority-class FIFO queues.
//!
//! A request enters exactly one class queue on submission and leaves it
//! exactly once, either by admission or by expiry. Ordering within a class
//! is strict FIFO.

use crate::priority::PRIORITY_CLASS_COUNT;
use crate::request::Request;
use std::collections::VecDeque;

pub(crate) struct PriorityQueues {
    classes: Vec<VecDeque<Request>>,
}

impl PriorityQueues {
    pub(crate) fn new() -> Self {
        Self {
            classes: (0..PRIORITY_CLASS_COUNT).map(|_| VecDeque::new()).collect(),
        }
    }

    pub(crate) fn push(&mut self, request: Request) {
        let class = request.priority_class() as usize;
        self.classes[class].push_back(request);
    }

    pub(crate) fn pop_front(&mut self, class: usize) -> Option<Request> {
        self.classes[class].pop_front()
    }

    /// Removes every request in `class` for which `predicate` returns true,
    /// preserving FIFO order among the rest.
    pub(crate) fn retain_class<F>(&mut self, class: usize, mut keep: F) -> Vec<Request>
    where
        F: FnMut(&Request) -> bool,
    {
        let queue = &mut self.classes[class];
        let mut removed = Vec::new();
        let mut kept = VecDeque::with_capacity(queue.len());
        for request in queue.drain(..) {
            if keep(&request) {
                kept.push_back(request);
            } else {
                removed.push(request);
            }
        }
        *queue = kept;
        removed
    }

    pub(crate) fn len_class(&self, class: usize) -> usize {
        self.classes[class].len()
    }

    pub(crate) fn queue_lengths(&self) -> Vec<usize> {
        self.classes.iter().map(|q| q.len()).collect()
    }

    pub(crate) fn nonempty_classes(&self) -> impl Iterator<Item = usize> + '_ {
        (0..PRIORITY_CLASS_COUNT).filter(move |&c| !self.classes[c].is_empty())
    }

    /// Drains every queue. Used during shutdown to fail all queued requests
    /// at once.
    pub(crate) fn drain_all(&mut self) -> Vec<Request> {
        let mut drained = Vec::new();
        for queue in &mut self.classes {
            drained.extend(queue.drain(..));
        }
        drained
    }
}
