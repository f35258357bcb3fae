//! Priority-weighted dispatch queue bank (`spec.md` §4.1).
//!
//! Three FIFO queues, one per [`Priority`]. `next` builds a weighted
//! candidate list — each non-empty queue's priority inserted `weight` times —
//! and picks uniformly at random, so across many calls the servicing ratio
//! approaches HIGH:NORMAL:LOW = 3:2:1 without a priority heap's starvation
//! risk.
//!
//! Requests travel through the bank as `Arc<Request>`: the submitter keeps
//! its own clone to poll or await after handing scheduling ownership to the
//! worker (`spec.md` §4.6), while the single [`crate::domain::OnceLock`]-backed
//! completion slot inside `Request` keeps writes to exactly the worker.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use rand::Rng;
use rand::rngs::ThreadRng;

use crate::domain::{Priority, Request};

/// Error returned by [`DispatchBank::submit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// The target queue is at its configured capacity.
    #[error("dispatch queue is full")]
    QueueFull,
}

struct Queue {
    priority: Priority,
    items: Mutex<VecDeque<Arc<Request>>>,
    capacity: Option<usize>,
}

impl Queue {
    fn new(priority: Priority, capacity: Option<usize>) -> Self {
        Self {
            priority,
            items: Mutex::new(VecDeque::new()),
            capacity,
        }
    }

    fn push(&self, request: Arc<Request>) -> Result<(), DispatchError> {
        let mut guard = self
            .items
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(capacity) = self.capacity {
            if guard.len() >= capacity {
                return Err(DispatchError::QueueFull);
            }
        }
        guard.push_back(request);
        Ok(())
    }

    fn pop(&self) -> Option<Arc<Request>> {
        let mut guard = self
            .items
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        guard.pop_front()
    }

    fn is_empty(&self) -> bool {
        let guard = self
            .items
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        guard.is_empty()
    }
}

/// The three-priority dispatch bank shared between submitters and the
/// worker.
pub struct DispatchBank {
    queues: [Queue; 3],
}

impl DispatchBank {
    /// Build an unbounded dispatch bank.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(None)
    }

    /// Build a dispatch bank whose queues each reject submissions once they
    /// hold `capacity` requests.
    #[must_use]
    pub fn with_capacity(capacity: Option<usize>) -> Self {
        Self {
            queues: [
                Queue::new(Priority::Low, capacity),
                Queue::new(Priority::Normal, capacity),
                Queue::new(Priority::High, capacity),
            ],
        }
    }

    fn queue_for(&self, priority: Priority) -> &Queue {
        self.queues
            .iter()
            .find(|queue| queue.priority == priority)
            .unwrap_or_else(|| unreachable!("every Priority variant has a queue"))
    }

    /// Place `request` on the queue selected by its priority.
    ///
    /// # Errors
    /// Returns [`DispatchError::QueueFull`] if a capacity bound is
    /// configured and the target queue is already full.
    pub fn submit(&self, request: Arc<Request>) -> Result<(), DispatchError> {
        self.queue_for(request.priority()).push(request)
    }

    /// Pop the next request per the weighted-random scheduling rule, or
    /// `None` if every queue is empty.
    #[must_use]
    pub fn next(&self) -> Option<Arc<Request>> {
        let mut rng = rand::thread_rng();
        self.next_with_rng(&mut rng)
    }

    fn next_with_rng(&self, rng: &mut ThreadRng) -> Option<Arc<Request>> {
        let mut candidates = Vec::with_capacity(Priority::ALL.len() * usize::from(Priority::High.weight()));
        for priority in Priority::ALL {
            let queue = self.queue_for(priority);
            if !queue.is_empty() {
                for _ in 0..queue.priority.weight() {
                    candidates.push(priority);
                }
            }
        }
        if candidates.is_empty() {
            return None;
        }
        let index = rng.gen_range(0..candidates.len());
        let chosen = candidates
            .get(index)
            .copied()
            .unwrap_or_else(|| unreachable!("index is within candidates bounds"));
        self.queue_for(chosen).pop()
    }
}

impl Default for DispatchBank {
    fn default() -> Self {
        Self::new()
    }
}
