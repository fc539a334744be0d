//! Owner of the work queue and the drain loop.

use crate::instrument;
use crate::runtime::executor::Executor;
use crate::runtime::queue::WorkQueue;
use std::cell::RefCell;
use std::rc::Rc;

/// Owns exactly one [`WorkQueue`]; its lifetime spans one benchmark run.
///
/// The queue sits behind a shared handle so executors captured inside queued
/// work can keep posting while the loop drains.
pub struct EventLoop {
    inner: Rc<RefCell<WorkQueue>>,
}

impl EventLoop {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(WorkQueue::new())),
        }
    }

    /// A handle for dispatching and posting onto this loop.
    pub fn executor(&self) -> Executor {
        Executor {
            queue: Rc::clone(&self.inner),
        }
    }

    /// Pop and execute until the queue reports empty.
    ///
    /// Emptiness is rechecked after every execution, so items enqueued by one
    /// execution are processed within the same call — composed operations
    /// post chains of follow-up work and rely on this.
    pub fn run(&self) {
        loop {
            let item = self.inner.borrow_mut().pop();
            match item {
                Some(item) => {
                    instrument::record_work();
                    item.execute();
                }
                None => break,
            }
        }
    }

    /// Number of queued, not yet executed items.
    pub fn pending(&self) -> usize {
        self.inner.borrow().len()
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for EventLoop {
    fn drop(&mut self) {
        let mut queue = self.inner.borrow_mut();
        if !queue.is_empty() {
            // Expected on idle shutdown with work left behind deliberately;
            // anything else points at a latent cancellation bug upstream.
            tracing::warn!(
                pending = queue.len(),
                "event loop dropped with unexecuted work items"
            );
            queue.clear();
        }
    }
}
