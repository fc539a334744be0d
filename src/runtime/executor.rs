//! Lightweight handle unifying the three ways work reaches the loop.

use crate::runtime::queue::{WorkItem, WorkQueue};
use crate::task::TaskRef;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A one-shot continuation value.
///
/// Plain continuations have no suspension protocol; dispatching one simply
/// invokes it. The composition levels implement this for their self-reinvoking
/// operation types, and [`from_fn`] adapts a closure for the driver's
/// completion continuation.
pub trait Handler: 'static {
    fn call(self);
}

/// Adapter making a closure usable as a [`Handler`].
pub struct FnHandler<F: FnOnce()>(F);

impl<F: FnOnce() + 'static> Handler for FnHandler<F> {
    fn call(self) {
        (self.0)()
    }
}

/// Wrap a closure as a completion continuation.
pub fn from_fn<F: FnOnce() + 'static>(f: F) -> FnHandler<F> {
    FnHandler(f)
}

/// Handle to an [`EventLoop`](crate::runtime::EventLoop).
///
/// Copies of an executor are cheap and compare equal exactly when they refer
/// to the same loop, so higher layers can assert "same executor" without
/// depending on loop internals.
#[derive(Clone)]
pub struct Executor {
    pub(crate) queue: Rc<RefCell<WorkQueue>>,
}

impl Executor {
    /// Invoke a plain continuation immediately and synchronously.
    ///
    /// Which path a call site takes — this or [`transfer`](Self::transfer) —
    /// is fixed by the argument's type, never by a runtime test.
    pub fn dispatch<H: Handler>(&self, handler: H) {
        handler.call();
    }

    /// Symmetric transfer: hand a ready computation handle back to the
    /// caller unchanged, to be resumed directly in place instead of being
    /// queued.
    pub fn transfer(&self, task: TaskRef) -> TaskRef {
        task
    }

    /// Enqueue a work item on the owning loop for later execution.
    pub fn post(&self, item: WorkItem) {
        self.queue.borrow_mut().push(item);
    }
}

impl PartialEq for Executor {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.queue, &other.queue)
    }
}

impl Eq for Executor {}

impl fmt::Debug for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor")
            .field("loop", &Rc::as_ptr(&self.queue))
            .finish()
    }
}
