//! The synthetic single-threaded run loop.
//!
//! One [`EventLoop`] owns one [`WorkQueue`] of one-shot [`WorkItem`]s and
//! drains it in strict post order; [`Executor`] is the lightweight handle the
//! composition layers use to dispatch, transfer and post work onto the loop.

pub mod event_loop;
pub mod executor;
pub mod queue;

pub use event_loop::EventLoop;
pub use executor::{from_fn, Executor, FnHandler, Handler};
pub use queue::{WorkItem, WorkQueue};
