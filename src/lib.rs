//! # Celer - Dispatch Overhead Harness
//!
//! Celer measures what chained asynchronous composition costs when it is built
//! two different ways on top of the same synthetic single-threaded event loop:
//!
//! - **Callback composition** (`callback`): explicit continuation-passing.
//!   Every level of nesting is a self-reinvoking continuation object, and every
//!   leaf step obtains a fresh work item from a thread-local operation cache.
//! - **Task composition** (`task`): suspendable computations expressed as
//!   `async fn`s, driven by a root frame whose storage comes from a two-tier
//!   recycling frame pool and which is resumed directly in place when its
//!   synthetic I/O completes.
//!
//! Both models issue the same four operation shapes over one leaf step: a
//! single read (`read_some`), a read of 10 leaf steps (`read`), a request of
//! 100 (`request`) and a session of 1000 (`session`). The `instrument` module
//! counts allocations, synthetic I/O completions and executed work items so a
//! driver can report per-iteration costs.
//!
//! ## Quick Start
//!
//! ```rust
//! use celer::runtime::EventLoop;
//! use celer::{callback, instrument, task};
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let event_loop = EventLoop::new();
//! let executor = event_loop.executor();
//!
//! // Callback model: leaf provider bound to the executor, plus a completion.
//! let socket = callback::Socket::new(executor.clone());
//! let done = Rc::new(Cell::new(0u64));
//! let completion = done.clone();
//! callback::read(&socket, callback::from_fn(move || {
//!     completion.set(completion.get() + 1);
//! }));
//! event_loop.run();
//! assert_eq!(done.get(), 1);
//!
//! // Task model: one composable unit per level, spawned on the same loop.
//! let completion = done.clone();
//! task::spawn(&executor, async move {
//!     task::read(&task::Socket).await;
//!     completion.set(completion.get() + 1);
//! });
//! event_loop.run();
//! assert_eq!(done.get(), 2);
//!
//! let counts = instrument::snapshot();
//! assert_eq!(counts.io_completions, 20);
//! ```

pub mod callback;
pub mod instrument;
pub mod memory;
pub mod runtime;
pub mod task;

// Re-export commonly used types for convenience
pub use instrument::CounterSnapshot;
pub use memory::frame_pool::{FrameAlloc, FramePool};
pub use runtime::{EventLoop, Executor, Handler, WorkItem};
pub use task::spawn;

/// Version information for the celer crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Number of sub-operations each composition level issues to the level below.
pub const FAN_OUT: u32 = 10;
