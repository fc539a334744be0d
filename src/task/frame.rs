//! Pooled root frames and resumption handles for suspended computations.
//!
//! A spawned computation lives in one frame obtained from its bound
//! allocator: a header, the allocator binding itself, the executor owned by
//! value, and the future. The header carries reference and lifecycle state,
//! the type-erased resume/drop entry points, and a release function plus
//! context pointer — teardown cannot statically know which allocator binding
//! produced a given frame, so the binding travels with the block.
//!
//! Resumption never goes through a waker. The leaf I/O future reads the
//! frame of the computation currently being polled from a thread-local and
//! enqueues a handle to it; executing that handle polls the future again, and
//! the trampoline keeps resuming returned handles until none remain.

use crate::memory::frame_pool::{FrameAlloc, FramePool, BLOCK_ALIGN};
use crate::runtime::executor::Executor;
use crate::runtime::queue::WorkItem;
use futures::task::noop_waker;
use std::cell::Cell;
use std::future::Future;
use std::mem::{self, ManuallyDrop};
use std::pin::Pin;
use std::ptr::{self, NonNull};
use std::task::{Context, Poll};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameState {
    /// Spawned but not yet polled; started explicitly by the driver's run.
    Created,
    /// Inside a poll.
    Running,
    /// Waiting on a leaf I/O completion.
    Suspended,
    /// The future has been destroyed; only the storage remains.
    Completed,
}

#[repr(C)]
pub(crate) struct FrameHeader {
    refs: Cell<u32>,
    state: Cell<FrameState>,
    resume_fn: unsafe fn(NonNull<FrameHeader>) -> bool,
    drop_future_fn: unsafe fn(NonNull<FrameHeader>),
    release_fn: unsafe fn(*const (), NonNull<u8>, usize),
    release_ctx: *const (),
    total_size: usize,
    executor: Executor,
}

/// Storage layout of one spawned computation. The header must stay the first
/// field so a frame pointer and a header pointer are interchangeable.
#[repr(C)]
struct RootFrame<F, A> {
    header: FrameHeader,
    alloc: A,
    future: ManuallyDrop<F>,
}

thread_local! {
    static CURRENT_TASK: Cell<Option<NonNull<FrameHeader>>> = Cell::new(None);
}

/// Reference-counted resumption handle to a spawned computation.
///
/// The last handle to drop tears the frame down: the future is destroyed
/// exactly once (at its completion point, or here if it never completed) and
/// the storage is released through the allocator binding recorded in the
/// header.
pub struct TaskRef {
    header: NonNull<FrameHeader>,
}

impl TaskRef {
    /// Handle to the computation currently being polled on this thread.
    pub(crate) fn current() -> Option<TaskRef> {
        CURRENT_TASK.with(|cell| cell.get()).map(|header| {
            let h = unsafe { header.as_ref() };
            h.refs.set(h.refs.get() + 1);
            TaskRef { header }
        })
    }

    /// The executor this computation owns.
    pub(crate) fn executor(&self) -> Executor {
        unsafe { self.header.as_ref() }.executor.clone()
    }

    /// Poll the computation once.
    ///
    /// Returns the next ready handle, if any, so the caller can keep
    /// resuming without unwinding to the queue.
    pub(crate) fn resume(self) -> Option<TaskRef> {
        let header = self.header;
        unsafe { (header.as_ref().resume_fn)(header) };
        // This handle's drop releases the frame when it was the last one.
        None
    }
}

impl Clone for TaskRef {
    fn clone(&self) -> Self {
        let h = unsafe { self.header.as_ref() };
        h.refs.set(h.refs.get() + 1);
        TaskRef {
            header: self.header,
        }
    }
}

impl Drop for TaskRef {
    fn drop(&mut self) {
        let remaining = {
            let h = unsafe { self.header.as_ref() };
            let remaining = h.refs.get() - 1;
            h.refs.set(remaining);
            remaining
        };
        if remaining == 0 {
            unsafe { destroy(self.header) };
        }
    }
}

/// Keep resuming ready handles until none remain.
pub(crate) fn trampoline(task: TaskRef) {
    let mut next = Some(task);
    while let Some(task) = next {
        next = task.resume();
    }
}

/// Spawn `future` as a root computation on `executor`, drawing frame storage
/// from the shared pool.
///
/// The computation starts when the loop executes the posted start item; it
/// owns the executor by value for its whole lifetime.
pub fn spawn<F>(executor: &Executor, future: F)
where
    F: Future<Output = ()> + 'static,
{
    spawn_in(executor, FramePool, future)
}

/// Spawn with frame storage drawn from a caller-supplied allocator binding.
pub fn spawn_in<A, F>(executor: &Executor, alloc: A, future: F)
where
    A: FrameAlloc + 'static,
    F: Future<Output = ()> + 'static,
{
    let total = mem::size_of::<RootFrame<F, A>>().max(1);
    debug_assert!(mem::align_of::<RootFrame<F, A>>() <= BLOCK_ALIGN);

    let storage = alloc.allocate(total);
    let frame = storage.cast::<RootFrame<F, A>>();
    unsafe {
        frame.as_ptr().write(RootFrame {
            header: FrameHeader {
                refs: Cell::new(1),
                state: Cell::new(FrameState::Created),
                resume_fn: resume_erased::<F, A>,
                drop_future_fn: drop_future_erased::<F, A>,
                release_fn: release_erased::<A>,
                release_ctx: ptr::null(),
                total_size: total,
                executor: executor.clone(),
            },
            alloc,
            future: ManuallyDrop::new(future),
        });
        // The binding's address is only known once it sits in the frame.
        (*frame.as_ptr()).header.release_ctx =
            ptr::addr_of!((*frame.as_ptr()).alloc).cast();
    }

    tracing::trace!(frame_bytes = total, "computation spawned");
    executor.post(WorkItem::Start(TaskRef {
        header: frame.cast(),
    }));
}

unsafe fn resume_erased<F, A>(header: NonNull<FrameHeader>) -> bool
where
    F: Future<Output = ()> + 'static,
    A: FrameAlloc + 'static,
{
    let frame = header.cast::<RootFrame<F, A>>().as_ptr();
    unsafe {
        debug_assert!(matches!(
            (*frame).header.state.get(),
            FrameState::Created | FrameState::Suspended
        ));
        (*frame).header.state.set(FrameState::Running);
    }

    let previous = CURRENT_TASK.with(|cell| cell.replace(Some(header)));
    let waker = noop_waker();
    let mut cx = Context::from_waker(&waker);
    // The frame never moves once written into pooled storage.
    let poll = unsafe { Pin::new_unchecked(&mut *(*frame).future).poll(&mut cx) };
    CURRENT_TASK.with(|cell| cell.set(previous));

    match poll {
        Poll::Ready(()) => unsafe {
            // Completion point: the future is destroyed exactly once, here.
            ManuallyDrop::drop(&mut (*frame).future);
            (*frame).header.state.set(FrameState::Completed);
            true
        },
        Poll::Pending => unsafe {
            (*frame).header.state.set(FrameState::Suspended);
            false
        },
    }
}

unsafe fn drop_future_erased<F, A>(header: NonNull<FrameHeader>)
where
    F: Future<Output = ()> + 'static,
    A: FrameAlloc + 'static,
{
    let frame = header.cast::<RootFrame<F, A>>().as_ptr();
    unsafe { ManuallyDrop::drop(&mut (*frame).future) };
}

unsafe fn release_erased<A: FrameAlloc + 'static>(ctx: *const (), storage: NonNull<u8>, size: usize) {
    // Move the binding out of the frame before its storage is released.
    let alloc = unsafe { ptr::read(ctx.cast::<A>()) };
    unsafe { alloc.deallocate(storage, size) };
}

unsafe fn destroy(header: NonNull<FrameHeader>) {
    let h = header.as_ptr();
    let (release_fn, release_ctx, total_size);
    unsafe {
        if (*h).state.get() != FrameState::Completed {
            tracing::trace!("suspended computation released without resuming");
            ((*h).drop_future_fn)(header);
        }
        release_fn = (*h).release_fn;
        release_ctx = (*h).release_ctx;
        total_size = (*h).total_size;
        ptr::drop_in_place(ptr::addr_of_mut!((*h).executor));
    }
    unsafe { release_fn(release_ctx, header.cast::<u8>(), total_size) };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument;
    use crate::runtime::EventLoop;
    use crate::task::Socket;
    use std::cell::Cell;
    use std::rc::Rc;

    #[derive(Clone)]
    struct CountingAlloc {
        allocated: Rc<Cell<u32>>,
        released: Rc<Cell<u32>>,
    }

    impl CountingAlloc {
        fn new() -> Self {
            Self {
                allocated: Rc::new(Cell::new(0)),
                released: Rc::new(Cell::new(0)),
            }
        }
    }

    impl FrameAlloc for CountingAlloc {
        fn allocate(&self, n: usize) -> NonNull<u8> {
            self.allocated.set(self.allocated.get() + 1);
            FramePool.allocate(n)
        }

        unsafe fn deallocate(&self, ptr: NonNull<u8>, n: usize) {
            self.released.set(self.released.get() + 1);
            unsafe { FramePool.deallocate(ptr, n) };
        }
    }

    #[test]
    fn test_spawn_runs_to_completion() {
        let event_loop = EventLoop::new();
        let executor = event_loop.executor();

        let done = Rc::new(Cell::new(false));
        let flag = done.clone();
        spawn(&executor, async move {
            Socket.read_some().await;
            flag.set(true);
        });

        assert!(!done.get());
        event_loop.run();
        assert!(done.get());
    }

    #[test]
    fn test_leaf_costs_one_io_and_two_work_items() {
        let event_loop = EventLoop::new();
        let executor = event_loop.executor();

        let before = instrument::snapshot();
        spawn(&executor, async {
            Socket.read_some().await;
        });
        event_loop.run();

        let delta = instrument::snapshot().since(before);
        assert_eq!(delta.io_completions, 1);
        assert_eq!(delta.work_items, 2);
    }

    #[test]
    fn test_computation_without_suspension_costs_one_work_item() {
        let event_loop = EventLoop::new();
        let executor = event_loop.executor();

        let before = instrument::snapshot();
        spawn(&executor, async {});
        event_loop.run();

        let delta = instrument::snapshot().since(before);
        assert_eq!(delta.io_completions, 0);
        assert_eq!(delta.work_items, 1);
    }

    #[test]
    fn test_custom_binding_allocates_and_releases_through_header() {
        let event_loop = EventLoop::new();
        let executor = event_loop.executor();
        let alloc = CountingAlloc::new();

        spawn_in(&executor, alloc.clone(), async {
            Socket.read_some().await;
        });
        event_loop.run();

        assert_eq!(alloc.allocated.get(), 1);
        assert_eq!(alloc.released.get(), 1);
    }

    #[test]
    fn test_teardown_releases_suspended_frame_without_resuming() {
        struct Probe {
            dropped: Rc<Cell<bool>>,
        }
        impl Drop for Probe {
            fn drop(&mut self) {
                self.dropped.set(true);
            }
        }

        let alloc = CountingAlloc::new();
        let dropped = Rc::new(Cell::new(false));
        let resumed = Rc::new(Cell::new(0u32));

        {
            let event_loop = EventLoop::new();
            let executor = event_loop.executor();
            let probe = Probe {
                dropped: dropped.clone(),
            };
            let steps = resumed.clone();
            spawn_in(&executor, alloc.clone(), async move {
                let _keep = probe;
                Socket.read_some().await;
                steps.set(steps.get() + 1);
            });
            // Loop dropped here with the start item still pending.
        }

        assert!(dropped.get());
        assert_eq!(resumed.get(), 0);
        assert_eq!(alloc.allocated.get(), 1);
        assert_eq!(alloc.released.get(), 1);
    }

    #[test]
    fn test_frame_storage_is_reused_across_spawns() {
        let event_loop = EventLoop::new();
        let executor = event_loop.executor();

        // Warm the pool with this exact frame shape.
        spawn(&executor, async {
            Socket.read_some().await;
        });
        event_loop.run();

        let before = instrument::snapshot();
        spawn(&executor, async {
            Socket.read_some().await;
        });
        event_loop.run();
        assert_eq!(instrument::snapshot().since(before).allocations, 0);
    }
}
