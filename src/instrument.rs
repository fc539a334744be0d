//! Per-iteration counters for the benchmark harness.
//!
//! Three costs are tracked while composed operations run: raw allocations
//! performed by the recycling tiers, synthetic I/O completions, and executed
//! work items. The counters are thread-local because the whole harness is
//! single-threaded; a driver resets them, runs a batch of iterations, and
//! reads back the deltas.

use serde::Serialize;
use std::cell::Cell;

thread_local! {
    static COUNTERS: Counters = Counters::default();
}

#[derive(Default)]
struct Counters {
    allocations: Cell<u64>,
    io_completions: Cell<u64>,
    work_items: Cell<u64>,
}

/// A point-in-time copy of this thread's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CounterSnapshot {
    /// Raw allocations performed because no recycled block could satisfy a
    /// request (frame pool fallback and operation cache fallback).
    pub allocations: u64,
    /// Completed synthetic leaf I/O steps.
    pub io_completions: u64,
    /// Work items executed by the event loop.
    pub work_items: u64,
}

impl CounterSnapshot {
    /// Counts accumulated since `earlier` was taken.
    pub fn since(self, earlier: CounterSnapshot) -> CounterSnapshot {
        CounterSnapshot {
            allocations: self.allocations - earlier.allocations,
            io_completions: self.io_completions - earlier.io_completions,
            work_items: self.work_items - earlier.work_items,
        }
    }
}

/// Copy the current counter values for this thread.
pub fn snapshot() -> CounterSnapshot {
    COUNTERS.with(|c| CounterSnapshot {
        allocations: c.allocations.get(),
        io_completions: c.io_completions.get(),
        work_items: c.work_items.get(),
    })
}

/// Zero all counters on this thread.
pub fn reset() {
    COUNTERS.with(|c| {
        c.allocations.set(0);
        c.io_completions.set(0);
        c.work_items.set(0);
    });
}

pub(crate) fn record_allocation() {
    COUNTERS.with(|c| c.allocations.set(c.allocations.get() + 1));
}

pub(crate) fn record_io() {
    COUNTERS.with(|c| c.io_completions.set(c.io_completions.get() + 1));
}

pub(crate) fn record_work() {
    COUNTERS.with(|c| c.work_items.set(c.work_items.get() + 1));
}
