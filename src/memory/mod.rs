//! Recycling allocators backing both composition models.
//!
//! `frame_pool` recycles storage for suspended computations through a
//! thread-local freelist with a mutex-guarded global overflow; `op_cache`
//! recycles the callback model's continuation-chain storage through a single
//! slot per thread.

pub mod frame_pool;
pub mod op_cache;

pub use frame_pool::{AllocError, FrameAlloc, FramePool};
pub use op_cache::{OpBox, OperationCache};
