//! Continuation-passing composition.
//!
//! Each level is a self-reinvoking continuation object: on every invocation
//! it either issues the next sub-level call, relocating itself as the new
//! continuation, or dispatches the final handler once its count is spent.
//! Every leaf step obtains a fresh work item from the operation cache and
//! releases it immediately after transferring the executor and handler out —
//! so the concrete handler type, and with it the leaf allocation size, grows
//! with composition depth. That growth is the measured quantity; do not
//! collapse the ops into a uniform closure representation.

use crate::instrument;
use crate::memory::op_cache::OpBox;
use crate::runtime::executor::{Executor, Handler};
use crate::runtime::queue::WorkItem;
use crate::FAN_OUT;

pub use crate::runtime::executor::{from_fn, FnHandler};

/// Leaf provider bound to an [`Executor`].
#[derive(Debug, Clone)]
pub struct Socket {
    executor: Executor,
}

impl Socket {
    pub fn new(executor: Executor) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }
}

/// Work item for one leaf step: holds the executor and the continuation,
/// transfers both out when executed, and dispatches the continuation inline
/// after its own storage has gone back to the cache.
struct IoOp<H: Handler> {
    executor: Executor,
    handler: H,
}

impl<H: Handler> Handler for IoOp<H> {
    fn call(self) {
        instrument::record_io();
        let IoOp { executor, handler } = self;
        executor.dispatch(handler);
    }
}

/// One synthetic leaf I/O step: post a fresh operation, invoke `handler`
/// when the loop executes it.
pub fn read_some<H: Handler>(socket: &Socket, handler: H) {
    let op = OpBox::new(IoOp {
        executor: socket.executor.clone(),
        handler,
    });
    socket.executor.post(WorkItem::Op(op));
}

struct ReadOp<H: Handler> {
    socket: Socket,
    handler: H,
    remaining: u32,
}

impl<H: Handler> Handler for ReadOp<H> {
    fn call(mut self) {
        if self.remaining > 0 {
            self.remaining -= 1;
            let socket = self.socket.clone();
            read_some(&socket, self);
        } else {
            let ReadOp {
                socket, handler, ..
            } = self;
            socket.executor.dispatch(handler);
        }
    }
}

/// Issue 10 leaf steps sequentially, then dispatch `handler`.
pub fn read<H: Handler>(socket: &Socket, handler: H) {
    ReadOp {
        socket: socket.clone(),
        handler,
        remaining: FAN_OUT,
    }
    .call();
}

struct RequestOp<H: Handler> {
    socket: Socket,
    handler: H,
    remaining: u32,
}

impl<H: Handler> Handler for RequestOp<H> {
    fn call(mut self) {
        if self.remaining > 0 {
            self.remaining -= 1;
            let socket = self.socket.clone();
            read(&socket, self);
        } else {
            let RequestOp {
                socket, handler, ..
            } = self;
            socket.executor.dispatch(handler);
        }
    }
}

/// Issue 10 reads (100 leaf steps), then dispatch `handler`.
pub fn request<H: Handler>(socket: &Socket, handler: H) {
    RequestOp {
        socket: socket.clone(),
        handler,
        remaining: FAN_OUT,
    }
    .call();
}

struct SessionOp<H: Handler> {
    socket: Socket,
    handler: H,
    remaining: u32,
}

impl<H: Handler> Handler for SessionOp<H> {
    fn call(mut self) {
        if self.remaining > 0 {
            self.remaining -= 1;
            let socket = self.socket.clone();
            request(&socket, self);
        } else {
            let SessionOp {
                socket, handler, ..
            } = self;
            socket.executor.dispatch(handler);
        }
    }
}

/// Issue 10 requests (1000 leaf steps), then dispatch `handler`.
pub fn session<H: Handler>(socket: &Socket, handler: H) {
    SessionOp {
        socket: socket.clone(),
        handler,
        remaining: FAN_OUT,
    }
    .call();
}
