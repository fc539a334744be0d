//! Suspendable-computation composition.
//!
//! The four operation levels are plain `async fn`s nested over one synthetic
//! leaf step, so a whole composition occupies a single flat frame whose
//! storage is recycled by the frame pool across invocations at the same call
//! site. The machinery that spawns, resumes and tears down those frames lives
//! in [`frame`].

pub mod frame;

pub use frame::{spawn, spawn_in, TaskRef};

pub(crate) use frame::trampoline;

use crate::runtime::queue::WorkItem;
use crate::FAN_OUT;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Leaf provider for the suspendable model.
///
/// Carries no state of its own: the executor and the resumption handle both
/// come from the frame of the computation awaiting the leaf.
#[derive(Debug, Clone, Copy, Default)]
pub struct Socket;

impl Socket {
    /// One synthetic leaf I/O step: a single deferred post standing in for a
    /// real asynchronous read.
    pub fn read_some(&self) -> ReadSome {
        ReadSome { posted: false }
    }
}

/// Future for [`Socket::read_some`].
///
/// The first poll posts the completion work item and suspends; executing that
/// item resumes the computation directly, and the second poll completes. The
/// waker in the poll context is never used.
pub struct ReadSome {
    posted: bool,
}

impl Future for ReadSome {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
        if self.posted {
            return Poll::Ready(());
        }
        self.posted = true;

        let task = match TaskRef::current() {
            Some(task) => task,
            None => panic!("read_some polled outside a spawned computation"),
        };
        let executor = task.executor();
        executor.post(WorkItem::Io(task));
        Poll::Pending
    }
}

/// Issue 10 leaf steps sequentially.
pub async fn read(socket: &Socket) {
    for _ in 0..FAN_OUT {
        socket.read_some().await;
    }
}

/// Issue 10 reads (100 leaf steps).
pub async fn request(socket: &Socket) {
    for _ in 0..FAN_OUT {
        read(socket).await;
    }
}

/// Issue 10 requests (1000 leaf steps).
pub async fn session(socket: &Socket) {
    for _ in 0..FAN_OUT {
        request(socket).await;
    }
}
