/*
 * Mailbox
 *
 * A single-slot rendezvous: exactly the bounded queue of §queue.rs with
 * capacity fixed to one. Kept as a distinct, named type rather than a type
 * alias because callers reason about it as "the next message", not "a
 * queue that happens to hold one item".
 */

use crate::error::KernelResult;
use crate::sync::queue::Queue;

pub struct Mailbox<T> {
    queue: Queue<T, 1>,
}

impl<T> Mailbox<T> {
    pub const fn new() -> Self {
        Self {
            queue: Queue::new(),
        }
    }

    pub fn init(&self) -> KernelResult<()> {
        self.queue.init()
    }

    pub fn destroy(&self) -> KernelResult<()> {
        self.queue.destroy()
    }

    /// Block until a message is available, then take it.
    pub fn receive(&self) -> KernelResult<T> {
        self.queue.pend()
    }

    /// Block while the slot is occupied, then deposit a message.
    pub fn send(&self, msg: T) -> KernelResult<()> {
        self.queue.post(msg)
    }

    pub fn has_message(&self) -> KernelResult<bool> {
        self.queue.len().map(|n| n > 0)
    }
}
