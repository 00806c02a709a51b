/*
 * Bounded FIFO queue
 *
 * Fixed-capacity ring buffer with two wait lists: readers block while the
 * queue is empty, writers block while it is full. Capacity is a const
 * generic backed by `heapless::Deque`, so there is no heap allocation in
 * the data path itself (only the wait-list nodes allocate, same as every
 * other primitive in this module).
 *
 * Index arithmetic uses plain modular wraparound rather than reproducing
 * the off-by-one the original ring buffer carried (see the resolved open
 * question on ring-buffer indexing).
 *
 * Every access to `Inner` runs under `sync::irqlock`, for the same reason
 * the mutex and semaphore do.
 */

use alloc::vec::Vec;

use heapless::Deque;
use spin::Mutex as SpinMutex;

use crate::error::{KernelError, KernelResult};
use crate::scheduler;
use crate::sync::irqlock;
use crate::sync::list::List;

struct Inner<T, const N: usize> {
    items: Deque<T, N>,
    readers: List<scheduler::ThreadId>,
    writers: List<scheduler::ThreadId>,
    init: bool,
}

pub struct Queue<T, const N: usize> {
    inner: SpinMutex<Inner<T, N>>,
}

impl<T, const N: usize> Queue<T, N> {
    pub const fn new() -> Self {
        Self {
            inner: SpinMutex::new(Inner {
                items: Deque::new(),
                readers: List::new(),
                writers: List::new(),
                init: false,
            }),
        }
    }

    fn with_locked<R>(&self, f: impl FnOnce(&mut Inner<T, N>) -> R) -> R {
        irqlock::with_locked(|| f(&mut self.inner.lock()))
    }

    pub fn init(&self) -> KernelResult<()> {
        self.with_locked(|inner| {
            if inner.init {
                return Err(KernelError::AlreadyRegistered);
            }
            inner.init = true;
            Ok(())
        })
    }

    pub fn destroy(&self) -> KernelResult<()> {
        let woken = self.with_locked(|inner| -> KernelResult<Vec<scheduler::ThreadId>> {
            if !inner.init {
                return Err(KernelError::Uninitialized);
            }
            inner.init = false;
            let mut woken = Vec::new();
            while let Some(node) = inner.readers.delist() {
                woken.push(node.data);
            }
            while let Some(node) = inner.writers.delist() {
                woken.push(node.data);
            }
            Ok(woken)
        })?;
        for id in woken {
            scheduler::wake(id);
        }
        Ok(())
    }

    /// Block while the queue is empty, then pop one item.
    pub fn pend(&self) -> KernelResult<T> {
        loop {
            let outcome = self.with_locked(|inner| -> KernelResult<Option<(T, Option<scheduler::ThreadId>)>> {
                if !inner.init {
                    return Err(KernelError::Uninitialized);
                }
                if let Some(item) = inner.items.pop_front() {
                    return Ok(Some((item, inner.writers.delist().map(|node| node.data))));
                }

                let me = scheduler::current_thread_id();
                inner.readers.enlist(List::new_node(0, me));
                Ok(None)
            })?;

            if let Some((item, woken)) = outcome {
                if let Some(id) = woken {
                    scheduler::wake(id);
                }
                return Ok(item);
            }
            scheduler::block_current(scheduler::BlockKind::Queue);
        }
    }

    /// Block while the queue is full, then push one item.
    pub fn post(&self, item: T) -> KernelResult<()> {
        let mut item = item;
        loop {
            let outcome = self.with_locked(|inner| -> KernelResult<Result<Option<scheduler::ThreadId>, T>> {
                if !inner.init {
                    return Err(KernelError::Uninitialized);
                }
                match inner.items.push_back(item) {
                    Ok(()) => Ok(Ok(inner.readers.delist().map(|node| node.data))),
                    Err(rejected) => {
                        let me = scheduler::current_thread_id();
                        inner.writers.enlist(List::new_node(0, me));
                        Ok(Err(rejected))
                    }
                }
            })?;

            match outcome {
                Ok(woken) => {
                    if let Some(id) = woken {
                        scheduler::wake(id);
                    }
                    return Ok(());
                }
                Err(rejected) => {
                    item = rejected;
                    scheduler::block_current(scheduler::BlockKind::Queue);
                }
            }
        }
    }

    pub fn len(&self) -> KernelResult<usize> {
        self.with_locked(|inner| {
            if !inner.init {
                return Err(KernelError::Uninitialized);
            }
            Ok(inner.items.len())
        })
    }

    pub fn is_empty(&self) -> KernelResult<bool> {
        self.len().map(|n| n == 0)
    }
}
