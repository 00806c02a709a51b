/*
 * Mutex
 *
 * Binary free/held lock with a FIFO wait list. Non-recursive: a thread
 * that calls `lock()` while already holding the mutex deadlocks against
 * itself rather than recursing, matching the simpler of the two variants
 * this kernel supports (no owner tracking, no recursion counter).
 *
 * Every access to `Inner` runs under `sync::irqlock`: the spinlock guarding
 * it is never held across a preemption point, so a tick that lands while
 * one thread is inside `lock()`/`unlock()` can't find it already taken by
 * the thread it just interrupted.
 *
 * Grounded on the pend/post state machine of the original mutex
 * implementation: `pend` loops while the mutex is held, parking the
 * caller at wait-list priority 0 (pure FIFO, independent of the thread's
 * own scheduling priority) each time around the loop.
 */

use alloc::vec::Vec;

use spin::Mutex as SpinMutex;

use crate::error::{KernelError, KernelResult};
use crate::scheduler;
use crate::sync::irqlock;
use crate::sync::list::List;

struct Inner {
    held: bool,
    waiters: List<scheduler::ThreadId>,
    init: bool,
}

pub struct Mutex {
    inner: SpinMutex<Inner>,
}

impl Mutex {
    pub const fn new() -> Self {
        Self {
            inner: SpinMutex::new(Inner {
                held: false,
                waiters: List::new(),
                init: false,
            }),
        }
    }

    fn with_locked<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> R {
        irqlock::with_locked(|| f(&mut self.inner.lock()))
    }

    pub fn init(&self) -> KernelResult<()> {
        self.with_locked(|inner| {
            if inner.init {
                return Err(KernelError::AlreadyRegistered);
            }
            inner.held = false;
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
            while let Some(node) = inner.waiters.delist() {
                woken.push(node.data);
            }
            Ok(woken)
        })?;
        for id in woken {
            scheduler::wake(id);
        }
        Ok(())
    }

    /// Acquire the mutex, blocking the caller while it is held.
    pub fn lock(&self) -> KernelResult<()> {
        loop {
            let acquired = self.with_locked(|inner| -> KernelResult<bool> {
                if !inner.init {
                    return Err(KernelError::Uninitialized);
                }
                if !inner.held {
                    inner.held = true;
                    return Ok(true);
                }

                let me = scheduler::current_thread_id();
                inner.waiters.enlist(List::new_node(0, me));
                Ok(false)
            })?;

            if acquired {
                return Ok(());
            }
            scheduler::block_current(scheduler::BlockKind::Mutex);
        }
    }

    /// Try to acquire the mutex without blocking. Returns `MutexLocked`
    /// if it is already held. Safe to call from interrupt context.
    pub fn try_lock(&self) -> KernelResult<()> {
        self.with_locked(|inner| {
            if !inner.init {
                return Err(KernelError::Uninitialized);
            }
            if inner.held {
                return Err(KernelError::MutexLocked);
            }
            inner.held = true;
            Ok(())
        })
    }

    /// Release the mutex, waking one FIFO waiter if any.
    pub fn unlock(&self) -> KernelResult<()> {
        let woken = self.with_locked(|inner| -> KernelResult<Option<scheduler::ThreadId>> {
            if !inner.init {
                return Err(KernelError::Uninitialized);
            }
            if !inner.held {
                return Err(KernelError::NotLocked);
            }
            inner.held = false;
            Ok(inner.waiters.delist().map(|node| node.data))
        })?;
        if let Some(id) = woken {
            scheduler::wake(id);
        }
        Ok(())
    }
}
