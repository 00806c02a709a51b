/*
 * Counting semaphore
 *
 * `level` may start negative: `pend` blocks while `level < 1` and
 * decrements only once it can proceed, so e.g. `init(-1)` followed by one
 * `post` raises the level to 0 and a subsequent `pend` still blocks. This
 * is the literal pend/post contract of the original semaphore, kept as a
 * deliberate rendezvous behavior rather than patched into a different
 * sign convention (see the resolved open question on semaphore semantics).
 *
 * Every access to `Inner` runs under `sync::irqlock`, for the same reason
 * the mutex does: the spinlock guarding it must never be held across a
 * preemption point.
 */

use alloc::vec::Vec;

use spin::Mutex as SpinMutex;

use crate::error::{KernelError, KernelResult};
use crate::scheduler;
use crate::sync::irqlock;
use crate::sync::list::List;

struct Inner {
    level: i32,
    waiters: List<scheduler::ThreadId>,
    init: bool,
}

pub struct Semaphore {
    inner: SpinMutex<Inner>,
}

impl Semaphore {
    pub const fn new() -> Self {
        Self {
            inner: SpinMutex::new(Inner {
                level: 0,
                waiters: List::new(),
                init: false,
            }),
        }
    }

    fn with_locked<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> R {
        irqlock::with_locked(|| f(&mut self.inner.lock()))
    }

    pub fn init(&self, level: i32) -> KernelResult<()> {
        self.with_locked(|inner| {
            if inner.init {
                return Err(KernelError::AlreadyRegistered);
            }
            inner.level = level;
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

    /// Block while `level < 1`, then consume one unit.
    pub fn pend(&self) -> KernelResult<()> {
        loop {
            let acquired = self.with_locked(|inner| -> KernelResult<bool> {
                if !inner.init {
                    return Err(KernelError::Uninitialized);
                }
                if inner.level >= 1 {
                    inner.level -= 1;
                    return Ok(true);
                }

                let me = scheduler::current_thread_id();
                inner.waiters.enlist(List::new_node(0, me));
                Ok(false)
            })?;

            if acquired {
                return Ok(());
            }
            scheduler::block_current(scheduler::BlockKind::Sem);
        }
    }

    /// Try to consume one unit without blocking. Returns `SemLocked` if
    /// the level is below 1; call `level()` for the current count. Safe
    /// to call from interrupt context.
    pub fn try_pend(&self) -> KernelResult<()> {
        self.with_locked(|inner| {
            if !inner.init {
                return Err(KernelError::Uninitialized);
            }
            if inner.level < 1 {
                return Err(KernelError::SemLocked);
            }
            inner.level -= 1;
            Ok(())
        })
    }

    /// Raise the level by one and wake a single FIFO waiter if any.
    pub fn post(&self) -> KernelResult<()> {
        let woken = self.with_locked(|inner| -> KernelResult<Option<scheduler::ThreadId>> {
            if !inner.init {
                return Err(KernelError::Uninitialized);
            }
            inner.level += 1;
            Ok(inner.waiters.delist().map(|node| node.data))
        })?;
        if let Some(id) = woken {
            scheduler::wake(id);
        }
        Ok(())
    }

    pub fn level(&self) -> KernelResult<i32> {
        self.with_locked(|inner| {
            if !inner.init {
                return Err(KernelError::Uninitialized);
            }
            Ok(inner.level)
        })
    }
}
