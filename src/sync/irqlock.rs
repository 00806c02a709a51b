/*
 * Interrupt-nesting lock
 *
 * On a uniprocessor there is nothing to spin on: the only thing that can
 * corrupt a critical section is this same CPU taking an interrupt midway
 * through it. "Locking" here just means disabling interrupts through the
 * nesting-depth counter in arch::x86_64::interrupts — the scheduler's
 * bookkeeping and every blocking primitive's inner state go through this
 * so a preempting tick can never find their spinlock already held by the
 * thread it just interrupted.
 */

use crate::arch::x86_64::interrupts;

/// Enter a critical section. Disables interrupts on first entry; nested
/// calls only increment the shared depth counter.
pub fn lock() {
    interrupts::disable();
}

/// Leave a critical section entered via `lock()`.
pub fn unlock() {
    interrupts::enable();
}

/// Current nesting depth, for diagnostics.
pub fn depth() -> usize {
    interrupts::depth()
}

/// Run `f` with the nesting lock held, releasing it even if `f` panics
/// by virtue of running to completion first (kernel panics never unwind).
pub fn with_locked<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    lock();
    let r = f();
    unlock();
    r
}
