/*
 * Interrupt control
 *
 * `disable`/`enable` maintain a saturating nesting-depth counter over the
 * raw CLI/STI instructions: the first `disable()` call actually clears IF,
 * nested calls just bump the depth, and IF comes back only once the depth
 * unwinds to zero, and only if it was set before the outermost call. This
 * is the single counter shared by every critical section in the kernel —
 * `sync::irqlock` and the blocking primitives' inner locks are built
 * directly on top of it rather than keeping a second counter of their own.
 */

use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use x86_64::instructions::interrupts as cpu;

static DEPTH: AtomicUsize = AtomicUsize::new(0);
/// Whether interrupts were enabled at the outermost `disable()` call; only
/// that call's matching `enable()` is allowed to turn them back on.
static RESTORE: AtomicBool = AtomicBool::new(false);

/// Check if interrupts are currently enabled at the CPU level.
pub fn are_enabled() -> bool {
    cpu::are_enabled()
}

/// Enter a disabled-interrupt section. Disables interrupts on first entry;
/// nested calls only increment the depth counter.
pub fn disable() {
    let were_enabled = cpu::are_enabled();
    if were_enabled {
        cpu::disable();
    }
    if DEPTH.fetch_add(1, Ordering::SeqCst) == 0 {
        RESTORE.store(were_enabled, Ordering::SeqCst);
    }
}

/// Leave a disabled-interrupt section entered via `disable()`. Interrupts
/// come back once the nesting depth returns to zero, but only if they were
/// enabled when the outermost `disable()` ran.
pub fn enable() {
    let prev = DEPTH.fetch_sub(1, Ordering::SeqCst);
    if prev == 1 && RESTORE.load(Ordering::SeqCst) {
        cpu::enable();
    }
}

/// Current nesting depth, shared by every critical section in the kernel.
pub fn depth() -> usize {
    DEPTH.load(Ordering::SeqCst)
}

/// Execute a closure with interrupts disabled
///
/// This is useful for creating atomic sections of code that must not
/// be interrupted by hardware events.
pub fn without_interrupts<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    disable();
    let r = f();
    enable();
    r
}

/// RAII guard that disables interrupts for its lifetime
///
/// Interrupts are disabled when this guard is created and restored
/// according to the shared nesting-depth counter when it's dropped.
pub struct DisableInterrupts;

impl DisableInterrupts {
    /// Create a new interrupt guard, disabling interrupts.
    pub fn new() -> Self {
        disable();
        Self
    }
}

impl Drop for DisableInterrupts {
    fn drop(&mut self) {
        enable();
    }
}
