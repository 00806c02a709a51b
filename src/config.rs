/*
 * Boot-time tunables
 *
 * Collected here instead of scattered as magic numbers through the
 * scheduler and drivers, following the same convention the scheduler
 * module used for THREAD_STACK_SIZE/MAX_THREADS.
 */

/// Per-thread stack size, in machine words (8 bytes each on x86_64).
pub const THREAD_STACK_WORDS: usize = 2048;
/// Per-thread stack size, in bytes.
pub const THREAD_STACK_SIZE: usize = THREAD_STACK_WORDS * 8;

/// Maximum number of simultaneously live threads, including idle.
pub const MAX_THREADS: usize = 64;

/// Lowest (worst) priority value; reserved for the idle thread.
pub const PRIORITY_IDLE: u32 = 64;
/// Highest (best) priority value a schedulable thread may request.
pub const PRIORITY_HIGHEST: u32 = 0;
/// Priority assigned to threads that don't request one explicitly.
pub const PRIORITY_DEFAULT: u32 = 32;

/// Timer tick frequency, in Hz. Drives both uptime accounting and
/// preemption granularity.
pub const TIMER_FREQUENCY_HZ: u32 = 100;

/// Maximum bytes in a thread's display name (including data, no NUL).
pub const THREAD_NAME_MAX: usize = 32;
