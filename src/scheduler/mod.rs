/*
 * Preemptive priority scheduler
 *
 * Threads are held in one global table; which ones are runnable is
 * tracked by a priority waiter list (`sync::list`) rather than a plain
 * FIFO, so `select_next` always hands the CPU to the lowest-numbered
 * (most urgent) ready thread, breaking ties in arrival order. A periodic
 * timer tick and a voluntary `int 0x81` both funnel into the same
 * `reschedule` entry point via the naked handlers in
 * `arch::x86_64::context`.
 *
 * Sleeping and blocked threads are not in the ready list at all; they're
 * found by scanning the thread table (acceptable at this scale — see
 * MAX_THREADS) and moved back into the ready list by `reschedule`'s
 * sleep-expiry sweep or by an explicit `wake()` call from a primitive.
 */

pub mod thread;

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use spin::Mutex;

use crate::arch::x86_64::context::{new_thread_context, InterruptContext};
use crate::config::{MAX_THREADS, PRIORITY_IDLE, THREAD_STACK_SIZE};
use crate::error::{KernelError, KernelResult};
use crate::sync::irqlock;
use crate::sync::list::List;

pub use thread::{BlockKind, ThreadId, ThreadState};
use thread::Thread;

const BOOT_ID: ThreadId = ThreadId(0);

struct Scheduler {
    threads: Vec<Thread>,
    ready: List<ThreadId>,
    next_id: u32,
}

impl Scheduler {
    fn new() -> Self {
        Self {
            threads: Vec::new(),
            ready: List::new(),
            next_id: 1,
        }
    }

    fn find_mut(&mut self, id: ThreadId) -> Option<&mut Thread> {
        self.threads.iter_mut().find(|t| t.id == id)
    }

    fn find(&self, id: ThreadId) -> Option<&Thread> {
        self.threads.iter().find(|t| t.id == id)
    }
}

static SCHEDULER: Mutex<Option<Scheduler>> = Mutex::new(None);
static CURRENT: AtomicU32 = AtomicU32::new(BOOT_ID.0);
static ENABLED: AtomicBool = AtomicBool::new(false);
static UPTIME_MS: AtomicU64 = AtomicU64::new(0);

/// Run `f` against the scheduler's bookkeeping with interrupts disabled
/// for the duration, so a preempting tick can never find this spinlock
/// already held by the thread it just interrupted.
fn with_scheduler<R>(f: impl FnOnce(&mut Scheduler) -> R) -> R {
    irqlock::with_locked(|| {
        let mut guard = SCHEDULER.lock();
        let sched = guard.as_mut().expect("scheduler not initialized");
        f(sched)
    })
}

pub fn init() {
    *SCHEDULER.lock() = Some(Scheduler::new());
    log::info!("scheduler initialized");
}

pub fn uptime_ms() -> u64 {
    UPTIME_MS.load(Ordering::SeqCst)
}

pub fn current_thread_id() -> ThreadId {
    ThreadId(CURRENT.load(Ordering::SeqCst))
}

/// Create a new thread at the given priority (0 = highest, 64 = idle-only).
/// The thread starts Ready and is placed on the run queue immediately.
pub fn spawn(name: &str, priority: u32, entry: fn(usize), arg: usize) -> KernelResult<ThreadId> {
    if priority > PRIORITY_IDLE {
        return Err(KernelError::ForbiddenPriority);
    }

    let mut stack = alloc::vec![0u8; THREAD_STACK_SIZE].into_boxed_slice();
    let stack_top = stack.as_mut_ptr() as u64 + THREAD_STACK_SIZE as u64;

    // Pack (entry, arg) so the extern "C" trampoline can recover both from
    // the single argument register the initial context sets up.
    let packed = Box::new((entry, arg));
    let packed_ptr = Box::into_raw(packed) as usize;

    let context = new_thread_context(entry_trampoline, packed_ptr, stack_top);

    let (id, caller_priority) = with_scheduler(|sched| {
        let caller_id = current_thread_id();
        let caller_priority = sched.find(caller_id).map(|t| t.priority);
        let ppid = if caller_id == BOOT_ID { None } else { Some(caller_id) };

        let id = ThreadId(sched.next_id);
        sched.next_id += 1;
        let thread = Thread::new(id, name, priority, stack, context, ppid);
        sched.threads.push(thread);
        sched.ready.enlist(List::new_node(priority, id));
        (id, caller_priority)
    });

    log::debug!("spawned thread {} '{}' at priority {}", id, name, priority);

    // A strictly higher-priority thread preempts immediately rather than
    // waiting for the next timer tick to elect it.
    if let Some(caller_priority) = caller_priority {
        if priority < caller_priority {
            yield_now();
        }
    }

    Ok(id)
}

extern "C" fn entry_trampoline(packed_ptr: usize) -> ! {
    // SAFETY: constructed and leaked by `spawn` above, consumed exactly once.
    let packed = unsafe { Box::from_raw(packed_ptr as *mut (fn(usize), usize)) };
    let (entry, arg) = *packed;
    entry(arg);
    exit(0);
}

/// Spawn the idle thread. Called once by `enable()`.
fn spawn_idle() -> ThreadId {
    spawn("idle", PRIORITY_IDLE, idle_main, 0).expect("idle thread must spawn")
}

fn idle_main(_arg: usize) {
    loop {
        x86_64::instructions::hlt();
    }
}

/// Enable preemptive scheduling: spawns idle and arms the tick.
pub fn enable() {
    spawn_idle();
    ENABLED.store(true, Ordering::SeqCst);
    log::info!("preemptive scheduler enabled");
}

pub fn is_enabled() -> bool {
    ENABLED.load(Ordering::SeqCst)
}

/// Voluntarily give up the CPU via the software-interrupt path.
pub fn yield_now() {
    if !ENABLED.load(Ordering::SeqCst) {
        return;
    }
    if !crate::arch::x86_64::interrupts::are_enabled() {
        return;
    }
    unsafe {
        core::arch::asm!("int 0x81", options(nostack));
    }
}

/// Put the current thread to sleep for `ms` milliseconds.
pub fn sleep_ms(ms: u64) {
    if !ENABLED.load(Ordering::SeqCst) {
        let start = uptime_ms();
        while uptime_ms().saturating_sub(start) < ms {
            x86_64::instructions::hlt();
        }
        return;
    }

    let me = current_thread_id();
    if me == BOOT_ID {
        return;
    }

    with_scheduler(|sched| {
        if let Some(thread) = sched.find_mut(me) {
            thread.state = ThreadState::Sleeping;
            thread.wakeup_deadline_ms = Some(uptime_ms() + ms);
        }
    });

    yield_now();
}

/// Remove the current thread from scheduling and mark it blocked on
/// `kind`. The caller is responsible for having already enlisted itself
/// on the relevant primitive's wait list before calling this.
pub fn block_current(kind: BlockKind) {
    let me = current_thread_id();
    if me == BOOT_ID {
        return;
    }
    with_scheduler(|sched| {
        if let Some(thread) = sched.find_mut(me) {
            thread.state = ThreadState::Blocked;
            thread.block_kind = Some(kind);
        }
    });
    yield_now();
}

/// Move a blocked or sleeping thread back onto the run queue. Safe to
/// call from interrupt context.
pub fn wake(id: ThreadId) {
    with_scheduler(|sched| {
        if let Some(thread) = sched.find_mut(id) {
            if thread.state == ThreadState::Blocked || thread.state == ThreadState::Sleeping {
                thread.state = ThreadState::Ready;
                thread.block_kind = None;
                thread.wakeup_deadline_ms = None;
                sched.ready.enlist(List::new_node(thread.priority, id));
            }
        }
    });
}

/// Block the calling thread until `target` exits, returning its exit code.
pub fn join(target: ThreadId) -> KernelResult<i32> {
    loop {
        let outcome = with_scheduler(|sched| {
            let thread = sched.find(target).ok_or(KernelError::NoSuchId)?;
            match thread.state {
                ThreadState::Zombie => Ok(Some(thread.retval.unwrap_or(0))),
                ThreadState::Dead => Err(KernelError::NoSuchId),
                _ => Ok(None),
            }
        })?;

        match outcome {
            Some(code) => {
                with_scheduler(|sched| {
                    if let Some(thread) = sched.find_mut(target) {
                        thread.state = ThreadState::Dead;
                    }
                });
                return Ok(code);
            }
            None => {
                let me = current_thread_id();
                with_scheduler(|sched| -> KernelResult<()> {
                    if let Some(thread) = sched.find_mut(target) {
                        if thread.joiner.is_some() && thread.joiner != Some(me) {
                            return Err(KernelError::AlreadyRegistered);
                        }
                        thread.joiner = Some(me);
                    }
                    if let Some(thread) = sched.find_mut(me) {
                        thread.state = ThreadState::Joining;
                    }
                    Ok(())
                })?;
                yield_now();
            }
        }
    }
}

/// Terminate the current thread with `code`, waking its joiner if any.
pub fn exit(code: i32) -> ! {
    let me = current_thread_id();
    if me == BOOT_ID {
        panic!("cannot exit idle/boot context");
    }

    let joiner = with_scheduler(|sched| {
        let joiner = sched.find(me).and_then(|t| t.joiner);
        if let Some(thread) = sched.find_mut(me) {
            thread.state = ThreadState::Zombie;
            thread.retval = Some(code);
        }
        joiner
    });

    if let Some(joiner) = joiner {
        wake(joiner);
    }

    yield_now();
    unreachable!("exited thread was rescheduled");
}

pub fn thread_count() -> usize {
    with_scheduler(|sched| sched.threads.len())
}

#[derive(Debug, Clone, Copy)]
pub struct ThreadStats {
    pub id: ThreadId,
    pub priority: u32,
    pub state: ThreadState,
    pub cpu_time_ms: u64,
}

pub fn stats() -> Vec<ThreadStats> {
    with_scheduler(|sched| {
        sched
            .threads
            .iter()
            .map(|t| ThreadStats {
                id: t.id,
                priority: t.priority,
                state: t.state,
                cpu_time_ms: t.cpu_time_ms,
            })
            .collect()
    })
}

/// Called once per timer tick (from `arch::x86_64::peripheral::pit`) to
/// advance the uptime clock, independent of whether a reschedule happens.
fn advance_clock() -> u64 {
    let ms_per_tick = 1000 / crate::config::TIMER_FREQUENCY_HZ as u64;
    UPTIME_MS.fetch_add(ms_per_tick, Ordering::SeqCst) + ms_per_tick
}

/// Called from the naked tick/yield handlers with a pointer to the
/// interrupted thread's saved context. Picks the next thread to run and
/// returns a pointer to its saved context, to be loaded into `rsp`.
///
/// Runs with interrupts disabled and must not block.
#[unsafe(no_mangle)]
pub extern "C" fn reschedule(current_ctx_ptr: *const InterruptContext) -> *const InterruptContext {
    let now = advance_clock();

    if !ENABLED.load(Ordering::SeqCst) {
        return current_ctx_ptr;
    }

    let current_id = current_thread_id();

    irqlock::with_locked(|| {
        let mut guard = SCHEDULER.lock();
        let sched = match guard.as_mut() {
            Some(s) => s,
            None => return current_ctx_ptr,
        };

        // Wake any sleepers whose deadline has passed.
        let mut woken = Vec::new();
        for thread in sched.threads.iter_mut() {
            if thread.state == ThreadState::Sleeping {
                if let Some(deadline) = thread.wakeup_deadline_ms {
                    if now >= deadline {
                        thread.state = ThreadState::Ready;
                        thread.wakeup_deadline_ms = None;
                        woken.push(thread.id);
                    }
                }
            }
        }
        for id in woken {
            if let Some(thread) = sched.find(id) {
                sched.ready.enlist(List::new_node(thread.priority, id));
            }
        }

        // Save the outgoing thread's context and re-enlist it if still runnable.
        if current_id != BOOT_ID {
            if let Some(thread) = sched.find_mut(current_id) {
                // SAFETY: current_ctx_ptr points at a live InterruptContext the
                // naked handler just built on the interrupted thread's stack.
                thread.context = unsafe { *current_ctx_ptr };

                if thread.last_scheduled_ms > 0 {
                    let elapsed = now.saturating_sub(thread.last_scheduled_ms);
                    thread.cpu_time_ms = thread.cpu_time_ms.saturating_add(elapsed);
                }

                if thread.state == ThreadState::Elected {
                    thread.state = ThreadState::Ready;
                    sched.ready.enlist(List::new_node(thread.priority, current_id));
                }
                // Sleeping, Blocked, Joining, Zombie threads stay off the run queue.
            }
        }

        let next_id = match sched.ready.delist() {
            Some(node) => node.data,
            None => return current_ctx_ptr,
        };

        match sched.find_mut(next_id) {
            Some(thread) => {
                thread.state = ThreadState::Elected;
                thread.last_scheduled_ms = now;
                CURRENT.store(next_id.0, Ordering::SeqCst);
                &thread.context as *const InterruptContext
            }
            None => current_ctx_ptr,
        }
    })
}
