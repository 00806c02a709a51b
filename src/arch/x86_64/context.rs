/*
 * Raw thread context
 *
 * Isolates the one place in the kernel that knows the exact shape of a
 * CPU-switched stack frame. Everything outside this module talks about
 * threads in terms of an opaque saved stack pointer; nothing outside this
 * module is allowed to read or write `InterruptFrame`/`InterruptContext`
 * fields directly.
 *
 * The naked handlers below are the only two ways execution ever leaves a
 * thread involuntarily: the periodic timer tick (hardware) and a
 * voluntary yield (software, `int 0x81`). Both push the same register set
 * and hand a raw pointer to `scheduler::reschedule`, which returns the
 * stack pointer to resume; the handler loads it and `iretq`s into
 * whichever thread was chosen.
 */

use core::arch::naked_asm;

/// Registers the CPU pushes automatically on interrupt entry.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct InterruptFrame {
    pub rip: u64,
    pub cs: u64,
    pub rflags: u64,
    pub rsp: u64,
    pub ss: u64,
}

impl InterruptFrame {
    const fn fresh(rip: u64, rsp: u64) -> Self {
        Self {
            rip,
            cs: 0x08,
            rflags: 0x202,
            rsp,
            ss: 0x10,
        }
    }
}

/// Full saved context: general-purpose registers we push by hand, plus
/// the CPU-pushed interrupt frame. Layout matches what the naked handlers
/// below push/pop, in that exact order.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct InterruptContext {
    pub r15: u64,
    pub r14: u64,
    pub r13: u64,
    pub r12: u64,
    pub r11: u64,
    pub r10: u64,
    pub r9: u64,
    pub r8: u64,
    pub rbp: u64,
    pub rdi: u64,
    pub rsi: u64,
    pub rdx: u64,
    pub rcx: u64,
    pub rbx: u64,
    pub rax: u64,
    pub iret_frame: InterruptFrame,
}

/// Build the initial saved context for a brand-new thread: as if it had
/// just been interrupted right at `entry`, with `arg` in `rdi` (the
/// System V first-argument register) and an empty stack above
/// `stack_top`.
pub fn new_thread_context(entry: extern "C" fn(usize) -> !, arg: usize, stack_top: u64) -> InterruptContext {
    InterruptContext {
        r15: 0,
        r14: 0,
        r13: 0,
        r12: 0,
        r11: 0,
        r10: 0,
        r9: 0,
        r8: 0,
        rbp: 0,
        rdi: arg as u64,
        rsi: 0,
        rdx: 0,
        rcx: 0,
        rbx: 0,
        rax: 0,
        iret_frame: InterruptFrame::fresh(entry as usize as u64, stack_top),
    }
}

/// Entry point for voluntary context switches (`int 0x81`). Identical to
/// the timer handler except no EOI is needed for a software interrupt.
#[unsafe(naked)]
pub unsafe extern "C" fn yield_interrupt_handler() {
    naked_asm!(
        "push rax",
        "push rbx",
        "push rcx",
        "push rdx",
        "push rsi",
        "push rdi",
        "push rbp",
        "push r8",
        "push r9",
        "push r10",
        "push r11",
        "push r12",
        "push r13",
        "push r14",
        "push r15",
        "mov rdi, rsp",
        "call {reschedule}",
        "mov rsp, rax",
        "pop r15",
        "pop r14",
        "pop r13",
        "pop r12",
        "pop r11",
        "pop r10",
        "pop r9",
        "pop r8",
        "pop rbp",
        "pop rdi",
        "pop rsi",
        "pop rdx",
        "pop rcx",
        "pop rbx",
        "pop rax",
        "iretq",
        reschedule = sym crate::scheduler::reschedule,
    )
}

/// Entry point for the fixed panic vector (42): captures the full
/// register set exactly like a context switch would, then hands it to
/// the diagnostic dump instead of `reschedule`. Never returns.
#[unsafe(naked)]
pub unsafe extern "C" fn panic_interrupt_handler() {
    naked_asm!(
        "push rax",
        "push rbx",
        "push rcx",
        "push rdx",
        "push rsi",
        "push rdi",
        "push rbp",
        "push r8",
        "push r9",
        "push r10",
        "push r11",
        "push r12",
        "push r13",
        "push r14",
        "push r15",
        "mov rdi, rsp",
        "call {panic_entry}",
        panic_entry = sym panic_entry,
    )
}

extern "C" fn panic_entry(ctx_ptr: *const InterruptContext) -> ! {
    // SAFETY: built by the asm immediately above on entry to vector 42.
    let ctx = unsafe { &*ctx_ptr };
    crate::arch::x86_64::diagnostics::kernel_panic_with_context("software panic vector", 42, ctx)
}

/// Entry point for preemptive context switches driven by the periodic
/// timer tick (platform IRQ 0, remapped to vector 32).
#[unsafe(naked)]
pub unsafe extern "C" fn tick_interrupt_handler() {
    naked_asm!(
        "push rax",
        "push rbx",
        "push rcx",
        "push rdx",
        "push rsi",
        "push rdi",
        "push rbp",
        "push r8",
        "push r9",
        "push r10",
        "push r11",
        "push r12",
        "push r13",
        "push r14",
        "push r15",
        "mov rdi, rsp",
        "call {reschedule}",
        "mov rsp, rax",
        "pop r15",
        "pop r14",
        "pop r13",
        "pop r12",
        "pop r11",
        "pop r10",
        "pop r9",
        "pop r8",
        "pop rbp",
        "pop rdi",
        "pop rsi",
        "pop rdx",
        "pop rcx",
        "pop rbx",
        "pop rax",
        "push rax",
        "mov al, 0x20",
        "out 0x20, al",
        "pop rax",
        "iretq",
        reschedule = sym crate::scheduler::reschedule,
    )
}
