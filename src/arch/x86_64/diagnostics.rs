/*
 * Fixed-format panic dump
 *
 * The one place that turns an unrecoverable kernel condition into console
 * output and a halt. Used both by the language-level `#[panic_handler]`
 * in `main` and by `kernel_panic`, the escape hatch internal invariant
 * violations use instead of propagating a `Result`.
 */

use bitflags::bitflags;

use crate::arch::x86_64::context::InterruptContext;

bitflags! {
    /// Named RFLAGS bits, decomposed for the dump instead of manual shifts.
    #[derive(Debug, Clone, Copy)]
    pub struct RFlags: u64 {
        const CF   = 1 << 0;
        const PF   = 1 << 2;
        const AF   = 1 << 4;
        const ZF   = 1 << 6;
        const SF   = 1 << 7;
        const TF   = 1 << 8;
        const IF   = 1 << 9;
        const DF   = 1 << 10;
        const OF   = 1 << 11;
        const IOPL_LOW  = 1 << 12;
        const IOPL_HIGH = 1 << 13;
        const NT   = 1 << 14;
        const RF   = 1 << 16;
        const VM   = 1 << 17;
        const AC   = 1 << 18;
        const VIF  = 1 << 19;
        const VIP  = 1 << 20;
        const ID   = 1 << 21;
    }
}

fn current_rflags() -> u64 {
    let rflags: u64;
    unsafe {
        core::arch::asm!("pushfq", "pop {}", out(reg) rflags, options(nomem, preserves_flags));
    }
    rflags
}

/// Dump everything the handler at `vector` captured, then halt forever.
/// Called from the fixed panic vector and from trap handlers that caught
/// something unrecoverable; never returns.
pub fn kernel_panic_with_context(reason: &str, vector: u8, ctx: &InterruptContext) -> ! {
    crate::arch::x86_64::interrupts::disable();

    let flags = RFlags::from_bits_truncate(ctx.iret_frame.rflags);
    log::error!("=== KERNEL PANIC ===");
    log::error!("reason: {}", reason);
    log::error!("vector: {}", vector);
    log::error!("rip={:#018x} cs={:#x} rflags={:#018x} rsp={:#018x} ss={:#x}",
        ctx.iret_frame.rip, ctx.iret_frame.cs, ctx.iret_frame.rflags, ctx.iret_frame.rsp, ctx.iret_frame.ss);
    log::error!("rflags decoded: {:?}", flags);
    log::error!(
        "rax={:#018x} rbx={:#018x} rcx={:#018x} rdx={:#018x}",
        ctx.rax, ctx.rbx, ctx.rcx, ctx.rdx
    );
    log::error!(
        "rsi={:#018x} rdi={:#018x} rbp={:#018x}",
        ctx.rsi, ctx.rdi, ctx.rbp
    );
    log::error!(
        "r8={:#018x} r9={:#018x} r10={:#018x} r11={:#018x}",
        ctx.r8, ctx.r9, ctx.r10, ctx.r11
    );
    log::error!(
        "r12={:#018x} r13={:#018x} r14={:#018x} r15={:#018x}",
        ctx.r12, ctx.r13, ctx.r14, ctx.r15
    );
    log::error!("current thread: {}", crate::scheduler::current_thread_id());

    loop {
        x86_64::instructions::hlt();
    }
}

/// Variant for callers with no saved interrupt frame on hand (an internal
/// invariant check in ordinary kernel code). Dumps what's available:
/// RFLAGS and scheduler state, no general-purpose registers.
pub fn kernel_panic(reason: &str) -> ! {
    crate::arch::x86_64::interrupts::disable();

    let rflags = current_rflags();
    let flags = RFlags::from_bits_truncate(rflags);
    log::error!("=== KERNEL PANIC ===");
    log::error!("reason: {}", reason);
    log::error!("rflags={:#018x} decoded: {:?}", rflags, flags);
    log::error!("current thread: {}", crate::scheduler::current_thread_id());

    loop {
        x86_64::instructions::hlt();
    }
}
