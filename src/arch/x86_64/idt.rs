/*
 * Interrupt Descriptor Table
 *
 * Vector layout is fixed: 0..31 CPU exceptions, 32 the periodic timer
 * tick, 33 the software yield, 34..41 a small table of runtime-
 * registrable platform IRQ slots, 42 the panic vector, 255 spurious.
 * Everything in 43..254 is left unset.
 *
 * The eight platform-IRQ entries are generated by one macro invocation
 * over a const range rather than hand-written one at a time; each
 * generated trampoline differs only in which slot of `PLATFORM_IRQS` it
 * consults.
 */

use lazy_static::lazy_static;
use spin::Mutex;
use x86_64::structures::idt::{InterruptDescriptorTable, InterruptStackFrame};

use crate::arch::x86_64::context::{panic_interrupt_handler, tick_interrupt_handler, yield_interrupt_handler};
use crate::arch::x86_64::diagnostics::kernel_panic;
use crate::arch::x86_64::interrupts;
use crate::arch::x86_64::peripheral::pic;
use crate::error::{KernelError, KernelResult};

pub const PLATFORM_IRQ_BASE: u8 = 34;
pub const PLATFORM_IRQ_COUNT: usize = 8;
pub const PANIC_VECTOR: u8 = 42;

type IrqHandler = fn();

static PLATFORM_IRQS: Mutex<[Option<IrqHandler>; PLATFORM_IRQ_COUNT]> = Mutex::new([None; PLATFORM_IRQ_COUNT]);

/// Register a handler on platform IRQ slot `line` (0..PLATFORM_IRQ_COUNT).
pub fn register_irq(line: u8, handler: IrqHandler) -> KernelResult<()> {
    let idx = line as usize;
    if idx >= PLATFORM_IRQ_COUNT {
        return Err(KernelError::UnauthorizedLine);
    }
    let mut table = PLATFORM_IRQS.lock();
    if table[idx].is_some() {
        return Err(KernelError::AlreadyRegistered);
    }
    table[idx] = Some(handler);
    Ok(())
}

pub fn unregister_irq(line: u8) -> KernelResult<()> {
    let idx = line as usize;
    if idx >= PLATFORM_IRQ_COUNT {
        return Err(KernelError::UnauthorizedLine);
    }
    let mut table = PLATFORM_IRQS.lock();
    if table[idx].is_none() {
        return Err(KernelError::NotRegistered);
    }
    table[idx] = None;
    Ok(())
}

fn dispatch_platform_irq(line: u8, vector: u8) {
    if interrupts::depth() > 0 {
        log::warn!("platform IRQ {} masked at nesting depth {}", line, interrupts::depth());
        pic::end_of_interrupt(vector);
        return;
    }

    let handler = PLATFORM_IRQS.lock()[line as usize];
    match handler {
        Some(f) => f(),
        None => log::warn!("unhandled platform IRQ on line {}", line),
    }
    pic::end_of_interrupt(vector);
}

macro_rules! platform_irq_trampoline {
    ($name:ident, $line:expr, $vector:expr) => {
        extern "x86-interrupt" fn $name(_frame: InterruptStackFrame) {
            dispatch_platform_irq($line, $vector);
        }
    };
}

platform_irq_trampoline!(platform_irq_0, 0, 34);
platform_irq_trampoline!(platform_irq_1, 1, 35);
platform_irq_trampoline!(platform_irq_2, 2, 36);
platform_irq_trampoline!(platform_irq_3, 3, 37);
platform_irq_trampoline!(platform_irq_4, 4, 38);
platform_irq_trampoline!(platform_irq_5, 5, 39);
platform_irq_trampoline!(platform_irq_6, 6, 40);
platform_irq_trampoline!(platform_irq_7, 7, 41);

lazy_static! {
    static ref IDT: InterruptDescriptorTable = {
        let mut idt = InterruptDescriptorTable::new();

        idt.divide_error.set_handler_fn(trap_handler);
        idt.debug.set_handler_fn(silent_trap_handler);
        idt.non_maskable_interrupt.set_handler_fn(trap_handler);
        idt.breakpoint.set_handler_fn(silent_trap_handler);
        idt.overflow.set_handler_fn(trap_handler);
        idt.bound_range_exceeded.set_handler_fn(trap_handler);
        idt.invalid_opcode.set_handler_fn(trap_handler);
        idt.device_not_available.set_handler_fn(trap_handler);
        unsafe {
            idt.double_fault
                .set_handler_fn(double_fault_handler)
                .set_stack_index(crate::arch::x86_64::gdt::DOUBLE_FAULT_IST_INDEX);
        }
        idt.invalid_tss.set_handler_fn(trap_with_code_handler);
        idt.segment_not_present.set_handler_fn(trap_with_code_handler);
        idt.stack_segment_fault.set_handler_fn(trap_with_code_handler);
        idt.general_protection_fault.set_handler_fn(trap_with_code_handler);
        idt.page_fault.set_handler_fn(page_fault_handler);
        idt.x87_floating_point.set_handler_fn(trap_handler);
        idt.alignment_check.set_handler_fn(trap_with_code_handler);
        idt.machine_check.set_handler_fn(fatal_trap_handler);
        idt.simd_floating_point.set_handler_fn(trap_handler);
        idt.virtualization.set_handler_fn(trap_handler);
        idt.security_exception.set_handler_fn(trap_with_code_handler);

        unsafe {
            idt[32].set_handler_addr(core::mem::transmute::<*const (), x86_64::VirtAddr>(
                tick_interrupt_handler as *const (),
            ));
            idt[33].set_handler_addr(core::mem::transmute::<*const (), x86_64::VirtAddr>(
                yield_interrupt_handler as *const (),
            ));
            idt[42].set_handler_addr(core::mem::transmute::<*const (), x86_64::VirtAddr>(
                panic_interrupt_handler as *const (),
            ));
        }

        idt[34].set_handler_fn(platform_irq_0);
        idt[35].set_handler_fn(platform_irq_1);
        idt[36].set_handler_fn(platform_irq_2);
        idt[37].set_handler_fn(platform_irq_3);
        idt[38].set_handler_fn(platform_irq_4);
        idt[39].set_handler_fn(platform_irq_5);
        idt[40].set_handler_fn(platform_irq_6);
        idt[41].set_handler_fn(platform_irq_7);

        idt[255].set_handler_fn(spurious_handler);

        idt
    };
}

pub fn init() {
    IDT.load();
    log::info!("IDT loaded");
}

extern "x86-interrupt" fn trap_handler(frame: InterruptStackFrame) {
    log::error!("unhandled CPU trap at {:#x}", frame.instruction_pointer.as_u64());
    kernel_panic("unhandled CPU trap");
}

extern "x86-interrupt" fn silent_trap_handler(_frame: InterruptStackFrame) {
    // Debug/breakpoint exceptions are benign when no debugger is attached.
}

extern "x86-interrupt" fn trap_with_code_handler(frame: InterruptStackFrame, error_code: u64) {
    log::error!(
        "unhandled CPU trap at {:#x}, error code {:#x}",
        frame.instruction_pointer.as_u64(),
        error_code
    );
    kernel_panic("unhandled CPU trap with error code");
}

extern "x86-interrupt" fn fatal_trap_handler(_frame: InterruptStackFrame) -> ! {
    kernel_panic("fatal CPU trap");
}

extern "x86-interrupt" fn double_fault_handler(_frame: InterruptStackFrame, _error_code: u64) -> ! {
    kernel_panic("double fault");
}

extern "x86-interrupt" fn page_fault_handler(
    frame: InterruptStackFrame,
    error_code: x86_64::structures::idt::PageFaultErrorCode,
) {
    use x86_64::registers::control::Cr2;
    let fault_addr = Cr2::read().map(|a| a.as_u64()).unwrap_or(0);
    log::error!(
        "page fault at {:#x} (rip {:#x}), code {:?}",
        fault_addr,
        frame.instruction_pointer.as_u64(),
        error_code
    );
    kernel_panic("unrecoverable page fault");
}

extern "x86-interrupt" fn spurious_handler(_frame: InterruptStackFrame) {
    // The 8259 itself never raises vector 255; nothing to acknowledge.
}
