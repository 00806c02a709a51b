/*
 * Kernel entry point
 *
 * Single-core boot: `_start` switches onto a static kernel stack and
 * jumps straight into `kernel_main`. No bootloader protocol parsing, no
 * AP/BSP discrimination — SMP bring-up is out of scope for this core.
 */

#![no_std]
#![no_main]
#![feature(abi_x86_interrupt)]
#![feature(alloc_error_handler)]
#![allow(dead_code)]

extern crate alloc;

use core::panic::PanicInfo;

mod arch;
mod config;
mod error;
mod memory;
mod scheduler;
mod sync;
#[macro_use]
mod utils;
mod tests;

const BOOT_STACK_SIZE: usize = 64 * 1024;

#[repr(C, align(16))]
struct BootStack([u8; BOOT_STACK_SIZE]);

#[unsafe(no_mangle)]
static mut BOOT_STACK: BootStack = BootStack([0; BOOT_STACK_SIZE]);

#[unsafe(naked)]
#[unsafe(no_mangle)]
pub unsafe extern "C" fn _start() -> ! {
    core::arch::naked_asm!(
        "lea rax, [rip + BOOT_STACK]",
        "add rax, {stack_size}",
        "mov rsp, rax",
        "jmp kernel_main",
        stack_size = const BOOT_STACK_SIZE,
    );
}

#[unsafe(no_mangle)]
pub extern "C" fn kernel_main() -> ! {
    utils::debug::init_debug_infrastructure();
    utils::debug::logger::init(true);
    log::info!("kernel starting");

    arch::x86_64::gdt::init();
    arch::x86_64::idt::init();

    memory::init();

    scheduler::init();

    arch::x86_64::interrupts::disable();
    arch::x86_64::peripheral::pit::arm(config::TIMER_FREQUENCY_HZ);
    scheduler::enable();
    arch::x86_64::interrupts::enable();
    log::info!("preemptive scheduler enabled");

    tests::run_self_tests();

    loop {
        x86_64::instructions::hlt();
    }
}

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    arch::x86_64::interrupts::disable();

    if let Some(location) = info.location() {
        log::error!(
            "PANIC at {}:{}: {}",
            location.file(),
            location.line(),
            info.message()
        );
    } else {
        log::error!("PANIC: {}", info.message());
    }

    loop {
        x86_64::instructions::hlt();
    }
}
