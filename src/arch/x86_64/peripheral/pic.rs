/*
 * 8259 IRQ controller
 *
 * Thin wrapper around the `pic8259` crate's chained-PIC remap, offset so
 * IRQ0 (the timer) lands on vector 32. Everything above IRQ1 is masked;
 * this kernel has no keyboard or cascade-slave peripherals, only the
 * timer and the eight software-registrable platform IRQ slots.
 */

use pic8259::ChainedPics;
use spin::Mutex;

pub const MASTER_OFFSET: u8 = 32;
pub const SLAVE_OFFSET: u8 = 40;

static PICS: Mutex<ChainedPics> =
    Mutex::new(unsafe { ChainedPics::new(MASTER_OFFSET, SLAVE_OFFSET) });

/// Remap both PICs and mask every line except the timer (IRQ0).
pub fn init() {
    unsafe {
        PICS.lock().initialize();
    }
    mask_all_except_timer();
    log::info!("PIC remapped: master={}, slave={}", MASTER_OFFSET, SLAVE_OFFSET);
}

fn mask_all_except_timer() {
    use x86_64::instructions::port::Port;
    unsafe {
        let mut master_data: Port<u8> = Port::new(0x21);
        let mut slave_data: Port<u8> = Port::new(0xA1);
        master_data.write(0xFEu8); // all master lines masked except IRQ0
        slave_data.write(0xFFu8);
    }
}

pub fn end_of_interrupt(vector: u8) {
    unsafe {
        PICS.lock().notify_end_of_interrupt(vector);
    }
}
