/*
 * Platform peripherals
 *
 * The narrow set of hardware this core actually touches: the 8259 IRQ
 * controller, the PIT timer source, and a COM1 console sink for the
 * logger and panic dump. No framebuffer, no keyboard: those belong to a
 * full OS, not a scheduler core.
 */

use spin::Mutex;

use self::uart_16550::SerialPort;

pub mod pic;
pub mod pit;
pub mod uart_16550;

pub const COM1_BASE: u16 = 0x3F8;

pub static COM1: Mutex<SerialPort> = Mutex::new(SerialPort::new(COM1_BASE));

/// Bring up the console sink. Safe to call before logging is configured.
pub fn init_console() {
    COM1.lock().init();
}

pub fn console_putc(byte: u8) {
    COM1.lock().write(byte);
}
