/*
 * Serial console writer
 *
 * `fmt::Write` adapter over the COM1 console sink, used by `serial_println!`
 * and the logger. Every write takes the port's lock for its duration.
 */

use core::fmt;
use spin::MutexGuard;

use crate::arch::x86_64::peripheral::uart_16550::SerialPort;
use crate::arch::x86_64::peripheral::COM1;

pub struct Writer<'a> {
    serial: MutexGuard<'a, SerialPort>,
}

impl<'a> Writer<'a> {
    pub fn new() -> Writer<'a> {
        Writer { serial: COM1.lock() }
    }

    pub fn write(&mut self, byte: u8) {
        self.serial.write(byte);
    }
}

impl<'a> fmt::Write for Writer<'a> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for byte in s.bytes() {
            self.write(byte);
        }
        Ok(())
    }
}
