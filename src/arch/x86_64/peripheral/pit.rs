/*
 * Programmable Interval Timer
 *
 * `arm` is the single entry point: it remaps the PIC and programs the PIT
 * divisor as one sequence with interrupts held disabled throughout,
 * rather than two independently-callable steps. Calling PIC remap and PIT
 * programming separately leaves a window where a stray IRQ0 can fire
 * against a PIC that's been remapped but a PIT that hasn't been reloaded
 * yet (or vice versa); since nothing else needs to observe PIC/PIT state
 * mid-sequence, there's no reason to expose that window.
 */

use x86_64::instructions::port::Port;

use super::pic;

const PIT_FREQUENCY_HZ: u32 = 1_193_182;
const PIT_CHANNEL0: u16 = 0x40;
const PIT_COMMAND: u16 = 0x43;

/// Remap the PIC and arm channel 0 of the PIT to fire at `frequency_hz`,
/// routed through vector 32. Must be called with interrupts disabled and
/// before the caller enables them.
pub fn arm(frequency_hz: u32) {
    pic::init();

    let divisor = (PIT_FREQUENCY_HZ / frequency_hz).clamp(1, u16::MAX as u32) as u16;

    unsafe {
        let mut command: Port<u8> = Port::new(PIT_COMMAND);
        let mut channel0: Port<u8> = Port::new(PIT_CHANNEL0);

        command.write(0x36u8); // channel 0, lobyte/hibyte, mode 3 (square wave)
        channel0.write((divisor & 0xFF) as u8);
        channel0.write((divisor >> 8) as u8);
    }

    log::info!("PIT armed at {} Hz (divisor {})", frequency_hz, divisor);
}
