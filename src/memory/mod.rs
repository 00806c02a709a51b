/*
 * Memory management
 *
 * Scoped down to exactly what the scheduler core needs: a kernel heap.
 * Physical frame accounting and virtual memory management belong to a
 * full OS and are explicitly out of scope here — the bootloader's
 * identity map is assumed sufficient for the kernel's own addresses.
 */

pub mod heap;

pub fn init() {
    heap::init();
}
