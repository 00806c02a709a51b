/*
 * Kernel heap
 *
 * Paging beyond the bootloader's identity map is out of scope for this
 * core, so the heap is just a statically-sized `.bss` region handed
 * directly to `linked_list_allocator::LockedHeap` rather than a
 * separately mapped virtual range.
 */

use linked_list_allocator::LockedHeap;

pub const HEAP_SIZE: usize = 8 * 1024 * 1024;

#[repr(align(4096))]
struct HeapRegion([u8; HEAP_SIZE]);

static mut HEAP_REGION: HeapRegion = HeapRegion([0; HEAP_SIZE]);

#[global_allocator]
static ALLOCATOR: LockedHeap = LockedHeap::empty();

pub fn init() {
    log::info!("initializing kernel heap: {} KiB", HEAP_SIZE / 1024);
    unsafe {
        let base = core::ptr::addr_of_mut!(HEAP_REGION) as *mut u8;
        ALLOCATOR.lock().init(base, HEAP_SIZE);
    }
    log::info!("kernel heap initialized");
}

#[alloc_error_handler]
fn alloc_error(_layout: core::alloc::Layout) -> ! {
    crate::arch::x86_64::diagnostics::kernel_panic("heap allocation failed")
}
