//! # Memory Layout

/// Allocation granularity of both heaps.
pub const PAGE_SIZE: u64 = 4096;

/// End of userspace VA range after which Kernel space begins.
pub const LAST_USERSPACE_ADDRESS: u64 = 0xffff_0000_0000_0000;

/// A simple Higher Half Direct Map (HHDM) base.
pub const HHDM_BASE: u64 = 0xffff_8880_0000_0000;

/// Where the kernel executes (VMA), matches the linker script.
pub const KERNEL_BASE: u64 = 0xffff_ffff_8000_0000;

/// First virtual address of the kernel heap.
pub const KERNEL_HEAP_START: u64 = 0xffff_c000_0000_0000;

/// Exclusive end of the kernel heap (64 MiB).
pub const KERNEL_HEAP_MAX: u64 = KERNEL_HEAP_START + 64 * 1024 * 1024;

/// Number of pages in the kernel heap; also the capacity of its allocation table.
#[allow(clippy::cast_possible_truncation)]
pub const KERNEL_HEAP_PAGES: usize = ((KERNEL_HEAP_MAX - KERNEL_HEAP_START) / PAGE_SIZE) as usize;

/// First virtual address of a process's user heap.
pub const USER_HEAP_START: u64 = 0x0000_0000_8000_0000;

/// Exclusive end of a process's user heap (512 MiB).
pub const USER_HEAP_MAX: u64 = 0x0000_0000_a000_0000;

/// Number of pages in the user heap; also the capacity of its block table.
#[allow(clippy::cast_possible_truncation)]
pub const USER_HEAP_PAGES: usize = ((USER_HEAP_MAX - USER_HEAP_START) / PAGE_SIZE) as usize;

/// Capacity of the user heap's allocation record table.
pub const MAX_USER_ALLOCATIONS: usize = 1024;

const _: () = {
    assert!(PAGE_SIZE.is_power_of_two());
    assert!(KERNEL_HEAP_START.is_multiple_of(PAGE_SIZE));
    assert!(KERNEL_HEAP_MAX.is_multiple_of(PAGE_SIZE));
    assert!(KERNEL_HEAP_START > HHDM_BASE);
    assert!(KERNEL_HEAP_MAX <= KERNEL_BASE);
    assert!(USER_HEAP_START.is_multiple_of(PAGE_SIZE));
    assert!(USER_HEAP_MAX.is_multiple_of(PAGE_SIZE));
    assert!(USER_HEAP_START > 0);
    assert!(USER_HEAP_MAX > USER_HEAP_START);
    assert!(USER_HEAP_MAX <= LAST_USERSPACE_ADDRESS);
    assert!(MAX_USER_ALLOCATIONS > 0);
};
