//! Process heap: `malloc` and friends on top of [`UserHeap`].
//!
//! The heap covers [`USER_HEAP_START`]..[`USER_HEAP_MAX`] and is built on the
//! first `malloc`. Every allocation is a whole number of pages; the kernel
//! maps them in response to [`Sysno::AllocateMem`](crate::syscall_abi::Sysno::AllocateMem).

use crate::syscall::{sys_allocate_mem, sys_free_mem};
use core::ptr::{self, NonNull};
use kernel_info::memory::{USER_HEAP_MAX, USER_HEAP_START};
use kernel_memory_addresses::VirtualAddress;
use kernel_sync::SpinLock;
use user_heap::{Backing, UserHeap};

/// Forwards backing requests to the kernel.
struct SyscallBacking;

impl Backing for SyscallBacking {
    fn request_backing(&mut self, va: VirtualAddress, size: u64) {
        sys_allocate_mem(va.as_u64(), size);
    }

    fn release_backing(&mut self, va: VirtualAddress, size: u64) {
        sys_free_mem(va.as_u64(), size);
    }
}

static HEAP: SpinLock<UserHeap> = SpinLock::new(UserHeap::new(
    VirtualAddress::new(USER_HEAP_START),
    VirtualAddress::new(USER_HEAP_MAX),
));

/// Allocate at least `size` bytes, page aligned.
///
/// Returns `None` for a zero `size` or when the heap is exhausted.
#[must_use]
pub fn malloc(size: usize) -> Option<NonNull<u8>> {
    let va = HEAP
        .with_lock(|heap| heap.allocate(&mut SyscallBacking, size as u64))
        .ok()?;
    let addr = usize::try_from(va.as_u64()).ok()?;
    NonNull::new(ptr::with_exposed_provenance_mut(addr))
}

/// Release memory returned by [`malloc`]. Null and foreign pointers are
/// ignored.
pub fn free(ptr: *mut u8) {
    let va = VirtualAddress::new(ptr.expose_provenance() as u64);
    HEAP.with_lock(|heap| heap.free(&mut SyscallBacking, va));
}

/// Not supported.
///
/// # Panics
/// Always.
pub fn realloc(ptr: *mut u8, new_size: usize) -> ! {
    let va = VirtualAddress::new(ptr.expose_provenance() as u64);
    let Err(err) = HEAP.with_lock(|heap| heap.reallocate(va, new_size as u64));
    panic!("{err}");
}

/// Shared memory is not supported.
///
/// # Panics
/// Always.
pub fn smalloc(name: &str, size: usize, writable: bool) -> ! {
    let Err(err) = HEAP.with_lock(|heap| heap.shared_allocate(name, size as u64, writable));
    panic!("{err}");
}

/// Shared memory is not supported.
///
/// # Panics
/// Always.
pub fn sget(owner: u32, name: &str) -> ! {
    let Err(err) = HEAP.with_lock(|heap| heap.shared_get(owner, name));
    panic!("{err}");
}

/// Shared memory is not supported.
///
/// # Panics
/// Always.
pub fn sfree(ptr: *mut u8) -> ! {
    let va = VirtualAddress::new(ptr.expose_provenance() as u64);
    let Err(err) = HEAP.with_lock(|heap| heap.shared_free(va));
    panic!("{err}");
}
