//! # Static Heap
//!
//! The process-wide kernel heap over
//! [`KERNEL_HEAP_START`]..[`KERNEL_HEAP_MAX`], guarded by a [`SpinLock`].
//!
//! The heap needs the kernel's page tables and frame pool to do anything.
//! Those are handed over once during boot with [`install_adapter`]; until
//! then every allocation fails.

use crate::kheap::KernelHeap;
use crate::translate;
use crate::vmm::Vmm;
use kernel_info::memory::{KERNEL_HEAP_MAX, KERNEL_HEAP_START};
use kernel_memory_addresses::{PhysicalAddress, VirtualAddress};
use kernel_sync::SpinLock;
use kernel_vmem::{FrameAlloc, PageMapper};

type Mapper = dyn PageMapper + Send;
type Frames = dyn FrameAlloc + Send;

struct Adapter {
    mapper: &'static mut Mapper,
    frames: &'static mut Frames,
}

struct StaticHeap {
    heap: KernelHeap,
    adapter: Option<Adapter>,
}

static HEAP: SpinLock<StaticHeap> = SpinLock::new(StaticHeap {
    heap: KernelHeap::new(
        VirtualAddress::new(KERNEL_HEAP_START),
        VirtualAddress::new(KERNEL_HEAP_MAX),
    ),
    adapter: None,
});

/// Hand the kernel's page tables and frame pool to the static heap.
///
/// Replaces a previously installed pair.
pub fn install_adapter(mapper: &'static mut Mapper, frames: &'static mut Frames) {
    HEAP.with_lock(|state| {
        if state.adapter.is_some() {
            log::warn!("kernel heap: replacing installed page-table adapter");
        }
        state.adapter = Some(Adapter { mapper, frames });
    });
}

fn with_kernel_vmm<R>(
    f: impl FnOnce(&mut KernelHeap, &mut Vmm<'_, Mapper, Frames>) -> R,
) -> Option<R> {
    HEAP.with_lock(|state| {
        let StaticHeap { heap, adapter } = state;
        let Some(adapter) = adapter.as_mut() else {
            log::warn!("kernel heap: used before a page-table adapter was installed");
            return None;
        };
        let mut vmm = Vmm::new(&mut *adapter.mapper, &mut *adapter.frames);
        Some(f(heap, &mut vmm))
    })
}

/// Allocate `size` bytes of kernel heap, rounded up to whole pages.
///
/// Returns `None` if the heap cannot satisfy the request.
#[must_use]
pub fn kernel_allocate(size: u64) -> Option<VirtualAddress> {
    with_kernel_vmm(|heap, vmm| heap.allocate(vmm, size))?
        .inspect_err(|e| log::debug!("kernel_allocate({size}) failed: {e}"))
        .ok()
}

/// Release an allocation made by [`kernel_allocate`]. Unknown addresses are
/// ignored.
pub fn kernel_free(address: VirtualAddress) {
    with_kernel_vmm(|heap, vmm| heap.free(vmm, address));
}

/// Kernel heap address whose page is backed by the frame starting at `pa`.
#[must_use]
pub fn virtual_for_physical(pa: PhysicalAddress) -> Option<VirtualAddress> {
    with_kernel_vmm(|heap, vmm| heap.virtual_for_physical(&*vmm, pa))?
}

/// Physical base of the frame backing `va`.
#[must_use]
pub fn physical_for_virtual(va: VirtualAddress) -> Option<PhysicalAddress> {
    with_kernel_vmm(|_, vmm| translate::physical_for_virtual(&*vmm, va))?
}

/// Kernel heap allocations cannot be resized.
///
/// # Panics
/// Always.
pub fn kernel_reallocate(address: VirtualAddress, new_size: u64) -> ! {
    let Err(err) = HEAP.with_lock(|state| state.heap.reallocate(address, new_size));
    panic!("{err}");
}
