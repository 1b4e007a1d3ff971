//! Address translation between kernel heap pages and physical frames.
//!
//! Both directions work on frame granularity: the physical address reported
//! for a virtual address is the base of the frame backing its page, and the
//! reverse lookup only matches frame bases.

use crate::kheap::KernelHeap;
use crate::vmm::Vmm;
use kernel_memory_addresses::{PhysicalAddress, Size4K, VirtualAddress, VirtualPage};
use kernel_vmem::{FrameAlloc, PageMapper};

/// Physical base of the frame backing `va`, or `None` if unmapped.
#[must_use]
pub fn physical_for_virtual<M, A>(vmm: &Vmm<'_, M, A>, va: VirtualAddress) -> Option<PhysicalAddress>
where
    M: PageMapper + ?Sized,
    A: FrameAlloc + ?Sized,
{
    let frame = vmm.frame_at(va)?;
    Some(vmm.physical_address_of(frame))
}

impl<const RECORDS: usize> KernelHeap<RECORDS> {
    /// The heap page whose frame starts at `pa`.
    ///
    /// Only pages between the heap start and the [watermark](Self::watermark)
    /// are searched, lowest first.
    #[must_use]
    pub fn virtual_for_physical<M, A>(
        &self,
        vmm: &Vmm<'_, M, A>,
        pa: PhysicalAddress,
    ) -> Option<VirtualAddress>
    where
        M: PageMapper + ?Sized,
        A: FrameAlloc + ?Sized,
    {
        VirtualPage::<Size4K>::range(self.start(), self.watermark())
            .map(VirtualPage::base)
            .find(|&va| physical_for_virtual(vmm, va) == Some(pa))
    }
}
