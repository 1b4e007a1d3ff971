//! Minimal Virtual Memory Manager (VMM) for the kernel heap.
//!
//! Bundles a [`PageMapper`] and a [`FrameAlloc`] for the duration of one heap
//! operation and provides the page-level steps the heap is built from:
//! map a fresh frame behind a page, release the frame behind a page, and
//! look up what backs an address.
//!
//! # Example
//! ```
//! use kernel_alloc::vmm::Vmm;
//! use kernel_vmem::PageFlags;
//! use kernel_vmem::addresses::{PhysicalAddress, Size4K, VirtualAddress};
//! use kernel_vmem::soft::{SoftFramePool, SoftPageTable};
//!
//! let mut table = SoftPageTable::new();
//! let mut frames = SoftFramePool::new(PhysicalAddress::new(0x40_0000), 8);
//! let mut vmm = Vmm::new(&mut table, &mut frames);
//!
//! let va = VirtualAddress::new(0xffff_c000_0000_0000);
//! let frame = vmm.map_fresh_page(va.page::<Size4K>(), PageFlags::kernel_rw()).unwrap();
//! assert_eq!(vmm.query(va + 0x10), Some(frame.base() + 0x10));
//! ```

use kernel_vmem::addresses::{PageSize, PhysicalAddress, Size4K, VirtualAddress, VirtualPage};
use kernel_vmem::{FrameAlloc, FrameMapError, PageFlags, PageMapper, PhysFrame};

/// Minimal kernel virtual memory manager.
pub struct Vmm<'m, M: PageMapper + ?Sized, A: FrameAlloc + ?Sized> {
    mapper: &'m mut M,
    alloc: &'m mut A,
}

impl<'m, M: PageMapper + ?Sized, A: FrameAlloc + ?Sized> Vmm<'m, M, A> {
    pub const fn new(mapper: &'m mut M, alloc: &'m mut A) -> Self {
        Self { mapper, alloc }
    }

    /// Read-only access to the page tables.
    #[inline]
    #[must_use]
    pub fn mapper(&self) -> &M {
        self.mapper
    }

    /// Read-only access to the frame pool.
    #[inline]
    #[must_use]
    pub fn frames(&self) -> &A {
        self.alloc
    }

    /// Translate VA→PA if mapped, keeping the offset within the page.
    #[must_use]
    pub fn query(&self, va: VirtualAddress) -> Option<PhysicalAddress> {
        let frame = self.mapper.frame_at(va)?;
        let offset = va.as_u64() & (Size4K::SIZE - 1);
        Some(self.alloc.physical_address_of(frame) + offset)
    }

    /// Frame backing `va`, if mapped.
    #[inline]
    #[must_use]
    pub fn frame_at(&self, va: VirtualAddress) -> Option<PhysFrame> {
        self.mapper.frame_at(va)
    }

    #[inline]
    #[must_use]
    pub fn is_mapped(&self, page: VirtualPage<Size4K>) -> bool {
        self.mapper.is_mapped(page)
    }

    /// Physical address of the first byte of `frame`.
    #[inline]
    #[must_use]
    pub fn physical_address_of(&self, frame: PhysFrame) -> PhysicalAddress {
        self.alloc.physical_address_of(frame)
    }

    /// Back `page` with a freshly allocated frame and take one reference on it.
    ///
    /// If the mapping is refused the frame goes straight back to the pool.
    ///
    /// # Errors
    /// [`VmmError::OutOfMemory`] if no frame is available, or
    /// [`VmmError::Map`] if the page tables refuse the mapping.
    pub fn map_fresh_page(
        &mut self,
        page: VirtualPage<Size4K>,
        flags: PageFlags,
    ) -> Result<PhysFrame, VmmError> {
        let frame = self.alloc.allocate_frame().ok_or(VmmError::OutOfMemory)?;
        if let Err(e) = self.mapper.map_frame(frame, page, flags) {
            self.alloc.free_frame(frame);
            return Err(e.into());
        }
        self.alloc.add_reference(frame);
        Ok(frame)
    }

    /// Unmap `page`, drop one reference on its frame and return the frame to
    /// the pool once nothing references it anymore.
    ///
    /// Returns the frame that was mapped, or `None` if the page was unmapped.
    pub fn release_page(&mut self, page: VirtualPage<Size4K>) -> Option<PhysFrame> {
        let frame = self.mapper.frame_at(page.base())?;
        self.mapper.unmap_frame(page);
        if self.alloc.remove_reference(frame) == 0 {
            self.alloc.free_frame(frame);
        }
        Some(frame)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VmmError {
    #[error("out of physical frames")]
    OutOfMemory,
    #[error(transparent)]
    Map(#[from] FrameMapError),
}
