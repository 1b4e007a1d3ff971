//! In-memory [`FrameAlloc`] and [`PageMapper`] for hosted builds.
//!
//! Nothing here touches real hardware: the page table is a sorted map from
//! page to frame, and the frame pool is a contiguous block of frame numbers
//! starting at a chosen base. Both support simple fault injection so callers
//! can exercise their out-of-memory and refused-mapping paths.
//!
//! ```rust
//! use kernel_vmem::addresses::{PhysicalAddress, Size4K, VirtualAddress};
//! use kernel_vmem::soft::{SoftFramePool, SoftPageTable};
//! use kernel_vmem::{FrameAlloc, PageFlags, PageMapper};
//!
//! let mut frames = SoftFramePool::new(PhysicalAddress::new(0x10_0000), 4);
//! let mut table = SoftPageTable::new();
//!
//! let page = VirtualAddress::new(0xffff_c000_0000_0000).page::<Size4K>();
//! let frame = frames.allocate_frame().unwrap();
//! table.map_frame(frame, page, PageFlags::kernel_rw()).unwrap();
//! frames.add_reference(frame);
//!
//! assert_eq!(table.frame_at(page.base() + 0x10), Some(frame));
//! assert_eq!(frames.references(frame), 1);
//! ```

use crate::{FrameAlloc, FrameMapError, PageFlags, PageMapper, PhysFrame};
use alloc::collections::{BTreeMap, BTreeSet};
use alloc::vec::Vec;
use kernel_memory_addresses::{PageSize, PhysicalAddress, Size4K, VirtualAddress, VirtualPage};

/// A leaf entry of [`SoftPageTable`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Mapping {
    pub frame: PhysFrame,
    pub flags: PageFlags,
}

/// Page table backed by a [`BTreeMap`].
#[derive(Debug, Default)]
pub struct SoftPageTable {
    entries: BTreeMap<VirtualPage<Size4K>, Mapping>,
    refused: BTreeSet<VirtualPage<Size4K>>,
}

impl SoftPageTable {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            refused: BTreeSet::new(),
        }
    }

    /// Make every future [`map_frame`](PageMapper::map_frame) of the page
    /// containing `va` fail with [`FrameMapError::Refused`].
    pub fn refuse_mapping_at(&mut self, va: VirtualAddress) {
        self.refused.insert(va.page());
    }

    /// Flags of the mapping covering `va`, if any.
    #[must_use]
    pub fn flags_at(&self, va: VirtualAddress) -> Option<PageFlags> {
        self.entries.get(&va.page()).map(|m| m.flags)
    }

    /// Number of installed leaf mappings.
    #[must_use]
    pub fn mapped_pages(&self) -> usize {
        self.entries.len()
    }
}

impl PageMapper for SoftPageTable {
    fn map_frame(
        &mut self,
        frame: PhysFrame,
        page: VirtualPage<Size4K>,
        flags: PageFlags,
    ) -> Result<(), FrameMapError> {
        if self.refused.contains(&page) {
            return Err(FrameMapError::Refused(page.base()));
        }
        if self.entries.contains_key(&page) {
            return Err(FrameMapError::AlreadyMapped(page.base()));
        }
        self.entries.insert(page, Mapping { frame, flags });
        Ok(())
    }

    fn unmap_frame(&mut self, page: VirtualPage<Size4K>) {
        self.entries.remove(&page);
    }

    fn frame_at(&self, va: VirtualAddress) -> Option<PhysFrame> {
        self.entries.get(&va.page()).map(|m| m.frame)
    }
}

/// Fixed pool of `capacity` contiguous frames starting at `base`.
///
/// Frames are handed out lowest address first.
#[derive(Debug)]
pub struct SoftFramePool {
    base: PhysicalAddress,
    references: Vec<u32>,
    allocated: Vec<bool>,
    /// Free frame indices, highest first so `pop` yields the lowest.
    free: Vec<usize>,
}

impl SoftFramePool {
    #[must_use]
    pub fn new(base: PhysicalAddress, capacity: usize) -> Self {
        Self {
            base: base.page::<Size4K>().base(),
            references: alloc::vec![0; capacity],
            allocated: alloc::vec![false; capacity],
            free: (0..capacity).rev().collect(),
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.references.len()
    }

    #[must_use]
    pub fn free_frames(&self) -> usize {
        self.free.len()
    }

    #[must_use]
    pub fn is_allocated(&self, frame: PhysFrame) -> bool {
        self.index_of(frame).is_some_and(|i| self.allocated[i])
    }

    fn index_of(&self, frame: PhysFrame) -> Option<usize> {
        let offset = frame.base().as_u64().checked_sub(self.base.as_u64())?;
        let index = usize::try_from(Size4K::pages_in(offset)).ok()?;
        (index < self.references.len()).then_some(index)
    }

    fn frame(&self, index: usize) -> PhysFrame {
        (self.base + index as u64 * Size4K::SIZE).page()
    }
}

impl FrameAlloc for SoftFramePool {
    fn allocate_frame(&mut self) -> Option<PhysFrame> {
        let index = self.free.pop()?;
        self.allocated[index] = true;
        self.references[index] = 0;
        Some(self.frame(index))
    }

    fn free_frame(&mut self, frame: PhysFrame) {
        let Some(index) = self.index_of(frame) else {
            log::warn!("free of foreign frame {frame:?}");
            return;
        };
        if !self.allocated[index] {
            log::warn!("double free of {frame:?}");
            return;
        }
        self.allocated[index] = false;
        self.references[index] = 0;
        // Keep the free list descending so the lowest frame is reused first.
        let at = self.free.partition_point(|&i| i > index);
        self.free.insert(at, index);
    }

    fn add_reference(&mut self, frame: PhysFrame) -> u32 {
        self.index_of(frame).map_or(0, |i| {
            self.references[i] = self.references[i].saturating_add(1);
            self.references[i]
        })
    }

    fn remove_reference(&mut self, frame: PhysFrame) -> u32 {
        self.index_of(frame).map_or(0, |i| {
            self.references[i] = self.references[i].saturating_sub(1);
            self.references[i]
        })
    }

    fn references(&self, frame: PhysFrame) -> u32 {
        self.index_of(frame).map_or(0, |i| self.references[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: u64 = 0x20_0000;
    const VA: u64 = 0xffff_c000_0000_0000;

    fn page(offset: u64) -> VirtualPage<Size4K> {
        VirtualAddress::new(VA + offset).page()
    }

    #[test]
    fn pool_hands_out_lowest_frame_first() {
        let mut pool = SoftFramePool::new(PhysicalAddress::new(BASE), 3);
        let a = pool.allocate_frame().unwrap();
        let b = pool.allocate_frame().unwrap();
        assert_eq!(a.base().as_u64(), BASE);
        assert_eq!(b.base().as_u64(), BASE + 0x1000);

        pool.free_frame(a);
        assert_eq!(pool.allocate_frame(), Some(a));
    }

    #[test]
    fn pool_runs_dry() {
        let mut pool = SoftFramePool::new(PhysicalAddress::new(BASE), 1);
        assert!(pool.allocate_frame().is_some());
        assert_eq!(pool.allocate_frame(), None);
        assert_eq!(pool.free_frames(), 0);
    }

    #[test]
    fn references_saturate_at_zero() {
        let mut pool = SoftFramePool::new(PhysicalAddress::new(BASE), 1);
        let f = pool.allocate_frame().unwrap();
        assert_eq!(pool.add_reference(f), 1);
        assert_eq!(pool.add_reference(f), 2);
        assert_eq!(pool.remove_reference(f), 1);
        assert_eq!(pool.remove_reference(f), 0);
        assert_eq!(pool.remove_reference(f), 0);
    }

    #[test]
    fn double_free_is_ignored() {
        let mut pool = SoftFramePool::new(PhysicalAddress::new(BASE), 2);
        let f = pool.allocate_frame().unwrap();
        pool.free_frame(f);
        pool.free_frame(f);
        assert_eq!(pool.free_frames(), 2);
        assert!(!pool.is_allocated(f));
    }

    #[test]
    fn table_maps_and_translates_any_offset() {
        let mut table = SoftPageTable::new();
        let frame = PhysicalAddress::new(BASE).page();
        table
            .map_frame(frame, page(0x3000), PageFlags::kernel_rw())
            .unwrap();

        assert_eq!(table.frame_at(VirtualAddress::new(VA + 0x3fff)), Some(frame));
        assert_eq!(table.frame_at(VirtualAddress::new(VA + 0x4000)), None);
        assert_eq!(
            table.flags_at(VirtualAddress::new(VA + 0x3000)),
            Some(PageFlags::kernel_rw())
        );
    }

    #[test]
    fn table_rejects_double_mapping() {
        let mut table = SoftPageTable::new();
        let frame = PhysicalAddress::new(BASE).page();
        table.map_frame(frame, page(0), PageFlags::kernel_rw()).unwrap();
        assert_eq!(
            table.map_frame(frame, page(0), PageFlags::kernel_rw()),
            Err(FrameMapError::AlreadyMapped(VirtualAddress::new(VA)))
        );
    }

    #[test]
    fn refused_page_fails_to_map() {
        let mut table = SoftPageTable::new();
        table.refuse_mapping_at(VirtualAddress::new(VA + 0x1234));
        let frame = PhysicalAddress::new(BASE).page();
        assert_eq!(
            table.map_frame(frame, page(0x1000), PageFlags::kernel_rw()),
            Err(FrameMapError::Refused(VirtualAddress::new(VA + 0x1000)))
        );
        assert!(!table.is_mapped(page(0x1000)));
    }

    #[test]
    fn unmap_removes_entry() {
        let mut table = SoftPageTable::new();
        let frame = PhysicalAddress::new(BASE).page();
        table.map_frame(frame, page(0), PageFlags::kernel_rw()).unwrap();
        table.unmap_frame(page(0));
        assert_eq!(table.mapped_pages(), 0);
        assert_eq!(table.frame_at(VirtualAddress::new(VA)), None);
    }
}
