//! # Kernel Heap
//!
//! Whole-page allocations inside a fixed kernel virtual range.
//!
//! The heap keeps no free list. Free space is whatever part of the range is
//! currently unmapped, rediscovered by a page-by-page scan on every
//! allocation:
//!
//! ```text
//!  start                                                       end
//!  │ M │ M │ . │ . │ . │ M │ . │ . │ . │ . │ . │ M │ . │
//!            └─ run 3 ─┘     └────── run 5 ──────┘   └1┘
//! ```
//!
//! Among the runs large enough for the request the **largest** wins
//! (worst-fit); on a tie the first run found is taken. Pages are then
//! backed one at a time through the [`Vmm`] and the allocation is recorded so
//! [`KernelHeap::free`] knows how many pages to release.

use crate::config::{KernelHeapConfig, MappingFailurePolicy};
use crate::error::{KernelHeapError, Unsupported};
use crate::vmm::Vmm;
use arrayvec::ArrayVec;
use core::convert::Infallible;
use core::iter::FusedIterator;
use kernel_info::memory::KERNEL_HEAP_PAGES;
use kernel_memory_addresses::{PageSize, Size4K, VirtualAddress, VirtualPage, VirtualPageRange};
use kernel_vmem::{FrameAlloc, PageFlags, PageMapper};

/// One live kernel heap allocation.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct KernelAllocation {
    /// Page-aligned base returned to the caller.
    pub start: VirtualAddress,
    /// Size in bytes, a positive multiple of the page size.
    pub size: u64,
}

impl KernelAllocation {
    /// First address past the allocation.
    #[inline]
    #[must_use]
    pub const fn end(self) -> VirtualAddress {
        VirtualAddress::new(self.start.as_u64() + self.size)
    }

    #[inline]
    #[must_use]
    pub const fn pages(self) -> VirtualPageRange<Size4K> {
        VirtualPage::range(self.start, self.end())
    }

    #[inline]
    #[must_use]
    pub const fn overlaps(self, other: Self) -> bool {
        self.start.as_u64() < other.end().as_u64() && other.start.as_u64() < self.end().as_u64()
    }
}

/// A maximal run of consecutive unmapped pages.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PageRun {
    pub start: VirtualAddress,
    pub pages: u64,
}

impl PageRun {
    /// Size of the run in bytes.
    #[inline]
    #[must_use]
    pub const fn size(self) -> u64 {
        self.pages * Size4K::SIZE
    }
}

/// Iterator over the [`PageRun`]s of a heap range, lowest address first.
///
/// Created by [`KernelHeap::free_runs`].
pub struct FreeRuns<'m, M: PageMapper + ?Sized> {
    mapper: &'m M,
    pages: VirtualPageRange<Size4K>,
}

impl<M: PageMapper + ?Sized> Iterator for FreeRuns<'_, M> {
    type Item = PageRun;

    fn next(&mut self) -> Option<Self::Item> {
        let first = self.pages.by_ref().find(|p| !self.mapper.is_mapped(*p))?;
        let mut pages = 1;
        for page in self.pages.by_ref() {
            if self.mapper.is_mapped(page) {
                break;
            }
            pages += 1;
        }
        Some(PageRun {
            start: first.base(),
            pages,
        })
    }
}

impl<M: PageMapper + ?Sized> FusedIterator for FreeRuns<'_, M> {}

/// Page-granular worst-fit allocator over `[start, end)`.
///
/// `RECORDS` bounds the allocation table. The default equals the number of
/// pages in the kernel heap, so the table can only fill up on a heap built
/// over a larger range.
pub struct KernelHeap<const RECORDS: usize = KERNEL_HEAP_PAGES> {
    start: VirtualAddress,
    end: VirtualAddress,
    watermark: VirtualAddress,
    records: ArrayVec<KernelAllocation, RECORDS>,
    config: KernelHeapConfig,
}

impl<const RECORDS: usize> KernelHeap<RECORDS> {
    /// An empty heap over the page-aligned range `[start, end)`.
    #[must_use]
    pub const fn new(start: VirtualAddress, end: VirtualAddress) -> Self {
        Self::with_config(start, end, KernelHeapConfig::new())
    }

    #[must_use]
    pub const fn with_config(
        start: VirtualAddress,
        end: VirtualAddress,
        config: KernelHeapConfig,
    ) -> Self {
        debug_assert!(start.is_aligned::<Size4K>() && end.is_aligned::<Size4K>());
        debug_assert!(start.as_u64() <= end.as_u64());
        Self {
            start,
            end,
            watermark: start,
            records: ArrayVec::new_const(),
            config,
        }
    }

    #[inline]
    #[must_use]
    pub const fn start(&self) -> VirtualAddress {
        self.start
    }

    #[inline]
    #[must_use]
    pub const fn end(&self) -> VirtualAddress {
        self.end
    }

    /// Highest end address any allocation has reached. Never lowered.
    #[inline]
    #[must_use]
    pub const fn watermark(&self) -> VirtualAddress {
        self.watermark
    }

    #[inline]
    #[must_use]
    pub const fn config(&self) -> KernelHeapConfig {
        self.config
    }

    /// Live allocations in the order they were made.
    #[inline]
    #[must_use]
    pub fn allocations(&self) -> &[KernelAllocation] {
        &self.records
    }

    /// The unmapped runs of the heap range as seen by `mapper`.
    pub fn free_runs<'m, M: PageMapper + ?Sized>(&self, mapper: &'m M) -> FreeRuns<'m, M> {
        FreeRuns {
            mapper,
            pages: VirtualPage::range(self.start, self.end),
        }
    }

    /// Allocate `size` bytes rounded up to whole pages.
    ///
    /// Returns the base of the largest unmapped run that can hold the
    /// request. Every page of the allocation is backed by a fresh frame,
    /// mapped present and writable, with one reference taken.
    ///
    /// A zero `size` returns the base of the largest run without mapping or
    /// recording anything.
    ///
    /// # Errors
    /// - [`KernelHeapError::OutOfSpace`] if no run is large enough, or the
    ///   rounded size does not fit the address space.
    /// - [`KernelHeapError::MappingFailure`] if backing a page fails. The
    ///   pages mapped before the failure are kept or released according to
    ///   [`KernelHeapConfig::on_mapping_failure`].
    pub fn allocate<M, A>(
        &mut self,
        vmm: &mut Vmm<'_, M, A>,
        size: u64,
    ) -> Result<VirtualAddress, KernelHeapError>
    where
        M: PageMapper + ?Sized,
        A: FrameAlloc + ?Sized,
    {
        let requested = size;
        let size = Size4K::round_up(size).ok_or(KernelHeapError::OutOfSpace { requested })?;
        let pages = Size4K::pages_in(size);

        let Some(run) = self.worst_fit(vmm.mapper(), pages) else {
            log::warn!("kernel heap: no unmapped run of {pages} page(s) for {requested} bytes");
            return Err(KernelHeapError::OutOfSpace { requested });
        };

        let base = run.start;
        let end = base + size;
        for (mapped, page) in (0u64..).zip(VirtualPage::<Size4K>::range(base, end)) {
            if let Err(source) = vmm.map_fresh_page(page, PageFlags::kernel_rw()) {
                log::warn!(
                    "kernel heap: backing {page} failed after {mapped} of {pages} page(s): {source}"
                );
                if self.config.on_mapping_failure == MappingFailurePolicy::Rollback {
                    for done in VirtualPage::<Size4K>::range(base, page.base()) {
                        vmm.release_page(done);
                    }
                }
                return Err(KernelHeapError::MappingFailure {
                    at: page.base(),
                    mapped,
                    source,
                });
            }
        }

        if size > 0
            && self
                .records
                .try_push(KernelAllocation { start: base, size })
                .is_err()
        {
            log::warn!("kernel heap: allocation table full, {pages} page(s) at {base} are untracked");
        }
        if end > self.watermark {
            self.watermark = end;
        }

        log::debug!("kernel heap: allocated {pages} page(s) at {base}");
        Ok(base)
    }

    /// Release the allocation starting at `address`.
    ///
    /// Unknown addresses are ignored. Returns the released allocation.
    pub fn free<M, A>(
        &mut self,
        vmm: &mut Vmm<'_, M, A>,
        address: VirtualAddress,
    ) -> Option<KernelAllocation>
    where
        M: PageMapper + ?Sized,
        A: FrameAlloc + ?Sized,
    {
        let Some(index) = self.records.iter().position(|r| r.start == address) else {
            log::trace!("kernel heap: ignoring free of untracked {address}");
            return None;
        };

        let record = self.records.remove(index);
        for page in record.pages() {
            vmm.release_page(page);
        }

        log::debug!(
            "kernel heap: freed {} page(s) at {address}",
            Size4K::pages_in(record.size)
        );
        Some(record)
    }

    /// Resizing kernel allocations is not provided.
    ///
    /// # Errors
    /// Always [`Unsupported::Reallocate`].
    pub fn reallocate(
        &self,
        address: VirtualAddress,
        new_size: u64,
    ) -> Result<Infallible, Unsupported> {
        log::warn!(
            "kernel heap: reallocate({address}, {new_size}) requested with {} live allocation(s)",
            self.records.len()
        );
        Err(Unsupported::Reallocate { address })
    }

    fn worst_fit<M: PageMapper + ?Sized>(&self, mapper: &M, pages: u64) -> Option<PageRun> {
        let mut best: Option<PageRun> = None;
        for run in self.free_runs(mapper) {
            log::trace!("kernel heap: run of {} page(s) at {}", run.pages, run.start);
            if run.pages >= pages && best.is_none_or(|b| run.pages > b.pages) {
                best = Some(run);
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vmm::VmmError;
    use kernel_vmem::soft::{SoftFramePool, SoftPageTable};
    use kernel_vmem::addresses::PhysicalAddress;

    const START: u64 = 0xffff_c000_0000_0000;
    const PAGE: u64 = Size4K::SIZE;

    fn va(page: u64) -> VirtualAddress {
        VirtualAddress::new(START + page * PAGE)
    }

    fn heap<const R: usize>(pages: u64) -> KernelHeap<R> {
        KernelHeap::new(va(0), va(pages))
    }

    struct Mmu {
        table: SoftPageTable,
        frames: SoftFramePool,
    }

    impl Mmu {
        fn new(frames: usize) -> Self {
            Self {
                table: SoftPageTable::new(),
                frames: SoftFramePool::new(PhysicalAddress::new(0x100_0000), frames),
            }
        }

        fn vmm(&mut self) -> Vmm<'_, SoftPageTable, SoftFramePool> {
            Vmm::new(&mut self.table, &mut self.frames)
        }

        /// Map `page` outside of any heap bookkeeping.
        fn occupy(&mut self, page: u64) {
            self.vmm()
                .map_fresh_page(va(page).page(), PageFlags::kernel_rw())
                .unwrap();
        }
    }

    #[test]
    fn free_runs_split_at_mapped_pages() {
        let mut mmu = Mmu::new(8);
        for page in [1, 4, 5] {
            mmu.occupy(page);
        }
        let heap = heap::<4>(8);
        let runs: Vec<_> = heap.free_runs(&mmu.table).collect();
        assert_eq!(
            runs,
            [
                PageRun { start: va(0), pages: 1 },
                PageRun { start: va(2), pages: 2 },
                PageRun { start: va(6), pages: 2 },
            ]
        );
        assert_eq!(runs[1].size(), 2 * PAGE);
    }

    #[test]
    fn worst_fit_picks_the_largest_run() {
        // Runs: [0, 3) and [4, 9).
        let mut mmu = Mmu::new(16);
        mmu.occupy(3);
        mmu.occupy(9);
        let mut heap = heap::<4>(10);

        let base = heap.allocate(&mut mmu.vmm(), 2 * PAGE).unwrap();
        assert_eq!(base, va(4));
    }

    #[test]
    fn larger_trailing_run_wins_over_first_gap() {
        let mut mmu = Mmu::new(16);
        for page in [0, 1, 2, 5] {
            mmu.occupy(page);
        }
        let mut heap = heap::<4>(16);

        assert_eq!(heap.allocate(&mut mmu.vmm(), PAGE).unwrap(), va(6));
    }

    #[test]
    fn equal_runs_go_to_the_first() {
        let mut mmu = Mmu::new(8);
        mmu.occupy(3);
        let mut heap = heap::<4>(7);

        assert_eq!(heap.allocate(&mut mmu.vmm(), PAGE).unwrap(), va(0));
    }

    #[test]
    fn sizes_round_up_to_pages() {
        let mut mmu = Mmu::new(8);
        let mut heap = heap::<4>(8);

        let a = heap.allocate(&mut mmu.vmm(), 1).unwrap();
        let b = heap.allocate(&mut mmu.vmm(), PAGE + 1).unwrap();
        assert_eq!(
            heap.allocations(),
            [
                KernelAllocation { start: a, size: PAGE },
                KernelAllocation { start: b, size: 2 * PAGE },
            ]
        );
        assert_eq!(mmu.table.mapped_pages(), 3);
    }

    #[test]
    fn allocated_pages_are_backed_writable_with_one_reference() {
        let mut mmu = Mmu::new(8);
        let mut heap = heap::<4>(8);

        let base = heap.allocate(&mut mmu.vmm(), 3 * PAGE).unwrap();
        for page in VirtualPage::<Size4K>::range(base, base + 3 * PAGE) {
            let frame = mmu.table.frame_at(page.base()).unwrap();
            assert_eq!(mmu.frames.references(frame), 1);
            assert_eq!(mmu.table.flags_at(page.base()), Some(PageFlags::kernel_rw()));
        }
    }

    #[test]
    fn allocation_never_covers_mapped_pages() {
        let mut mmu = Mmu::new(16);
        mmu.occupy(2);
        mmu.occupy(5);
        let mut heap = heap::<8>(8);

        let mut got = Vec::new();
        while let Ok(base) = heap.allocate(&mut mmu.vmm(), PAGE) {
            got.push(base);
        }
        got.sort();
        assert_eq!(got, [va(0), va(1), va(3), va(4), va(6), va(7)]);
    }

    #[test]
    fn no_fitting_run_is_out_of_space() {
        let mut mmu = Mmu::new(8);
        mmu.occupy(2);
        let mut heap = heap::<4>(4);

        assert_eq!(
            heap.allocate(&mut mmu.vmm(), 3 * PAGE),
            Err(KernelHeapError::OutOfSpace { requested: 3 * PAGE })
        );
        assert_eq!(
            heap.allocate(&mut mmu.vmm(), u64::MAX),
            Err(KernelHeapError::OutOfSpace { requested: u64::MAX })
        );
        assert!(heap.allocations().is_empty());
    }

    #[test]
    fn zero_size_returns_largest_run_without_mapping() {
        let mut mmu = Mmu::new(8);
        mmu.occupy(1);
        let mut heap = heap::<4>(4);

        assert_eq!(heap.allocate(&mut mmu.vmm(), 0), Ok(va(2)));
        assert_eq!(mmu.table.mapped_pages(), 1);
        assert!(heap.allocations().is_empty());
    }

    #[test]
    fn free_releases_frames_and_keeps_record_order() {
        let mut mmu = Mmu::new(8);
        let mut heap = heap::<4>(8);

        let a = heap.allocate(&mut mmu.vmm(), PAGE).unwrap();
        let b = heap.allocate(&mut mmu.vmm(), 2 * PAGE).unwrap();
        let c = heap.allocate(&mut mmu.vmm(), PAGE).unwrap();
        assert_eq!(mmu.frames.free_frames(), 4);

        let freed = heap.free(&mut mmu.vmm(), b).unwrap();
        assert_eq!(freed, KernelAllocation { start: b, size: 2 * PAGE });
        assert_eq!(mmu.frames.free_frames(), 6);
        assert!(!mmu.table.is_mapped(b.page()));
        let starts: Vec<_> = heap.allocations().iter().map(|r| r.start).collect();
        assert_eq!(starts, [a, c]);
    }

    #[test]
    fn free_of_unknown_address_is_ignored() {
        let mut mmu = Mmu::new(8);
        let mut heap = heap::<4>(8);
        let a = heap.allocate(&mut mmu.vmm(), 2 * PAGE).unwrap();

        assert_eq!(heap.free(&mut mmu.vmm(), a + PAGE), None);
        assert_eq!(heap.free(&mut mmu.vmm(), VirtualAddress::zero()), None);
        assert_eq!(heap.allocations().len(), 1);
        assert_eq!(mmu.table.mapped_pages(), 2);
    }

    #[test]
    fn freed_space_is_found_again() {
        let mut mmu = Mmu::new(8);
        let mut heap = heap::<4>(4);

        let a = heap.allocate(&mut mmu.vmm(), 4 * PAGE).unwrap();
        assert!(heap.allocate(&mut mmu.vmm(), PAGE).is_err());
        heap.free(&mut mmu.vmm(), a);
        assert_eq!(heap.allocate(&mut mmu.vmm(), 4 * PAGE), Ok(a));
    }

    #[test]
    fn partial_mapping_failure_leaks_by_default() {
        let mut mmu = Mmu::new(8);
        mmu.table.refuse_mapping_at(va(2));
        let mut heap = heap::<4>(8);

        let err = heap.allocate(&mut mmu.vmm(), 4 * PAGE).unwrap_err();
        assert!(matches!(
            err,
            KernelHeapError::MappingFailure { at, mapped: 2, source: VmmError::Map(_) } if at == va(2)
        ));
        assert!(mmu.table.is_mapped(va(0).page()));
        assert!(mmu.table.is_mapped(va(1).page()));
        assert!(heap.allocations().is_empty());
        assert_eq!(heap.watermark(), va(0));
        assert_eq!(mmu.frames.free_frames(), 6);
    }

    #[test]
    fn partial_mapping_failure_rolls_back_when_configured() {
        let mut mmu = Mmu::new(8);
        mmu.table.refuse_mapping_at(va(2));
        let config = KernelHeapConfig::new().with_mapping_failure(MappingFailurePolicy::Rollback);
        let mut heap = KernelHeap::<4>::with_config(va(0), va(8), config);

        assert!(heap.allocate(&mut mmu.vmm(), 4 * PAGE).is_err());
        assert_eq!(mmu.table.mapped_pages(), 0);
        assert_eq!(mmu.frames.free_frames(), 8);
    }

    #[test]
    fn frame_exhaustion_is_a_mapping_failure() {
        let mut mmu = Mmu::new(2);
        let mut heap = heap::<4>(8);

        assert_eq!(
            heap.allocate(&mut mmu.vmm(), 3 * PAGE),
            Err(KernelHeapError::MappingFailure {
                at: va(2),
                mapped: 2,
                source: VmmError::OutOfMemory,
            })
        );
    }

    #[test]
    fn full_table_keeps_the_mapping_but_drops_the_record() {
        let mut mmu = Mmu::new(8);
        let mut heap = heap::<2>(8);

        for _ in 0..3 {
            heap.allocate(&mut mmu.vmm(), PAGE).unwrap();
        }
        assert_eq!(heap.allocations().len(), 2);
        assert_eq!(mmu.table.mapped_pages(), 3);
    }

    #[test]
    fn watermark_only_rises() {
        let mut mmu = Mmu::new(8);
        let mut heap = heap::<4>(8);
        assert_eq!(heap.watermark(), va(0));

        let a = heap.allocate(&mut mmu.vmm(), 2 * PAGE).unwrap();
        assert_eq!(heap.watermark(), va(2));
        let _b = heap.allocate(&mut mmu.vmm(), 3 * PAGE).unwrap();
        assert_eq!(heap.watermark(), va(5));

        heap.free(&mut mmu.vmm(), a);
        assert_eq!(heap.watermark(), va(5));
    }

    #[test]
    fn reallocate_is_unsupported() {
        let heap = heap::<4>(8);
        let Err(err) = heap.reallocate(va(0), PAGE);
        assert_eq!(err, Unsupported::Reallocate { address: va(0) });
    }
}
