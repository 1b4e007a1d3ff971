//! # User Heap
//!
//! Page-granular next-fit allocator over a fixed block table.
//!
//! ```text
//!  slot:   0            1         2     3 ...
//!        ┌────────────┬─────────┬─────┬─────┐
//!        │ used 1 pg  │ free 3pg│  ·  │  ·  │   · = empty slot
//!        └────────────┴─────────┴─────┴─────┘
//!          ▲ next-fit search resumes at the slot after the last hit
//! ```
//!
//! Allocating splits the first fitting free block found from the cursor and
//! parks the remainder in the lowest empty slot. Freeing marks the block
//! free and merges it with adjacent free blocks (see [`CoalescePolicy`]).
//! The block table is decoupled from the memory itself: once the table is
//! updated the [`Backing`] is asked to map or unmap the range.

use crate::backing::Backing;
use crate::block::{BlockTable, HeapBlock};
use crate::config::{CoalescePolicy, UserHeapConfig};
use crate::error::{Unsupported, UserHeapError};
use arrayvec::ArrayVec;
use core::convert::Infallible;
use kernel_info::memory::{MAX_USER_ALLOCATIONS, USER_HEAP_PAGES};
use kernel_memory_addresses::{PageSize, Size4K, VirtualAddress};

/// One live user heap allocation.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct UserAllocation {
    pub start: VirtualAddress,
    pub size: u64,
}

/// Next-fit allocator over `[start, end)`.
///
/// `SLOTS` is the capacity of the block table and `RECORDS` the capacity of
/// the allocation record table. The defaults fit the user heap layout in
/// `kernel_info::memory`, where every page could become its own block.
pub struct UserHeap<const SLOTS: usize = USER_HEAP_PAGES, const RECORDS: usize = MAX_USER_ALLOCATIONS>
{
    start: VirtualAddress,
    end: VirtualAddress,
    blocks: BlockTable<SLOTS>,
    records: ArrayVec<UserAllocation, RECORDS>,
    next_fit: usize,
    initialized: bool,
    config: UserHeapConfig,
}

impl<const SLOTS: usize, const RECORDS: usize> UserHeap<SLOTS, RECORDS> {
    /// A heap over the page-aligned range `[start, end)`. The block table is
    /// built on the first allocation.
    #[must_use]
    pub const fn new(start: VirtualAddress, end: VirtualAddress) -> Self {
        Self::with_config(start, end, UserHeapConfig::new())
    }

    #[must_use]
    pub const fn with_config(
        start: VirtualAddress,
        end: VirtualAddress,
        config: UserHeapConfig,
    ) -> Self {
        const { assert!(SLOTS > 0, "block table needs at least one slot") };
        debug_assert!(start.is_aligned::<Size4K>() && end.is_aligned::<Size4K>());
        debug_assert!(!start.is_null() && start.as_u64() < end.as_u64());
        Self {
            start,
            end,
            blocks: BlockTable::new(),
            records: ArrayVec::new_const(),
            next_fit: 0,
            initialized: false,
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

    #[inline]
    #[must_use]
    pub const fn config(&self) -> UserHeapConfig {
        self.config
    }

    #[inline]
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Slot where the next search starts.
    #[inline]
    #[must_use]
    pub const fn next_fit_index(&self) -> usize {
        self.next_fit
    }

    /// All slots of the block table, empty ones included.
    #[inline]
    #[must_use]
    pub fn slots(&self) -> &[HeapBlock] {
        self.blocks.slots()
    }

    /// Non-empty blocks with their slot index.
    pub fn blocks(&self) -> impl Iterator<Item = (usize, HeapBlock)> + '_ {
        self.blocks.blocks()
    }

    /// Live allocations in the order they were made.
    #[inline]
    #[must_use]
    pub fn allocations(&self) -> &[UserAllocation] {
        &self.records
    }

    fn ensure_init(&mut self) {
        if self.initialized {
            return;
        }
        let whole = HeapBlock::free(self.start, self.end.distance_from(self.start));
        self.blocks.reset(whole);
        self.records.clear();
        self.next_fit = 0;
        self.initialized = true;
        log::trace!("user heap: initialized {}..{}", self.start, self.end);
    }

    fn is_candidate(&self, block: HeapBlock, size: u64) -> bool {
        !block.used && block.size >= size && block.va >= self.start && block.va < self.end
    }

    /// Allocate `size` bytes rounded up to whole pages.
    ///
    /// Searches at most one full turn of the block table starting at
    /// [`next_fit_index`](Self::next_fit_index) and takes the first free
    /// block large enough. Once the block table is updated the range is
    /// handed to `backing`.
    ///
    /// # Errors
    /// - [`UserHeapError::ZeroSize`] for a zero `size`. Nothing is touched.
    /// - [`UserHeapError::OutOfSpace`] if no free block is large enough.
    /// - [`UserHeapError::TableExhausted`] if the chosen block must be split
    ///   but the block table is full. The block stays free.
    pub fn allocate<B: Backing + ?Sized>(
        &mut self,
        backing: &mut B,
        size: u64,
    ) -> Result<VirtualAddress, UserHeapError> {
        if size == 0 {
            return Err(UserHeapError::ZeroSize);
        }
        self.ensure_init();

        let requested = size;
        let size = Size4K::round_up(size).ok_or(UserHeapError::OutOfSpace { requested })?;

        let Some(index) = (0..SLOTS)
            .map(|k| (self.next_fit + k) % SLOTS)
            .find(|&i| self.is_candidate(self.slots()[i], size))
        else {
            log::debug!("user heap: no free block for {requested} bytes");
            return Err(UserHeapError::OutOfSpace { requested });
        };

        let candidate = self.slots()[index];
        if candidate.size > size {
            let rest = HeapBlock::free(candidate.va + size, candidate.size - size);
            if self.blocks.claim(rest).is_none() {
                log::warn!("user heap: block table full, cannot split {}", candidate.va);
                return Err(UserHeapError::TableExhausted { at: candidate.va });
            }
        }

        let block = self.blocks.slot_mut(index);
        block.size = size;
        block.used = true;
        self.next_fit = (index + 1) % SLOTS;

        let va = candidate.va;
        if self
            .records
            .try_push(UserAllocation { start: va, size })
            .is_err()
        {
            log::warn!("user heap: allocation record table full, {va} is untracked");
        }

        backing.request_backing(va, size);
        log::debug!("user heap: allocated {size} bytes at {va} (slot {index})");
        Ok(va)
    }

    /// Release the block that starts at the page containing `address`.
    ///
    /// Null and unknown addresses are ignored. The freed block is merged with
    /// adjacent free blocks and its original range is handed back to
    /// `backing`.
    pub fn free<B: Backing + ?Sized>(&mut self, backing: &mut B, address: VirtualAddress) {
        if address.is_null() {
            return;
        }
        let va = address.align_down::<Size4K>();

        let Some(index) = self
            .blocks()
            .find(|(_, b)| b.used && b.va == va)
            .map(|(i, _)| i)
        else {
            log::trace!("user heap: ignoring free of unknown {address}");
            return;
        };

        let size = self.slots()[index].size;
        self.blocks.slot_mut(index).used = false;
        if let Some(pos) = self.records.iter().position(|r| r.start == va) {
            self.records.remove(pos);
        }

        match self.config.coalesce {
            CoalescePolicy::SinglePass => {
                self.coalesce_pass(index);
            }
            CoalescePolicy::Converge => {
                let mut current = index;
                loop {
                    let (next, merged) = self.coalesce_pass(current);
                    current = next;
                    if !merged {
                        break;
                    }
                }
            }
        }

        backing.release_backing(va, size);
        log::debug!("user heap: freed {size} bytes at {va}");
    }

    /// One pass over the table merging free neighbours into the block at
    /// `current`. Returns the slot now holding the block and whether anything
    /// merged.
    fn coalesce_pass(&mut self, mut current: usize) -> (usize, bool) {
        let mut merged = false;
        for i in 0..SLOTS {
            let other = self.slots()[i];
            if i == current || other.used || other.is_empty() {
                continue;
            }
            let cur = self.slots()[current];
            if cur.end() == other.va {
                self.blocks.slot_mut(current).size += other.size;
                self.blocks.vacate(i);
                merged = true;
            } else if other.end() == cur.va {
                self.blocks.slot_mut(i).size += cur.size;
                self.blocks.vacate(current);
                current = i;
                merged = true;
            }
        }
        (current, merged)
    }

    /// Resizing is not provided.
    ///
    /// # Errors
    /// Always [`Unsupported::Reallocate`].
    pub fn reallocate(
        &self,
        address: VirtualAddress,
        new_size: u64,
    ) -> Result<Infallible, Unsupported> {
        log::warn!(
            "user heap: reallocate({address}, {new_size}) requested with {} live allocation(s)",
            self.records.len()
        );
        Err(Unsupported::Reallocate(address))
    }

    /// Shared memory segments are not provided.
    ///
    /// # Errors
    /// Always [`Unsupported::SharedAllocate`].
    pub fn shared_allocate(
        &self,
        name: &str,
        size: u64,
        writable: bool,
    ) -> Result<Infallible, Unsupported> {
        log::warn!(
            "user heap {}: shared_allocate({name:?}, {size}, writable={writable}) requested",
            self.start
        );
        Err(Unsupported::SharedAllocate)
    }

    /// Shared memory segments are not provided.
    ///
    /// # Errors
    /// Always [`Unsupported::SharedGet`].
    pub fn shared_get(&self, owner: u32, name: &str) -> Result<Infallible, Unsupported> {
        log::warn!("user heap {}: shared_get({owner}, {name:?}) requested", self.start);
        Err(Unsupported::SharedGet)
    }

    /// Shared memory segments are not provided.
    ///
    /// # Errors
    /// Always [`Unsupported::SharedFree`].
    pub fn shared_free(&self, address: VirtualAddress) -> Result<Infallible, Unsupported> {
        log::warn!("user heap {}: shared_free({address}) requested", self.start);
        Err(Unsupported::SharedFree(address))
    }
}
